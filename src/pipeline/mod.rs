//! Batch orchestrator: moves pipeline items through sync, parse, suggest,
//! draft and send.
//!
//! Each stage selects one page of eligible items (oldest first), processes
//! them one by one and reports processed/skipped/failed counts. A failing item
//! is marked `error` with a short diagnostic and the batch moves on. Every
//! stage may be re-run at any time: items that already carry the stage's
//! output are skipped unless the run is forced.

pub mod merge;
pub mod status;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::composer::{DraftComposer, DraftInput, OutcomeKind};
use crate::config::PipelineConfig;
use crate::extractors::{ExtractPreference, ExtractorChain};
use crate::gate::{self, GateContext, MissingReason};
use crate::inventory::AccommodationUnit;
use crate::matcher::Candidate;
use crate::outbound::{MailTransport, OutboundMessage, TransportError};
use crate::ranking::{self, TierPolicy};
use crate::store::{
    Change, Draft, Inquiry, InquiryLink, InquiryPatch, InventorySource, ItemUpdate, NewInquiry,
    Pending, PipelineItem, PipelineStore, Selection, StoreError,
};

use merge::{merge_intent, MergePolicy};
use status::{BusinessStatus, PipelineStatus};

/// Fixed diagnostic for an item whose inquiry no longer exists.
pub const INQUIRY_MISSING: &str = "inquiry_missing";

/// Subject prefixes stripped for thread matching.
const REPLY_PREFIXES: [&str; 5] = ["re:", "fwd:", "fw:", "odg:", "aw:"];

/// A named batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Attach new items to inquiries.
    Sync,
    /// Extract and gate.
    Parse,
    /// Match and rank.
    Suggest,
    /// Compose replies.
    Draft,
    /// Hand replies to the transport.
    Send,
}

impl Stage {
    /// Stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Parse => "parse",
            Self::Suggest => "suggest",
            Self::Draft => "draft",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Page size; the configured batch limit when `None`.
    pub limit: Option<u32>,
    /// Also pick up items in non-fresh statuses.
    pub retry: bool,
    /// Ignore idempotency skips and rebuild.
    pub force: bool,
}

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Which stage ran.
    pub stage: Stage,
    /// Items that were advanced.
    pub processed: u32,
    /// Items left untouched.
    pub skipped: u32,
    /// Items marked `error`.
    pub failed: u32,
}

impl BatchReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            processed: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: processed={} skipped={} failed={}",
            self.stage, self.processed, self.skipped, self.failed
        )
    }
}

/// Errors that abort a whole batch run (never a single item's failure).
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The same stage is already running.
    #[error("{0} is already running")]
    AlreadyRunning(Stage),
    /// The page of items or the inventory could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-item failure, recorded on the item.
#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error("inquiry_missing")]
    InquiryMissing,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

enum ItemOutcome {
    Processed,
    Skipped,
}

/// Orchestrator settings derived from the `[pipeline]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Default page size.
    pub batch_limit: u32,
    /// Tier caps and tolerances.
    pub tiers: TierPolicy,
    /// Stored error reasons are cut to this many characters.
    pub error_reason_max_chars: usize,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_limit: config.batch_limit,
            tiers: TierPolicy::from(config),
            error_reason_max_chars: config.error_reason_max_chars,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

#[derive(Debug, Default)]
struct StageLocks {
    sync: Mutex<()>,
    parse: Mutex<()>,
    suggest: Mutex<()>,
    draft: Mutex<()>,
    send: Mutex<()>,
}

impl StageLocks {
    fn get(&self, stage: Stage) -> &Mutex<()> {
        match stage {
            Stage::Sync => &self.sync,
            Stage::Parse => &self.parse,
            Stage::Suggest => &self.suggest,
            Stage::Draft => &self.draft,
            Stage::Send => &self.send,
        }
    }
}

/// Inventory snapshot shared by the items of one batch.
#[derive(Default)]
struct BatchContext {
    units: Vec<AccommodationUnit>,
    unit_names: Vec<String>,
}

/// Runs the batch stages against a store.
pub struct Orchestrator {
    store: Arc<dyn PipelineStore>,
    inventory: Arc<dyn InventorySource>,
    transport: Arc<dyn MailTransport>,
    extractor: ExtractorChain,
    composer: DraftComposer,
    settings: PipelineSettings,
    locks: StageLocks,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("extractor", &self.extractor)
            .field("composer", &self.composer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator with deterministic extraction and drafting.
    pub fn new(
        store: Arc<dyn PipelineStore>,
        inventory: Arc<dyn InventorySource>,
        transport: Arc<dyn MailTransport>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            inventory,
            transport,
            extractor: ExtractorChain::deterministic(Default::default()),
            composer: DraftComposer::deterministic(),
            settings,
            locks: StageLocks::default(),
        }
    }

    /// Replace the extractor chain.
    #[must_use]
    pub fn with_extractor(mut self, extractor: ExtractorChain) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the draft composer.
    #[must_use]
    pub fn with_composer(mut self, composer: DraftComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Attach `new` items to an existing thread or a fresh inquiry.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyRunning`] or a page-load failure.
    pub async fn sync(&self, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        self.run(Stage::Sync, options).await
    }

    /// Extract, merge and gate synced items.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyRunning`] or a page-load failure.
    pub async fn parse(&self, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        self.run(Stage::Parse, options).await
    }

    /// Match, rank and store suggestion tiers.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyRunning`] or a page/inventory load failure.
    pub async fn suggest(&self, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        self.run(Stage::Suggest, options).await
    }

    /// Compose and store reply drafts.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyRunning`] or a page/inventory load failure.
    pub async fn draft(&self, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        self.run(Stage::Draft, options).await
    }

    /// Hand stored drafts to the mail transport.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::AlreadyRunning`] or a page-load failure.
    pub async fn send(&self, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        self.run(Stage::Send, options).await
    }

    /// Sync, parse, suggest and draft in order. Sending stays a separate step.
    ///
    /// # Errors
    ///
    /// The first stage-level error; earlier reports are lost in that case.
    pub async fn run_all(
        &self,
        options: BatchOptions,
    ) -> Result<Vec<BatchReport>, OrchestratorError> {
        let mut reports = Vec::with_capacity(4);
        for stage in [Stage::Sync, Stage::Parse, Stage::Suggest, Stage::Draft] {
            reports.push(self.run(stage, options).await?);
        }
        Ok(reports)
    }

    async fn run(&self, stage: Stage, options: BatchOptions) -> Result<BatchReport, OrchestratorError> {
        let _guard = self
            .locks
            .get(stage)
            .try_lock()
            .map_err(|_| OrchestratorError::AlreadyRunning(stage))?;

        let selection = self.selection(stage, options);
        let items = self.store.select(&selection).await?;
        let context = match stage {
            Stage::Suggest | Stage::Draft if !items.is_empty() => {
                let units = self.inventory.units().await?;
                let unit_names = units.iter().map(|u| u.name.clone()).collect();
                BatchContext { units, unit_names }
            }
            _ => BatchContext::default(),
        };

        let mut report = BatchReport::new(stage);
        for item in &items {
            match self.process(stage, item, options, &context).await {
                Ok(ItemOutcome::Processed) => {
                    report.processed = report.processed.saturating_add(1);
                }
                Ok(ItemOutcome::Skipped) => {
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(ItemError::Store(StoreError::Conflict(id))) => {
                    debug!(stage = %stage, item_id = id, "item changed concurrently, skipped");
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(e) => {
                    self.record_failure(stage, item, &e).await;
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }
        info!(
            stage = %stage,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    fn selection(&self, stage: Stage, options: BatchOptions) -> Selection {
        use PipelineStatus::*;
        let (statuses, pending) = match stage {
            Stage::Sync => (vec![New], Pending::Any),
            Stage::Parse if options.retry => (vec![Synced, NeedsInfo, Error], Pending::Any),
            Stage::Parse => (vec![Synced], Pending::Any),
            Stage::Suggest if options.force => (
                vec![Parsed, NeedsInfo, Error, NoAvailability, Suggested],
                Pending::Suggestable { rebuild: true },
            ),
            Stage::Suggest => (
                vec![Parsed, NeedsInfo, Error],
                Pending::Suggestable { rebuild: false },
            ),
            Stage::Draft => (
                vec![NeedsInfo, NoAvailability, Suggested],
                Pending::Draftable {
                    rebuild: options.force,
                },
            ),
            Stage::Send => (vec![NeedsInfo, NoAvailability, Suggested], Pending::UnsentDraft),
        };
        Selection {
            statuses,
            pending,
            limit: options.limit.unwrap_or(self.settings.batch_limit),
        }
    }

    async fn process(
        &self,
        stage: Stage,
        item: &PipelineItem,
        options: BatchOptions,
        context: &BatchContext,
    ) -> Result<ItemOutcome, ItemError> {
        match stage {
            Stage::Sync => self.sync_item(item).await,
            Stage::Parse => self.parse_item(item, options).await,
            Stage::Suggest => self.suggest_item(item, options, context).await,
            Stage::Draft => self.draft_item(item, options, context).await,
            Stage::Send => self.send_item(item).await,
        }
    }

    async fn record_failure(&self, stage: Stage, item: &PipelineItem, error: &ItemError) {
        let reason = truncate_reason(&error.to_string(), self.settings.error_reason_max_chars);
        warn!(stage = %stage, item_id = item.id, error = %reason, "item failed");
        if let Err(e) = self.store.commit(ItemUpdate::error(item, reason)).await {
            warn!(stage = %stage, item_id = item.id, error = %e, "could not record item failure");
        }
    }

    async fn load_inquiry(&self, item: &PipelineItem) -> Result<Inquiry, ItemError> {
        let id = item.inquiry_id.ok_or(ItemError::InquiryMissing)?;
        self.store
            .inquiry(id)
            .await?
            .ok_or(ItemError::InquiryMissing)
    }

    async fn sync_item(&self, item: &PipelineItem) -> Result<ItemOutcome, ItemError> {
        let raw = self.store.raw_message(item.raw_message_id).await?;
        let sender = raw.sender_address();
        let key = thread_key(&raw.subject);

        let existing = if key.is_empty() {
            None
        } else {
            self.store.find_thread(&sender, &key).await?
        };
        let link = match existing {
            Some(inquiry) => {
                debug!(item_id = item.id, inquiry_id = inquiry.id, "attached to thread");
                InquiryLink::Existing(inquiry.id)
            }
            None => InquiryLink::Create(NewInquiry {
                sender,
                guest_name: raw.sender_name(),
                subject: raw.subject.trim().to_owned(),
                thread_key: key,
                external_ref: raw.external_id.clone(),
                raw_text: raw.inquiry_text(),
            }),
        };

        self.store
            .commit(ItemUpdate {
                link: Some(link),
                ..ItemUpdate::status(item, PipelineStatus::Synced)
            })
            .await?;
        Ok(ItemOutcome::Processed)
    }

    async fn parse_item(
        &self,
        item: &PipelineItem,
        options: BatchOptions,
    ) -> Result<ItemOutcome, ItemError> {
        let inquiry = self.load_inquiry(item).await?;
        if inquiry.business_status.is_past_extraction() {
            debug!(
                item_id = item.id,
                business_status = %inquiry.business_status,
                "inquiry already past extraction, parse is a no-op"
            );
            self.store
                .commit(ItemUpdate::status(item, PipelineStatus::Parsed))
                .await?;
            return Ok(ItemOutcome::Skipped);
        }

        let raw = self.store.raw_message(item.raw_message_id).await?;
        let text = raw.inquiry_text();
        let fresh = self.extractor.extract(&text, ExtractPreference::Auto).await;
        let mode = fresh.extraction_mode;
        let intent = merge_intent(
            inquiry.intent.as_ref(),
            fresh,
            MergePolicy::from_force(options.force),
        );

        let narrative = if inquiry.raw_text == text {
            text
        } else {
            format!("{}\n\n{text}", inquiry.raw_text)
        };
        let missing = gate::detect(&intent, &GateContext::new(&narrative));
        let (status, business) = if missing.is_empty() {
            (
                PipelineStatus::Parsed,
                Some(inquiry.business_status.advance(BusinessStatus::Extracted)),
            )
        } else {
            (PipelineStatus::NeedsInfo, None)
        };
        debug!(
            item_id = item.id,
            mode = mode.as_str(),
            missing = missing.len(),
            status = %status,
            "parsed"
        );

        self.store
            .commit(ItemUpdate {
                missing: Change::Set(missing),
                suggestions: if item.suggestions.is_some() {
                    Change::Clear
                } else {
                    Change::Keep
                },
                inquiry: InquiryPatch {
                    intent: Change::Set(intent),
                    business_status: business,
                    draft: if inquiry.draft.is_some() {
                        Change::Clear
                    } else {
                        Change::Keep
                    },
                },
                ..ItemUpdate::status(item, status)
            })
            .await?;
        Ok(ItemOutcome::Processed)
    }

    async fn suggest_item(
        &self,
        item: &PipelineItem,
        options: BatchOptions,
        context: &BatchContext,
    ) -> Result<ItemOutcome, ItemError> {
        let inquiry = self.load_inquiry(item).await?;
        if inquiry.business_status.is_locked() {
            return Ok(ItemOutcome::Skipped);
        }
        if item.suggestions.is_some() && !options.force {
            return Ok(ItemOutcome::Skipped);
        }
        let Some(intent) = inquiry.intent.as_ref() else {
            debug!(item_id = item.id, "no parsed intent yet, suggest skipped");
            return Ok(ItemOutcome::Skipped);
        };

        let suggestions = ranking::suggest(&context.units, intent, &self.settings.tiers);
        let gated = !item.missing.is_empty();
        let (status, business) = if gated {
            (PipelineStatus::NeedsInfo, None)
        } else if suggestions.has_any() {
            (
                PipelineStatus::Suggested,
                Some(inquiry.business_status.advance(BusinessStatus::Suggested)),
            )
        } else {
            (
                PipelineStatus::NoAvailability,
                (inquiry.business_status == BusinessStatus::New).then_some(BusinessStatus::Extracted),
            )
        };
        debug!(
            item_id = item.id,
            primary = suggestions.primary.len(),
            alternatives = suggestions.alternatives.len(),
            status = %status,
            "suggested"
        );

        self.store
            .commit(ItemUpdate {
                suggestions: Change::Set(suggestions),
                inquiry: InquiryPatch {
                    business_status: business,
                    draft: if inquiry.draft.is_some() {
                        Change::Clear
                    } else {
                        Change::Keep
                    },
                    ..InquiryPatch::default()
                },
                ..ItemUpdate::status(item, status)
            })
            .await?;
        Ok(ItemOutcome::Processed)
    }

    async fn draft_item(
        &self,
        item: &PipelineItem,
        options: BatchOptions,
        context: &BatchContext,
    ) -> Result<ItemOutcome, ItemError> {
        let inquiry = self.load_inquiry(item).await?;
        if inquiry.business_status.is_locked() {
            return Ok(ItemOutcome::Skipped);
        }
        if inquiry.draft.is_some() && !options.force {
            return Ok(ItemOutcome::Skipped);
        }
        if item.missing.contains(MissingReason::OutOfScope) {
            debug!(item_id = item.id, "not a booking inquiry, no draft");
            return Ok(ItemOutcome::Skipped);
        }

        let intent = inquiry.intent.clone().unwrap_or_default();
        let outcome = OutcomeKind::derive(&item.missing, item.suggestions.as_ref());
        let candidates: &[Candidate] = match (&item.suggestions, outcome) {
            (Some(s), OutcomeKind::Offer) => s.primary.as_slice(),
            (Some(s), OutcomeKind::NoPrimaryWithAlternatives) => s.alternatives.as_slice(),
            _ => &[],
        };
        let input = DraftInput {
            intent: &intent,
            guest_name: inquiry.guest_name.as_deref(),
            candidates,
            outcome,
            missing: &item.missing,
            known_unit_names: &context.unit_names,
        };
        let body = self.composer.compose(&input).await;
        debug!(item_id = item.id, outcome = outcome.as_str(), "draft composed");

        self.store
            .commit(ItemUpdate {
                inquiry: InquiryPatch {
                    draft: Change::Set(Draft { body, outcome }),
                    ..InquiryPatch::default()
                },
                ..ItemUpdate::status(item, item.status)
            })
            .await?;
        Ok(ItemOutcome::Processed)
    }

    async fn send_item(&self, item: &PipelineItem) -> Result<ItemOutcome, ItemError> {
        let inquiry = self.load_inquiry(item).await?;
        if inquiry.business_status.is_locked() {
            return Ok(ItemOutcome::Skipped);
        }
        let Some(draft) = inquiry.draft else {
            return Ok(ItemOutcome::Skipped);
        };

        let message = OutboundMessage {
            to: inquiry.sender.clone(),
            subject: OutboundMessage::reply_subject(&inquiry.subject),
            in_reply_to: inquiry.external_ref.clone(),
            body: draft.body,
        };
        let delivery = self.transport.send(&message).await?;
        info!(item_id = item.id, inquiry_id = inquiry.id, reference = %delivery.reference, "reply sent");

        self.store
            .commit(ItemUpdate {
                inquiry: InquiryPatch {
                    business_status: Some(BusinessStatus::Replied),
                    ..InquiryPatch::default()
                },
                ..ItemUpdate::status(item, item.status)
            })
            .await?;
        Ok(ItemOutcome::Processed)
    }
}

/// Normalised subject for thread matching: reply/forward prefixes stripped,
/// whitespace collapsed, lowercase.
pub fn thread_key(subject: &str) -> String {
    let mut rest = subject.trim().to_lowercase();
    loop {
        let stripped = REPLY_PREFIXES
            .iter()
            .find_map(|p| rest.strip_prefix(p))
            .map(|s| s.trim_start().to_owned());
        match stripped {
            Some(s) => rest = s,
            None => break,
        }
    }
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut a diagnostic to at most `max_chars` characters.
pub fn truncate_reason(reason: &str, max_chars: usize) -> String {
    reason.chars().take(max_chars).collect()
}
