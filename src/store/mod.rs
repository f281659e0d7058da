//! Persistence collaborator: pipeline items, inquiries and the inventory.
//!
//! The orchestrator talks to storage only through [`PipelineStore`] and
//! [`InventorySource`]. Every item write goes through [`PipelineStore::commit`],
//! which applies one [`ItemUpdate`] atomically and only if the item's version
//! is still the one the caller read.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::composer::OutcomeKind;
use crate::gate::MissingReasons;
use crate::inventory::AccommodationUnit;
use crate::pipeline::status::{BusinessStatus, PipelineStatus};
use crate::ranking::Suggestions;
use crate::types::{IntentRecord, RawMessage, UnknownValue};

pub use sqlite::SqliteStore;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A JSON column could not be encoded or decoded.
    #[error("payload encoding error: {0}")]
    Payload(#[from] serde_json::Error),
    /// A stored value is not a known variant.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
    /// The item changed since it was read.
    #[error("pipeline item {0} was modified concurrently")]
    Conflict(i64),
    /// The requested row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table or entity name.
        entity: &'static str,
        /// Key.
        id: i64,
    },
    /// The update would break a state machine.
    #[error("illegal {machine} transition {from} -> {to}")]
    IllegalTransition {
        /// Which state machine.
        machine: &'static str,
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },
}

impl From<UnknownValue> for StoreError {
    fn from(e: UnknownValue) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Result of offering a raw message to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored as a new raw message with a fresh `new` item.
    Inserted {
        /// The new item.
        item_id: i64,
    },
    /// The dedupe hash was already known; nothing was written.
    Duplicate,
}

/// A stored pipeline item.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineItem {
    /// Item id.
    pub id: i64,
    /// Source raw message.
    pub raw_message_id: i64,
    /// Attached inquiry, once synced.
    pub inquiry_id: Option<i64>,
    /// Processing stage.
    pub status: PipelineStatus,
    /// Diagnostic for the last failure.
    pub error_reason: Option<String>,
    /// Gate output of the last parse.
    pub missing: MissingReasons,
    /// Tiered suggestion payload.
    pub suggestions: Option<Suggestions>,
    /// Excluded from automated processing.
    pub ai_stopped: bool,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Receive time of the source message.
    pub received_at: DateTime<Utc>,
}

/// The business-level record items attach to.
#[derive(Debug, Clone, PartialEq)]
pub struct Inquiry {
    /// Inquiry id.
    pub id: i64,
    /// Sender address, lowercase.
    pub sender: String,
    /// Guest display name.
    pub guest_name: Option<String>,
    /// Subject of the first message.
    pub subject: String,
    /// Normalised subject used for thread matching.
    pub thread_key: String,
    /// Message id replies refer to.
    pub external_ref: Option<String>,
    /// Inquiry text (subject and body).
    pub raw_text: String,
    /// Merged intent.
    pub intent: Option<IntentRecord>,
    /// Lifecycle stage.
    pub business_status: BusinessStatus,
    /// Stored reply draft.
    pub draft: Option<Draft>,
}

/// A composed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Reply body.
    pub body: String,
    /// Template family the reply was built from.
    pub outcome: OutcomeKind,
}

/// Fields for a new inquiry created during sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInquiry {
    /// Sender address, lowercase.
    pub sender: String,
    /// Guest display name.
    pub guest_name: Option<String>,
    /// Subject.
    pub subject: String,
    /// Normalised subject.
    pub thread_key: String,
    /// Message id replies refer to.
    pub external_ref: Option<String>,
    /// Inquiry text.
    pub raw_text: String,
}

/// Three-way change of an optional stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// Leave as is.
    Keep,
    /// Replace.
    Set(T),
    /// Remove.
    Clear,
}

impl<T> Default for Change<T> {
    fn default() -> Self {
        Self::Keep
    }
}

/// How an item gets linked to an inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InquiryLink {
    /// Attach to an existing inquiry.
    Existing(i64),
    /// Create an inquiry and attach to it.
    Create(NewInquiry),
}

/// Changes to the item's inquiry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InquiryPatch {
    /// Merged intent.
    pub intent: Change<IntentRecord>,
    /// New business status; must not move backwards.
    pub business_status: Option<BusinessStatus>,
    /// Reply draft.
    pub draft: Change<Draft>,
}

impl InquiryPatch {
    fn is_empty(&self) -> bool {
        matches!(self.intent, Change::Keep)
            && self.business_status.is_none()
            && matches!(self.draft, Change::Keep)
    }
}

/// All changes for one item, applied in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    /// Target item.
    pub item_id: i64,
    /// Version the caller read; a mismatch is [`StoreError::Conflict`].
    pub expected_version: i64,
    /// New pipeline status.
    pub status: PipelineStatus,
    /// Error diagnostic; cleared unless the status is `error`.
    pub error_reason: Option<String>,
    /// Gate output.
    pub missing: Change<MissingReasons>,
    /// Suggestion payload.
    pub suggestions: Change<Suggestions>,
    /// Inquiry link, set during sync.
    pub link: Option<InquiryLink>,
    /// Inquiry changes.
    pub inquiry: InquiryPatch,
}

impl ItemUpdate {
    /// Update that only moves the status of `item`.
    pub fn status(item: &PipelineItem, status: PipelineStatus) -> Self {
        Self {
            item_id: item.id,
            expected_version: item.version,
            status,
            error_reason: None,
            missing: Change::Keep,
            suggestions: Change::Keep,
            link: None,
            inquiry: InquiryPatch::default(),
        }
    }

    /// Update that marks `item` as failed.
    pub fn error(item: &PipelineItem, reason: String) -> Self {
        Self {
            error_reason: Some(reason),
            ..Self::status(item, PipelineStatus::Error)
        }
    }
}

/// Which items of the requested statuses still have work for a stage.
///
/// Items whose inquiry vanished are selected once so the failure gets
/// recorded; after that they are never selected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pending {
    /// Every item in the statuses.
    #[default]
    Any,
    /// Items whose inquiry is open and has an intent.
    Suggestable {
        /// Also items that already carry a suggestion payload.
        rebuild: bool,
    },
    /// Booking items whose inquiry is open.
    Draftable {
        /// Also items whose inquiry already has a draft.
        rebuild: bool,
    },
    /// Items whose open inquiry has a draft that has not been sent.
    UnsentDraft,
}

/// Item selection for one batch page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Pipeline statuses to include.
    pub statuses: Vec<PipelineStatus>,
    /// Extra per-stage filter.
    pub pending: Pending,
    /// Page size.
    pub limit: u32,
}

/// Pipeline persistence.
#[async_trait::async_trait]
pub trait PipelineStore: Send + Sync {
    /// Store a raw message and its `new` item unless its dedupe hash is known.
    async fn ingest(&self, message: &RawMessage) -> Result<IngestOutcome, StoreError>;

    /// Items matching the selection, oldest received first, `ai_stopped` excluded.
    async fn select(&self, selection: &Selection) -> Result<Vec<PipelineItem>, StoreError>;

    /// One item by id.
    async fn item(&self, id: i64) -> Result<Option<PipelineItem>, StoreError>;

    /// The raw message behind an item.
    async fn raw_message(&self, id: i64) -> Result<RawMessage, StoreError>;

    /// One inquiry by id.
    async fn inquiry(&self, id: i64) -> Result<Option<Inquiry>, StoreError>;

    /// Newest open (not closed) inquiry of `sender` with the given thread key.
    async fn find_thread(
        &self,
        sender: &str,
        thread_key: &str,
    ) -> Result<Option<Inquiry>, StoreError>;

    /// Apply an update atomically.
    async fn commit(&self, update: ItemUpdate) -> Result<(), StoreError>;

    /// Set or clear the manual override flag.
    async fn set_ai_stopped(&self, item_id: i64, stopped: bool) -> Result<(), StoreError>;
}

/// Read-only inventory access.
#[async_trait::async_trait]
pub trait InventorySource: Send + Sync {
    /// All units with their rooms and price periods.
    async fn units(&self) -> Result<Vec<AccommodationUnit>, StoreError>;
}
