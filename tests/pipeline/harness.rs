//! Orchestrator wired to an in-memory store, the Kassandra inventory and a
//! temporary outbox.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use innkeeper::extractors::heuristic::HeuristicExtractor;
use innkeeper::extractors::ExtractorChain;
use innkeeper::outbound::{MailTransport, OutboxTransport};
use innkeeper::pipeline::{Orchestrator, PipelineSettings};
use innkeeper::store::{IngestOutcome, Inquiry, PipelineItem, PipelineStore, SqliteStore};

use crate::support::{date, kassandra_inventory, message};

pub const ANA: &str = "Ana Petrović <ana@example.com>";

pub const HANIOTI_BODY: &str = "Zdravo, tražimo smeštaj u Haniotiju za 2 odrasle osobe \
     od 15.07.2027. na 7 noći. Budžet do 80 eur po noći.";

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub orchestrator: Orchestrator,
    pub outbox: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let outbox = TempDir::new().expect("outbox dir");
        let transport = Arc::new(OutboxTransport::new(outbox.path()));
        Self::with_transport(transport, outbox).await
    }

    pub async fn with_transport(transport: Arc<dyn MailTransport>, outbox: TempDir) -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.expect("store"));
        store
            .seed_inventory(&kassandra_inventory())
            .await
            .expect("seed inventory");
        let orchestrator = Orchestrator::new(
            store.clone(),
            store.clone(),
            transport,
            PipelineSettings::default(),
        )
        .with_extractor(ExtractorChain::deterministic(HeuristicExtractor::with_today(
            date(2026, 10, 19),
        )));
        Self {
            store,
            orchestrator,
            outbox,
        }
    }

    pub fn with_extractor(self, extractor: ExtractorChain) -> Self {
        Self {
            orchestrator: self.orchestrator.with_extractor(extractor),
            ..self
        }
    }

    pub async fn ingest(&self, id: &str, sender: &str, subject: &str, body: &str, at: &str) -> i64 {
        match self
            .store
            .ingest(&message(id, sender, subject, body, at))
            .await
            .expect("ingest")
        {
            IngestOutcome::Inserted { item_id } => item_id,
            IngestOutcome::Duplicate => panic!("unexpected duplicate {id}"),
        }
    }

    pub async fn item(&self, id: i64) -> PipelineItem {
        self.store.item(id).await.expect("item").expect("item exists")
    }

    pub async fn inquiry_of(&self, id: i64) -> Inquiry {
        let inquiry_id = self.item(id).await.inquiry_id.expect("item is synced");
        self.store
            .inquiry(inquiry_id)
            .await
            .expect("inquiry")
            .expect("inquiry exists")
    }

    pub fn outbox_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.outbox.path())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }
}
