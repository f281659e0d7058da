//! Happy-path and thread flows through every stage.

use innkeeper::composer::OutcomeKind;
use innkeeper::gate::MissingReason;
use innkeeper::pipeline::status::{BusinessStatus, PipelineStatus};
use innkeeper::pipeline::{BatchOptions, Stage};

use crate::harness::{Harness, ANA, HANIOTI_BODY};
use crate::support::date;

fn opts() -> BatchOptions {
    BatchOptions::default()
}

#[tokio::test]
async fn inquiry_goes_from_mail_to_outbox() {
    let h = Harness::new().await;
    let id = h
        .ingest("<m1@example.com>", ANA, "Upit za Hanioti", HANIOTI_BODY, "2026-10-19T08:00:00Z")
        .await;

    let sync = h.orchestrator.sync(opts()).await.expect("sync");
    assert_eq!((sync.stage, sync.processed, sync.failed), (Stage::Sync, 1, 0));
    assert_eq!(h.item(id).await.status, PipelineStatus::Synced);

    assert_eq!(h.orchestrator.parse(opts()).await.expect("parse").processed, 1);
    let item = h.item(id).await;
    assert_eq!(item.status, PipelineStatus::Parsed);
    assert!(item.missing.is_empty());
    let inquiry = h.inquiry_of(id).await;
    assert_eq!(inquiry.business_status, BusinessStatus::Extracted);
    assert_eq!(inquiry.guest_name.as_deref(), Some("Ana Petrović"));
    let intent = inquiry.intent.expect("intent stored");
    assert_eq!(intent.location.as_deref(), Some("Hanioti"));
    assert_eq!(intent.date_from, Some(date(2027, 7, 15)));
    assert_eq!(intent.date_to, Some(date(2027, 7, 22)));

    assert_eq!(h.orchestrator.suggest(opts()).await.expect("suggest").processed, 1);
    let item = h.item(id).await;
    assert_eq!(item.status, PipelineStatus::Suggested);
    let suggestions = item.suggestions.expect("suggestions stored");
    assert_eq!(suggestions.primary.len(), 1);
    assert_eq!(suggestions.primary[0].unit.name, "Vila Sunce");
    assert_eq!(h.inquiry_of(id).await.business_status, BusinessStatus::Suggested);

    assert_eq!(h.orchestrator.draft(opts()).await.expect("draft").processed, 1);
    let draft = h.inquiry_of(id).await.draft.expect("draft stored");
    assert_eq!(draft.outcome, OutcomeKind::Offer);
    assert!(draft.body.starts_with("Poštovani/a Ana Petrović,"));
    assert!(draft.body.contains("Vila Sunce"));
    assert!(!draft.body.contains("Apartmani More"));

    assert_eq!(h.orchestrator.send(opts()).await.expect("send").processed, 1);
    assert_eq!(h.inquiry_of(id).await.business_status, BusinessStatus::Replied);
    let files = h.outbox_files();
    assert_eq!(files.len(), 1);
    let queued: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).expect("read outbox"))
            .expect("outbox json");
    assert_eq!(queued["to"], "ana@example.com");
    assert_eq!(queued["subject"], "Re: Upit za Hanioti");
    assert_eq!(queued["in_reply_to"], "<m1@example.com>");
    assert_eq!(queued["body"], draft.body.as_str());

    let again = h.orchestrator.send(opts()).await.expect("second send");
    assert_eq!(again.processed, 0);
    assert_eq!(h.outbox_files().len(), 1);
}

#[tokio::test]
async fn run_all_stops_before_sending() {
    let h = Harness::new().await;
    let id = h
        .ingest("<m1@example.com>", ANA, "Upit za Hanioti", HANIOTI_BODY, "2026-10-19T08:00:00Z")
        .await;

    let reports = h.orchestrator.run_all(opts()).await.expect("run");
    let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, vec![Stage::Sync, Stage::Parse, Stage::Suggest, Stage::Draft]);
    assert!(reports.iter().all(|r| r.processed == 1));

    assert!(h.inquiry_of(id).await.draft.is_some());
    assert!(h.outbox_files().is_empty());
}

#[tokio::test]
async fn missing_dates_produce_a_question_not_an_offer() {
    let h = Harness::new().await;
    let id = h
        .ingest(
            "<m1@example.com>",
            ANA,
            "Smeštaj Pefkohori",
            "Zdravo, nas dvoje odraslih tražimo smeštaj u Pefkohoriju.",
            "2026-10-19T08:00:00Z",
        )
        .await;

    h.orchestrator.sync(opts()).await.expect("sync");
    h.orchestrator.parse(opts()).await.expect("parse");
    let item = h.item(id).await;
    assert_eq!(item.status, PipelineStatus::NeedsInfo);
    assert_eq!(item.missing.iter().collect::<Vec<_>>(), vec![MissingReason::Dates]);

    assert_eq!(h.orchestrator.suggest(opts()).await.expect("suggest").processed, 1);
    let item = h.item(id).await;
    assert_eq!(item.status, PipelineStatus::NeedsInfo);
    assert!(item.suggestions.is_some());
    assert_eq!(h.inquiry_of(id).await.business_status, BusinessStatus::New);

    h.orchestrator.draft(opts()).await.expect("draft");
    let draft = h.inquiry_of(id).await.draft.expect("draft stored");
    assert_eq!(draft.outcome, OutcomeKind::MissingInfo);
    assert!(draft.body.contains("Datumi boravka"));
    assert!(!draft.body.contains("Apartmani More"));
}

#[tokio::test]
async fn follow_up_in_thread_completes_the_inquiry() {
    let h = Harness::new().await;
    let first = h
        .ingest(
            "<m1@example.com>",
            ANA,
            "Upit Hanioti",
            "Zdravo, tražimo smeštaj u Haniotiju za 2 odrasle osobe.",
            "2026-10-19T08:00:00Z",
        )
        .await;
    let second = h
        .ingest(
            "<m2@example.com>",
            ANA,
            "Re: Upit Hanioti",
            "Dolazimo 15.07.2027. na 7 noći.",
            "2026-10-19T09:00:00Z",
        )
        .await;

    assert_eq!(h.orchestrator.sync(opts()).await.expect("sync").processed, 2);
    let inquiry_id = h.item(first).await.inquiry_id;
    assert!(inquiry_id.is_some());
    assert_eq!(h.item(second).await.inquiry_id, inquiry_id);

    h.orchestrator.parse(opts()).await.expect("parse");
    assert_eq!(h.item(first).await.status, PipelineStatus::NeedsInfo);
    assert_eq!(h.item(second).await.status, PipelineStatus::Parsed);

    let inquiry = h.inquiry_of(second).await;
    assert_eq!(inquiry.business_status, BusinessStatus::Extracted);
    let intent = inquiry.intent.expect("merged intent");
    assert_eq!(intent.location.as_deref(), Some("Hanioti"));
    assert_eq!(intent.date_from, Some(date(2027, 7, 15)));
    assert_eq!(intent.nights, Some(7));
}

#[tokio::test]
async fn suggest_is_idempotent_unless_forced() {
    let h = Harness::new().await;
    let id = h
        .ingest("<m1@example.com>", ANA, "Upit za Hanioti", HANIOTI_BODY, "2026-10-19T08:00:00Z")
        .await;
    h.orchestrator.sync(opts()).await.expect("sync");
    h.orchestrator.parse(opts()).await.expect("parse");
    h.orchestrator.suggest(opts()).await.expect("suggest");
    let before = h.item(id).await.suggestions;

    let again = h.orchestrator.suggest(opts()).await.expect("suggest again");
    assert_eq!((again.processed, again.failed), (0, 0));
    assert_eq!(h.item(id).await.suggestions, before);

    let forced = BatchOptions {
        force: true,
        ..opts()
    };
    assert_eq!(h.orchestrator.suggest(forced).await.expect("forced").processed, 1);
    assert_eq!(h.item(id).await.suggestions, before);
}
