//! Innkeeper CLI entry point.
//!
//! Batch subcommands (`sync`, `parse`, `suggest`, `draft`, `send`, `run`)
//! drive the pipeline over the configured SQLite store. `extract`, `search`
//! and `flow` run the components directly on one input and print JSON.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use innkeeper::api::{InquiryApi, SearchRequest, TextRequest};
use innkeeper::composer::DraftComposer;
use innkeeper::config::InnkeeperConfig;
use innkeeper::extractors::heuristic::HeuristicExtractor;
use innkeeper::extractors::ExtractorChain;
use innkeeper::inventory::AccommodationUnit;
use innkeeper::outbound::OutboxTransport;
use innkeeper::pipeline::{BatchOptions, BatchReport, Orchestrator, PipelineSettings};
use innkeeper::providers::router::ModelRouter;
use innkeeper::ranking::TierPolicy;
use innkeeper::store::{IngestOutcome, InventorySource, PipelineStore, SqliteStore};
use innkeeper::types::RawMessage;

/// Innkeeper: travel inquiry pipeline.
#[derive(Parser)]
#[command(name = "innkeeper", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every batch subcommand.
#[derive(Args, Debug, Clone, Copy)]
struct BatchArgs {
    /// Items per run (defaults to `[pipeline].batch_limit`).
    #[arg(long)]
    limit: Option<u32>,
    /// Also pick up items in non-fresh statuses.
    #[arg(long)]
    retry: bool,
    /// Ignore idempotency skips and rebuild.
    #[arg(long)]
    force: bool,
}

impl From<BatchArgs> for BatchOptions {
    fn from(args: BatchArgs) -> Self {
        Self {
            limit: args.limit,
            retry: args.retry,
            force: args.force,
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Store raw messages from a JSON array file (duplicates are ignored).
    Ingest {
        /// JSON file with an array of raw messages.
        file: PathBuf,
    },
    /// Load units, rooms and price periods from a JSON array file.
    SeedInventory {
        /// JSON file with an array of accommodation units.
        file: PathBuf,
    },
    /// Attach new items to inquiries.
    Sync(BatchArgs),
    /// Extract and gate synced items.
    Parse(BatchArgs),
    /// Match and rank parsed items.
    Suggest(BatchArgs),
    /// Compose reply drafts.
    Draft(BatchArgs),
    /// Hand drafts to the outbox.
    Send(BatchArgs),
    /// Sync, parse, suggest and draft in one go.
    Run(BatchArgs),
    /// Exclude an item from automated processing.
    StopAi {
        /// Pipeline item id.
        item: i64,
        /// Clear the flag instead of setting it.
        #[arg(long)]
        resume: bool,
    },
    /// Extract booking intent from text (`-` reads stdin) and print it as JSON.
    Extract {
        /// Inquiry text.
        text: String,
    },
    /// Relevance search; the query is a JSON object (`-` reads stdin).
    Search {
        /// Search request JSON.
        query: String,
    },
    /// Run extraction, gate, matching, ranking and drafting on one text.
    Flow {
        /// Inquiry text (`-` reads stdin).
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = InnkeeperConfig::load().context("failed to load configuration")?;

    let _logging_guard = match cli.command {
        Command::Run(_) => Some(innkeeper::logging::init_production(
            Path::new(&config.paths.logs_dir),
            &config.general.log_level,
        )?),
        _ => {
            innkeeper::logging::init_cli(&config.general.log_level);
            None
        }
    };

    match cli.command {
        Command::Ingest { file } => handle_ingest(&config, &file).await,
        Command::SeedInventory { file } => handle_seed(&config, &file).await,
        Command::Sync(args) => {
            let orchestrator = build_orchestrator(&config).await?;
            print_report(orchestrator.sync(args.into()).await?);
            Ok(())
        }
        Command::Parse(args) => {
            let orchestrator = build_orchestrator(&config).await?;
            print_report(orchestrator.parse(args.into()).await?);
            Ok(())
        }
        Command::Suggest(args) => {
            let orchestrator = build_orchestrator(&config).await?;
            print_report(orchestrator.suggest(args.into()).await?);
            Ok(())
        }
        Command::Draft(args) => {
            let orchestrator = build_orchestrator(&config).await?;
            print_report(orchestrator.draft(args.into()).await?);
            Ok(())
        }
        Command::Send(args) => {
            let orchestrator = build_orchestrator(&config).await?;
            print_report(orchestrator.send(args.into()).await?);
            Ok(())
        }
        Command::Run(args) => {
            info!("batch run starting");
            let orchestrator = build_orchestrator(&config).await?;
            for report in orchestrator.run_all(args.into()).await? {
                print_report(report);
            }
            Ok(())
        }
        Command::StopAi { item, resume } => {
            let store = open_store(&config).await?;
            store.set_ai_stopped(item, !resume).await?;
            println!("item {item}: ai_stopped={}", !resume);
            Ok(())
        }
        Command::Extract { text } => {
            let api = build_api(&config)?;
            let intent = api
                .extract(&TextRequest {
                    raw_text: read_arg(text)?,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&intent)?);
            Ok(())
        }
        Command::Search { query } => {
            let request: SearchRequest =
                serde_json::from_str(&read_arg(query)?).context("invalid search request JSON")?;
            let units = load_units(&config).await?;
            let response = build_api(&config)?.search(&units, &request);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Flow { text } => {
            let units = load_units(&config).await?;
            let response = build_api(&config)?
                .flow(
                    &units,
                    &TextRequest {
                        raw_text: read_arg(text)?,
                    },
                )
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

/// `-` means stdin.
fn read_arg(value: String) -> anyhow::Result<String> {
    if value != "-" {
        return Ok(value);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn print_report(report: BatchReport) {
    println!("{report}");
}

async fn open_store(config: &InnkeeperConfig) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(Path::new(&config.paths.database))
        .await
        .with_context(|| format!("failed to open database {}", config.paths.database))
}

async fn load_units(config: &InnkeeperConfig) -> anyhow::Result<Vec<AccommodationUnit>> {
    let store = open_store(config).await?;
    store.units().await.context("failed to load inventory")
}

fn build_router(config: &InnkeeperConfig) -> anyhow::Result<ModelRouter> {
    let router = ModelRouter::from_config(&config.llm).context("invalid [llm] configuration")?;
    info!(router = ?router, "model router ready");
    Ok(router)
}

fn build_api(config: &InnkeeperConfig) -> anyhow::Result<InquiryApi> {
    let router = build_router(config)?;
    Ok(InquiryApi::new(
        ExtractorChain::from_router(&router, HeuristicExtractor::new()),
        DraftComposer::from_router(&router),
        TierPolicy::from(&config.pipeline),
    ))
}

async fn build_orchestrator(config: &InnkeeperConfig) -> anyhow::Result<Orchestrator> {
    let router = build_router(config)?;
    let store = Arc::new(open_store(config).await?);
    let transport = Arc::new(OutboxTransport::new(&config.paths.outbox_dir));
    Ok(Orchestrator::new(
        store.clone(),
        store,
        transport,
        PipelineSettings::from(&config.pipeline),
    )
    .with_extractor(ExtractorChain::from_router(&router, HeuristicExtractor::new()))
    .with_composer(DraftComposer::from_router(&router)))
}

async fn handle_ingest(config: &InnkeeperConfig, file: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let messages: Vec<RawMessage> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid raw message JSON in {}", file.display()))?;

    let store = open_store(config).await?;
    let (mut inserted, mut duplicates) = (0u32, 0u32);
    for message in &messages {
        match store.ingest(message).await? {
            IngestOutcome::Inserted { .. } => inserted = inserted.saturating_add(1),
            IngestOutcome::Duplicate => duplicates = duplicates.saturating_add(1),
        }
    }
    println!("ingest: inserted={inserted} duplicates={duplicates}");
    Ok(())
}

async fn handle_seed(config: &InnkeeperConfig, file: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let units: Vec<AccommodationUnit> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid inventory JSON in {}", file.display()))?;

    let store = open_store(config).await?;
    let count = store.seed_inventory(&units).await?;
    println!("seed-inventory: units={count}");
    Ok(())
}
