//! Configuration loading and management.
//!
//! Loads configuration from `./innkeeper.toml` (or `$INNKEEPER_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
///
/// Path: `./innkeeper.toml` or `$INNKEEPER_CONFIG_PATH`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InnkeeperConfig {
    /// General settings (`[general]`).
    pub general: GeneralConfig,
    /// Filesystem paths for persistent state (`[paths]`).
    pub paths: PathsConfig,
    /// Batch and search limits (`[pipeline]`).
    pub pipeline: PipelineConfig,
    /// Optional language-model strategy (`[llm]`).
    pub llm: LlmConfig,
}

impl InnkeeperConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve config path using a custom env resolver.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("INNKEEPER_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("innkeeper.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("INNKEEPER_LOG_LEVEL") {
            self.general.log_level = v;
        }

        // Paths.
        if let Some(v) = env("INNKEEPER_DATABASE") {
            self.paths.database = v;
        }
        if let Some(v) = env("INNKEEPER_LOGS_DIR") {
            self.paths.logs_dir = v;
        }
        if let Some(v) = env("INNKEEPER_OUTBOX_DIR") {
            self.paths.outbox_dir = v;
        }

        // Pipeline.
        if let Some(v) = env("INNKEEPER_BATCH_LIMIT") {
            match v.parse() {
                Ok(n) => self.pipeline.batch_limit = n,
                Err(_) => tracing::warn!(
                    var = "INNKEEPER_BATCH_LIMIT",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // LLM.
        if let Some(v) = env("INNKEEPER_LLM_PROVIDER") {
            match v.parse() {
                Ok(kind) => self.llm.provider = kind,
                Err(_) => tracing::warn!(
                    var = "INNKEEPER_LLM_PROVIDER",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("INNKEEPER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env("INNKEEPER_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = env("INNKEEPER_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML for this schema.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: InnkeeperConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── General config ──────────────────────────────────────────────

/// General settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths for persistent state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// SQLite database file.
    pub database: String,
    /// Directory for rotated JSON logs.
    pub logs_dir: String,
    /// Directory the outbox transport writes outgoing replies to.
    pub outbox_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: "innkeeper.db".to_owned(),
            logs_dir: "logs".to_owned(),
            outbox_dir: "outbox".to_owned(),
        }
    }
}

// ── Pipeline config ─────────────────────────────────────────────

/// Batch sizes, search caps and tolerance policies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items per batch run when the caller gives no limit.
    pub batch_limit: u32,
    /// Matcher candidate cap.
    pub match_limit: usize,
    /// Relevance-search pool cap.
    pub search_cap: usize,
    /// Primary tier cap.
    pub primary_cap: usize,
    /// Alternative tier cap.
    pub alternative_cap: usize,
    /// Stored error reasons are cut to this many characters.
    pub error_reason_max_chars: usize,
    /// Budget slack (currency units) allowed by the relevance search.
    pub search_budget_slack: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_limit: 50,
            match_limit: 20,
            search_cap: 30,
            primary_cap: 5,
            alternative_cap: 5,
            error_reason_max_chars: 300,
            search_budget_slack: 20,
        }
    }
}

// ── LLM config ──────────────────────────────────────────────────

/// Which language-model backend serves the optional AI strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic strategies only.
    #[default]
    None,
    /// Anthropic messages API.
    Anthropic,
    /// Local Ollama server.
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown llm provider {other:?}")),
        }
    }
}

/// Optional language-model strategy settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection.
    pub provider: ProviderKind,
    /// Model name passed to the backend.
    pub model: String,
    /// Override for the backend base URL.
    pub base_url: Option<String>,
    /// API key (Anthropic).
    pub api_key: Option<String>,
    /// Use the model for extraction.
    pub use_for_extraction: bool,
    /// Use the model to phrase drafts.
    pub use_for_drafting: bool,
    /// Hard timeout per attempt.
    pub timeout_seconds: u64,
    /// Attempt ceiling, first call included.
    pub max_attempts: u32,
    /// First backoff delay.
    pub initial_backoff_ms: u64,
    /// Backoff cap.
    pub max_backoff_ms: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("use_for_extraction", &self.use_for_extraction)
            .field("use_for_drafting", &self.use_for_drafting)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::None,
            model: "claude-sonnet-4-20250514".to_owned(),
            base_url: None,
            api_key: None,
            use_for_extraction: true,
            use_for_drafting: false,
            timeout_seconds: 30,
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

impl LlmConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

// ── Tests ───────────────────────────────────────────────────────
