//! Language-model text service used by the optional AI strategies.
//!
//! [`LlmProvider`] is the seam: the extraction and drafting strategies only
//! ever see a provider behind an `Arc<dyn LlmProvider>`. Backends:
//! - [`anthropic::AnthropicProvider`] (`POST /v1/messages`)
//! - [`ollama::OllamaProvider`] (`POST /api/chat`)
//!
//! [`router::ModelRouter`] decides which pipeline role gets a provider, and
//! [`retry::complete_with_retry`] bounds every call with a timeout, an attempt
//! ceiling and exponential backoff.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod anthropic;
pub mod ollama;
pub mod retry;
pub mod router;

const USER_AGENT: &str = concat!("innkeeper/", env!("CARGO_PKG_VERSION"));

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 256;

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"sk-ant-[A-Za-z0-9_\-]{10,}", r"sk-[A-Za-z0-9]{32,}"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Who authored a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// The inquiry text or rendering task.
    User,
    /// A previous model turn.
    Assistant,
}

/// One prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl Message {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// What the strategies ask a provider for.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Prompt turns, oldest first.
    pub messages: Vec<Message>,
    /// Instructions sent ahead of the turns.
    pub system: Option<String>,
    /// Output ceiling; the backend default when `None`.
    pub max_tokens: Option<u32>,
    /// Sampling temperature; the backend default when `None`.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Instructions plus one user turn, sampled greedily.
    ///
    /// Extraction and drafting both want repeatable output, hence temperature 0.
    pub fn single(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(user)],
            system: Some(system.into()),
            max_tokens: None,
            temperature: Some(0.0),
        }
    }
}

/// Why generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished.
    EndTurn,
    /// The output ceiling cut the reply; JSON replies are likely incomplete.
    MaxTokens,
    /// A stop sequence matched.
    StopSequence,
    /// Anything else the backend reports.
    Other(String),
}

impl StopReason {
    /// Map a backend's stop label; a missing label counts as a normal finish.
    fn from_wire(label: Option<&str>) -> Self {
        match label {
            None | Some("end_turn" | "stop") => Self::EndTurn,
            Some("max_tokens" | "length") => Self::MaxTokens,
            Some("stop_sequence") => Self::StopSequence,
            Some(other) => Self::Other(other.to_owned()),
        }
    }
}

/// Token counts reported by the backend (0 when it reports none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Generated tokens.
    pub output_tokens: u32,
}

/// A finished completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Reply text.
    pub text: String,
    /// Why generation ended.
    pub stop_reason: StopReason,
    /// Token counts.
    pub usage: UsageStats,
    /// Model that actually answered.
    pub model: String,
}

/// Provider call failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The reply body is not what the backend documents.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Non-success status other than 429.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitised response body.
        body: String,
    },
    /// HTTP 429.
    #[error("provider rate limited: {0}")]
    RateLimited(String),
    /// The attempt exceeded its timeout.
    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// No provider can serve the call.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Parse(_) | Self::Unavailable(_) => false,
        }
    }
}

/// Model-facing text service.
///
/// Shared between the extraction and drafting strategies, hence `Send + Sync`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, status or parse failure.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Model name this provider sends.
    fn model_id(&self) -> &str;
}

/// Turn an HTTP response into its body, or a typed error for non-2xx.
///
/// # Errors
///
/// [`ProviderError::Request`] when the body cannot be read,
/// [`ProviderError::RateLimited`] on 429, [`ProviderError::HttpStatus`] for
/// any other failure status.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited(sanitize_http_error_body(&body)));
    }
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Make an upstream error body safe for logs and stored error reasons:
/// whitespace collapsed, API keys redacted, length bounded.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let mut cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for pattern in SECRET_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "[REDACTED]").into_owned();
    }
    if cleaned.chars().count() <= MAX_ERROR_BODY_CHARS {
        return cleaned;
    }
    let head: String = cleaned.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{head}...[truncated]")
}

/// Client shared by the HTTP backends.
fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// POST a JSON body and return the checked response text.
async fn post_json<B: Serialize + ?Sized>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<String, ProviderError> {
    let response = request.json(body).send().await?;
    check_http_response(response).await
}

/// Base URL override or default, without a trailing slash.
fn normalize_base_url(base_url: Option<String>, default: &str) -> String {
    base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_owned()
}

/// Pull the first JSON object out of a model reply.
///
/// Models wrap JSON in prose or markdown fences often enough that the reply
/// is scanned for the outermost `{ ... }` span instead of parsed verbatim.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
