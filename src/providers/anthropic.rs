//! Anthropic backend (`POST /v1/messages`).
//!
//! The wire types are public (hidden from docs) so tests can pin the request
//! shape without a server.

use serde::{Deserialize, Serialize};

use super::{
    http_client, normalize_base_url, post_json, CompletionRequest, CompletionResponse,
    LlmProvider, ProviderError, Role, StopReason, UsageStats,
};

/// Public API endpoint.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Enough for an extraction record or a full offer draft.
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Request body, borrowing from the [`CompletionRequest`].
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct MessagesBody<'a> {
    pub model: &'a str,
    pub messages: Vec<Turn<'a>>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One turn; the API only knows `user` and `assistant`.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct Turn<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<Block>,
    model: String,
    stop_reason: Option<String>,
    usage: UsageStats,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    #[serde(other)]
    Ignored,
}

/// Anthropic messages client.
#[derive(Clone)]
pub struct AnthropicProvider {
    model_name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("api_key", &"__REDACTED__")
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Client for `model_name`; `base_url` overrides the public endpoint.
    pub fn new(model_name: String, base_url: Option<String>, api_key: String) -> Self {
        Self {
            model_name,
            base_url: normalize_base_url(base_url, DEFAULT_ANTHROPIC_URL),
            api_key,
            client: http_client(),
        }
    }
}

/// Wire body for `request`. System-role turns are sent as user turns; the
/// system prompt travels in its own field.
#[doc(hidden)]
pub fn build_request<'a>(model: &'a str, request: &'a CompletionRequest) -> MessagesBody<'a> {
    MessagesBody {
        model,
        messages: request
            .messages
            .iter()
            .map(|m| Turn {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: &m.content,
            })
            .collect(),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system: request.system.as_deref(),
        temperature: request.temperature,
    }
}

/// Decode a reply; text blocks are concatenated, other block kinds dropped.
///
/// # Errors
///
/// [`ProviderError::Parse`] when the body does not decode.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let reply: MessagesReply =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let text = reply
        .content
        .into_iter()
        .filter_map(|block| match block {
            Block::Text { text } => Some(text),
            Block::Ignored => None,
        })
        .collect();

    Ok(CompletionResponse {
        text,
        stop_reason: StopReason::from_wire(reply.stop_reason.as_deref()),
        usage: reply.usage,
        model: reply.model,
    })
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let call = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("x-api-key", &self.api_key);
        let payload = post_json(call, &build_request(&self.model_name, &request)).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model_name
    }
}
