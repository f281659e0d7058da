//! Local Ollama backend (`POST /api/chat`, non-streaming).

use serde::{Deserialize, Serialize};

use super::{
    http_client, normalize_base_url, post_json, CompletionRequest, CompletionResponse,
    LlmProvider, ProviderError, Role, StopReason, UsageStats,
};

/// Default local server.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Request body, borrowing from the [`CompletionRequest`].
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatTurn<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SamplingOptions>,
}

/// One chat turn. Ollama takes the system prompt as a leading `system` turn.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatTurn<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// `options` object; only sent when something is set.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatReply {
    model: String,
    message: ReplyMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Ollama chat client.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Model tag, e.g. `qwen3:8b`.
    #[doc(hidden)]
    pub model: String,
    /// Server root without trailing slash.
    #[doc(hidden)]
    pub base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Client for `model_name`; `base_url` overrides the local default.
    pub fn new(model_name: String, base_url: Option<String>) -> Self {
        Self {
            model: model_name,
            base_url: normalize_base_url(base_url, DEFAULT_OLLAMA_URL),
            client: http_client(),
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Wire body for `request`.
#[doc(hidden)]
pub fn build_request<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatBody<'a> {
    let system = request.system.as_deref().map(|content| ChatTurn {
        role: "system",
        content,
    });
    let turns = request.messages.iter().map(|m| ChatTurn {
        role: role_label(m.role),
        content: &m.content,
    });

    let options = match (request.max_tokens, request.temperature) {
        (None, None) => None,
        (num_predict, temperature) => Some(SamplingOptions {
            num_predict,
            temperature,
        }),
    };

    ChatBody {
        model,
        messages: system.into_iter().chain(turns).collect(),
        stream: false,
        options,
    }
}

/// Decode a reply; missing token counts read as 0.
///
/// # Errors
///
/// [`ProviderError::Parse`] when the body does not decode.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let reply: ChatReply =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(CompletionResponse {
        text: reply.message.content,
        stop_reason: StopReason::from_wire(reply.done_reason.as_deref()),
        usage: UsageStats {
            input_tokens: reply.prompt_eval_count,
            output_tokens: reply.eval_count,
        },
        model: reply.model,
    })
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let call = self.client.post(format!("{}/api/chat", self.base_url));
        let payload = post_json(call, &build_request(&self.model, &request)).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
