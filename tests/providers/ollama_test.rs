//! Ollama wire format: chat body shape, reply decoding and endpoint setup.

use serde_json::json;
use innkeeper::providers::ollama::{
    build_request, parse_response, OllamaProvider, DEFAULT_OLLAMA_URL,
};
use innkeeper::providers::{CompletionRequest, LlmProvider, Message, Role, StopReason};

fn drafting_request() -> CompletionRequest {
    CompletionRequest {
        max_tokens: Some(512),
        ..CompletionRequest::single("You are the reservations desk.", "Offer for Hanioti")
    }
}

#[test]
fn system_prompt_becomes_leading_turn() {
    let request = drafting_request();
    let body = build_request("qwen3:8b", &request);

    assert_eq!(body.model, "qwen3:8b");
    assert!(!body.stream);
    let turns: Vec<(&str, &str)> = body.messages.iter().map(|m| (m.role, m.content)).collect();
    assert_eq!(
        turns,
        [
            ("system", "You are the reservations desk."),
            ("user", "Offer for Hanioti"),
        ]
    );
}

#[test]
fn no_system_turn_without_prompt() {
    let request = CompletionRequest {
        system: None,
        ..drafting_request()
    };
    let body = build_request("model", &request);
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.messages[0].role, "user");
}

#[test]
fn sampling_options_follow_request() {
    let request = drafting_request();
    let options = build_request("model", &request)
        .options
        .expect("options should exist");
    assert_eq!(options.num_predict, Some(512));
    assert_eq!(options.temperature, Some(0.0));

    let bare = CompletionRequest {
        max_tokens: None,
        temperature: None,
        ..drafting_request()
    };
    let body = serde_json::to_value(build_request("model", &bare)).expect("serialize");
    assert!(body.get("options").is_none());
    assert_eq!(body["stream"], false);
}

#[test]
fn every_role_keeps_its_label() {
    let request = CompletionRequest {
        messages: vec![
            Message {
                role: Role::System,
                content: "sys".to_owned(),
            },
            Message::user("usr"),
            Message {
                role: Role::Assistant,
                content: "asst".to_owned(),
            },
        ],
        system: None,
        max_tokens: None,
        temperature: None,
    };
    let body = build_request("model", &request);
    let roles: Vec<&str> = body.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, ["system", "user", "assistant"]);
}

#[test]
fn reply_text_and_counts_are_read() {
    let body = json!({
        "model": "qwen3:8b",
        "message": {"role": "assistant", "content": "Poštovani,"},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 42,
        "eval_count": 7
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.text, "Poštovani,");
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
    assert_eq!(resp.usage.input_tokens, 42);
    assert_eq!(resp.usage.output_tokens, 7);
    assert_eq!(resp.model, "qwen3:8b");
}

#[test]
fn length_stop_and_missing_counts() {
    let body = json!({
        "model": "m",
        "message": {"role": "assistant", "content": "cut"},
        "done_reason": "length"
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.stop_reason, StopReason::MaxTokens);
    assert_eq!(resp.usage.input_tokens, 0);
    assert_eq!(resp.usage.output_tokens, 0);
}

#[test]
fn malformed_reply_is_a_parse_error() {
    assert!(parse_response("{\"model\": 1}").is_err());
}

#[test]
fn base_url_defaults_and_loses_trailing_slash() {
    let local = OllamaProvider::new("qwen3:8b".to_owned(), None);
    assert_eq!(local.base_url, DEFAULT_OLLAMA_URL);
    assert_eq!(local.model_id(), "qwen3:8b");

    let remote = OllamaProvider::new("m".to_owned(), Some("http://gpu-box:11434/".to_owned()));
    assert_eq!(remote.base_url, "http://gpu-box:11434");
}
