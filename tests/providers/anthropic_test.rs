//! Anthropic wire format: request body shape and reply decoding.

use serde_json::json;
use innkeeper::providers::anthropic::{build_request, parse_response};
use innkeeper::providers::{CompletionRequest, Message, Role, StopReason};

fn extraction_request() -> CompletionRequest {
    CompletionRequest {
        max_tokens: Some(1024),
        ..CompletionRequest::single("You extract booking fields.", "Hanioti, 2 odrasla")
    }
}

fn reply(stop_reason: &str, blocks: serde_json::Value) -> String {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": blocks,
        "model": "claude-test",
        "stop_reason": stop_reason,
        "usage": {"input_tokens": 10, "output_tokens": 5, "cache_read_input_tokens": 0}
    })
    .to_string()
}

#[test]
fn extraction_request_carries_model_system_and_limits() {
    let request = extraction_request();
    let body = build_request("claude-test", &request);

    assert_eq!(body.model, "claude-test");
    assert_eq!(body.system, Some("You extract booking fields."));
    assert_eq!(body.max_tokens, 1024);
    assert_eq!(body.temperature, Some(0.0));
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.messages[0].content, "Hanioti, 2 odrasla");
}

#[test]
fn system_turns_are_sent_as_user_turns() {
    let request = CompletionRequest {
        messages: vec![
            Message::user("Upit: Hanioti"),
            Message {
                role: Role::Assistant,
                content: "{\"location\": \"Hanioti\"}".to_owned(),
            },
            Message {
                role: Role::System,
                content: "Dates are day-first.".to_owned(),
            },
        ],
        system: None,
        max_tokens: None,
        temperature: None,
    };
    let body = build_request("model", &request);
    let roles: Vec<&str> = body.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, ["user", "assistant", "user"]);
}

#[test]
fn max_tokens_defaults_when_unset() {
    let request = CompletionRequest {
        max_tokens: None,
        ..extraction_request()
    };
    assert_eq!(build_request("model", &request).max_tokens, 2048);
}

#[test]
fn unset_optional_fields_stay_off_the_wire() {
    let request = CompletionRequest {
        system: None,
        temperature: None,
        ..extraction_request()
    };
    let body = serde_json::to_value(build_request("model", &request)).expect("serialize");
    assert!(body.get("system").is_none());
    assert!(body.get("temperature").is_none());
    assert_eq!(body["messages"][0]["role"], "user");
}

#[test]
fn reply_text_blocks_are_joined_and_others_dropped() {
    let body = reply(
        "end_turn",
        json!([
            {"type": "text", "text": "{\"adults\": "},
            {"type": "thinking", "thinking": "two adults mentioned"},
            {"type": "text", "text": "2}"}
        ]),
    );
    let resp = parse_response(&body).expect("should parse");
    assert_eq!(resp.text, "{\"adults\": 2}");
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
    assert_eq!(resp.usage.input_tokens, 10);
    assert_eq!(resp.usage.output_tokens, 5);
    assert_eq!(resp.model, "claude-test");
}

#[test]
fn stop_reasons_map() {
    for (label, expected) in [
        ("end_turn", StopReason::EndTurn),
        ("max_tokens", StopReason::MaxTokens),
        ("stop_sequence", StopReason::StopSequence),
        ("refusal", StopReason::Other("refusal".to_owned())),
    ] {
        let body = reply(label, json!([{"type": "text", "text": "x"}]));
        let resp = parse_response(&body).expect("should parse");
        assert_eq!(resp.stop_reason, expected, "label {label}");
    }
}

#[test]
fn malformed_reply_is_a_parse_error() {
    assert!(parse_response("not json").is_err());
    assert!(parse_response("{\"content\": []}").is_err());
}
