//! Retry and timeout behaviour of provider calls.

use std::time::Duration;

use innkeeper::providers::retry::{complete_with_retry, RetryPolicy};
use innkeeper::providers::{CompletionRequest, ProviderError};

use crate::support::ScriptedProvider;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(500),
        max_backoff: Duration::from_secs(4),
        timeout: Duration::from_secs(10),
    }
}

fn request() -> CompletionRequest {
    CompletionRequest::single("system", "user")
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited("slow down".to_owned())),
        Err(ProviderError::HttpStatus {
            status: 503,
            body: "busy".to_owned(),
        }),
        Ok("done".to_owned()),
    ]);

    let response = complete_with_retry(&provider, &request(), &policy(4))
        .await
        .expect("third attempt succeeds");
    assert_eq!(response.text, "done");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_capped() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited("1".to_owned())),
        Err(ProviderError::RateLimited("2".to_owned())),
        Ok("too late".to_owned()),
    ]);

    let err = complete_with_retry(&provider, &request(), &policy(2))
        .await
        .expect_err("ceiling reached");
    assert!(matches!(err, ProviderError::RateLimited(ref m) if m == "2"));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn permanent_failures_return_immediately() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::HttpStatus {
            status: 401,
            body: "bad key".to_owned(),
        }),
        Ok("never".to_owned()),
    ]);

    let err = complete_with_retry(&provider, &request(), &policy(4))
        .await
        .expect_err("401 is not retried");
    assert!(matches!(err, ProviderError::HttpStatus { status: 401, .. }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_attempts_still_calls_once() {
    let provider = ScriptedProvider::replying("ok");
    let response = complete_with_retry(&provider, &request(), &policy(0))
        .await
        .expect("one attempt");
    assert_eq!(response.text, "ok");
    assert_eq!(provider.calls(), 1);
}
