//! Integration tests for model router configuration and role resolution.

use std::sync::Arc;

use innkeeper::config::{LlmConfig, ProviderKind};
use innkeeper::providers::router::{ModelRole, ModelRouter, RouterError};
use innkeeper::providers::LlmProvider;

use crate::support::{single_attempt, ScriptedProvider};

fn anthropic_config(api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        provider: ProviderKind::Anthropic,
        model: "claude-sonnet-4-20250514".to_owned(),
        api_key: api_key.map(str::to_owned),
        ..LlmConfig::default()
    }
}

#[test]
fn no_provider_means_deterministic_everywhere() {
    let router = ModelRouter::from_config(&LlmConfig::default()).expect("default config is valid");
    assert!(router.resolve(ModelRole::Extraction).is_none());
    assert!(router.resolve(ModelRole::Drafting).is_none());

    let disabled = ModelRouter::disabled();
    assert!(disabled.resolve(ModelRole::Extraction).is_none());
}

#[test]
fn anthropic_requires_api_key() {
    for key in [None, Some("   ")] {
        let err = ModelRouter::from_config(&anthropic_config(key)).expect_err("key required");
        match err {
            RouterError::MissingCredential { provider, key } => {
                assert_eq!(provider, "anthropic");
                assert_eq!(key, "INNKEEPER_LLM_API_KEY");
            }
            other => panic!("expected missing credential, got {other}"),
        }
    }
}

#[test]
fn selected_provider_requires_model() {
    let config = LlmConfig {
        provider: ProviderKind::Ollama,
        model: " ".to_owned(),
        ..LlmConfig::default()
    };
    let err = ModelRouter::from_config(&config).expect_err("model required");
    assert!(matches!(err, RouterError::MissingModel { provider } if provider == "ollama"));
}

#[test]
fn roles_follow_opt_in_flags() {
    let router = ModelRouter::from_config(&anthropic_config(Some("sk-ant-test"))).expect("valid");
    let extraction = router
        .resolve(ModelRole::Extraction)
        .expect("extraction enabled by default");
    assert_eq!(extraction.model_id(), "claude-sonnet-4-20250514");
    assert!(router.resolve(ModelRole::Drafting).is_none());

    let config = LlmConfig {
        provider: ProviderKind::Ollama,
        model: "qwen3:8b".to_owned(),
        use_for_extraction: false,
        use_for_drafting: true,
        ..LlmConfig::default()
    };
    let router = ModelRouter::from_config(&config).expect("valid");
    assert!(router.resolve(ModelRole::Extraction).is_none());
    assert_eq!(
        router
            .resolve(ModelRole::Drafting)
            .expect("drafting enabled")
            .model_id(),
        "qwen3:8b"
    );
}

#[test]
fn retry_policy_comes_from_config() {
    let config = LlmConfig {
        max_attempts: 2,
        initial_backoff_ms: 100,
        ..LlmConfig::default()
    };
    let router = ModelRouter::from_config(&config).expect("valid");
    assert_eq!(router.retry_policy().max_attempts, 2);
    assert_eq!(router.retry_policy().backoff_for(2).as_millis(), 200);
}

#[test]
fn testing_router_serves_every_role() {
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::replying("ok"));
    let router = ModelRouter::for_testing(provider, single_attempt());
    for role in [ModelRole::Extraction, ModelRole::Drafting] {
        assert_eq!(router.resolve(role).expect("routed").model_id(), "scripted");
    }
    assert_eq!(router.retry_policy(), single_attempt());
}
