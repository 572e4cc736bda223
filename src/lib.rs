//! Parley - conversational terminal assistant
//!
//! Glue between the config layer and the provider adapters. The binary in
//! `src/bin/parley.rs` owns the terminal; everything it needs to build a
//! session from a [`ParleyConfig`](parley_core::ParleyConfig) lives here.

use parley_core::types::ProviderKind;
use parley_core::{Error, ProviderConfig};
use parley_llm::{AnthropicProvider, LlmProvider, MockProvider, OpenAiCompatProvider};
use std::sync::Arc;
use tracing::info;

/// Construct the provider adapter named by `config`.
pub fn build_provider(config: &ProviderConfig) -> parley_core::Result<Arc<dyn LlmProvider>> {
    let model = config.model().to_string();
    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::Anthropic => {
            let key = config
                .resolve_api_key()?
                .ok_or_else(|| Error::missing_api_key("anthropic", "ANTHROPIC_API_KEY"))?;
            let mut provider = AnthropicProvider::new(key, model);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::Groq | ProviderKind::Ollama => {
            let base_url = config
                .base_url()
                .ok_or_else(|| Error::config(format!("no base_url for provider {}", config.kind)))?;
            Arc::new(OpenAiCompatProvider::new(
                config.kind.as_str(),
                base_url,
                config.resolve_api_key()?,
                model,
            ))
        }
        ProviderKind::Mock => Arc::new(MockProvider::default()),
    };
    info!("Using provider {} (model={})", provider.name(), provider.model());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_needs_no_key() {
        let config = ProviderConfig { kind: ProviderKind::Mock, ..Default::default() };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.model(), "mock");
    }

    #[test]
    fn ollama_uses_default_endpoint_and_model() {
        let config = ProviderConfig { kind: ProviderKind::Ollama, ..Default::default() };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3");
    }

    #[test]
    fn inline_key_builds_remote_providers() {
        let config = ProviderConfig {
            kind: ProviderKind::Groq,
            model: "mixtral".into(),
            api_key: Some("gsk-test".into()),
            ..Default::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.model(), "mixtral");

        let config = ProviderConfig {
            kind: ProviderKind::Anthropic,
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        };
        assert_eq!(build_provider(&config).unwrap().name(), "anthropic");
    }
}
