//! Tests for parley-core: config loading, overrides, provider kinds, errors

use parley_core::*;

// ===========================================================================
// ProviderKind
// ===========================================================================

#[test]
fn provider_kind_parses_aliases() {
    assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    assert_eq!("local".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
    assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
}

#[test]
fn provider_kind_unknown_is_error() {
    let err = "palm".parse::<ProviderKind>().unwrap_err();
    assert!(matches!(err, Error::UnknownProvider(ref p) if p == "palm"));
}

#[test]
fn provider_kind_display_round_trips() {
    for kind in ProviderKind::ALL {
        assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
    }
}

#[test]
fn provider_kind_key_requirements() {
    assert_eq!(ProviderKind::Groq.api_key_env(), Some("GROQ_API_KEY"));
    assert!(ProviderKind::Ollama.api_key_env().is_none());
    assert!(ProviderKind::Mock.default_base_url().is_none());
    assert_eq!(
        ProviderKind::OpenRouter.default_base_url(),
        Some("https://openrouter.ai/api/v1")
    );
}

// ===========================================================================
// ParleyConfig
// ===========================================================================

#[test]
fn default_config_values() {
    let config = ParleyConfig::default();
    assert_eq!(config.session.debounce_window_secs, 10);
    assert_eq!(config.session.exit_keywords, vec!["exit", "quit", "bye"]);
    assert!(config.modes.contains_key("power"));
    assert!(config.modes.contains_key("balanced"));
    assert!(config.modes.contains_key("eco"));
    assert!(config.validate().is_ok());
}

#[test]
fn partial_toml_keeps_defaults() {
    let config = ParleyConfig::from_toml(
        r#"
        [provider]
        kind = "groq"
        model = "llama3-70b"

        [session]
        debounce_window_secs = 5
        "#,
    )
    .unwrap();
    assert_eq!(config.provider.kind, ProviderKind::Groq);
    assert_eq!(config.provider.model(), "llama3-70b");
    assert_eq!(config.session.debounce_window_secs, 5);
    assert_eq!(config.session.indicator_interval_ms, 80);
    assert_eq!(config.modes.len(), 3);
}

#[test]
fn invalid_toml_is_error() {
    assert!(matches!(
        ParleyConfig::from_toml("provider = [").unwrap_err(),
        Error::TomlError(_)
    ));
}

#[test]
fn load_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ParleyConfig::load(&dir.path().join("nope.toml"));
    assert_eq!(config.provider.kind, ProviderKind::Anthropic);
}

#[test]
fn load_broken_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not toml = = =").unwrap();
    let config = ParleyConfig::load(&path);
    assert_eq!(config.session.debounce_window_secs, 10);
}

#[test]
fn write_default_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    assert!(ParleyConfig::write_default_if_missing(&path).unwrap());
    assert!(!ParleyConfig::write_default_if_missing(&path).unwrap());
    let config = ParleyConfig::load(&path);
    assert_eq!(config.modes, ParleyConfig::default().modes);
}

#[test]
fn overrides_switch_provider_and_reset_model() {
    let mut config = ParleyConfig::default();
    config.provider.model = "claude-opus".into();
    config
        .apply_overrides(Some("ollama"), None, Some(""))
        .unwrap();
    assert_eq!(config.provider.kind, ProviderKind::Ollama);
    assert_eq!(config.provider.model(), "llama3");
    assert_eq!(config.provider.base_url(), Some("http://localhost:11434/v1"));

    config
        .apply_overrides(None, Some("mistral"), Some("http://gpu-box:11434/v1"))
        .unwrap();
    assert_eq!(config.provider.model(), "mistral");
    assert_eq!(config.provider.base_url(), Some("http://gpu-box:11434/v1"));
}

#[test]
fn overrides_reject_unknown_provider() {
    let mut config = ParleyConfig::default();
    assert!(config.apply_overrides(Some("watson"), None, None).is_err());
}

#[test]
fn validate_rejects_zero_window_and_bad_url() {
    let mut config = ParleyConfig::default();
    config.session.debounce_window_secs = 0;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

    let mut config = ParleyConfig::default();
    config.provider.base_url = Some("ftp://example.com".into());
    assert!(config.validate().is_err());
}

#[test]
fn inline_api_key_wins() {
    let mut provider = ProviderConfig::default();
    provider.api_key = Some("sk-inline".into());
    assert_eq!(provider.resolve_api_key().unwrap().as_deref(), Some("sk-inline"));
}

#[test]
fn keyless_providers_resolve_to_none() {
    let provider = ProviderConfig {
        kind: ProviderKind::Mock,
        ..Default::default()
    };
    assert!(provider.resolve_api_key().unwrap().is_none());
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display() {
    let err = Error::missing_api_key("groq", "GROQ_API_KEY");
    assert_eq!(err.to_string(), "missing api key for groq (set GROQ_API_KEY)");
    assert_eq!(Error::config("bad").to_string(), "config error: bad");
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::IoError(_)));
}
