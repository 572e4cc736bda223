//! Assistant configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists. Environment and command-line overrides are applied on top by
//! [`ParleyConfig::apply_env`] and the binary.

use crate::types::ProviderKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub provider: ProviderConfig,
    pub session: SessionSettings,
    /// Named operating modes described by the SwitchMode tool.
    pub modes: BTreeMap<String, ModeProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Model name. Empty means the provider's default.
    pub model: String,
    /// Override the provider endpoint.
    pub base_url: Option<String>,
    /// Inline API key. Prefer the provider's environment variable.
    pub api_key: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Inputs that end the session (matched case-insensitively).
    pub exit_keywords: Vec<String>,
    /// Second interrupt within this window confirms exit.
    pub debounce_window_secs: u64,
    /// Activity indicator refresh cadence.
    pub indicator_interval_ms: u64,
    /// Upper bound on model ↔ tool round trips in one agent turn.
    pub max_tool_iterations: usize,
    pub assistant_name: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeProfile {
    pub features: String,
    pub speed: String,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ParleyConfig {
    fn default() -> Self {
        let mut modes = BTreeMap::new();
        modes.insert(
            "power".to_string(),
            ModeProfile {
                features: "all tools, largest model, full context".into(),
                speed: "slow".into(),
            },
        );
        modes.insert(
            "balanced".to_string(),
            ModeProfile {
                features: "all tools, default model".into(),
                speed: "medium".into(),
            },
        );
        modes.insert(
            "eco".to_string(),
            ModeProfile {
                features: "local tools only, short answers".into(),
                speed: "fast".into(),
            },
        );
        Self {
            provider: ProviderConfig::default(),
            session: SessionSettings::default(),
            modes,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: String::new(),
            base_url: None,
            api_key: None,
            max_tokens: 4096,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            exit_keywords: vec!["exit".into(), "quit".into(), "bye".into()],
            debounce_window_secs: 10,
            indicator_interval_ms: 80,
            max_tool_iterations: 8,
            assistant_name: "Parley".into(),
            system_prompt: "You are Parley, a helpful assistant running in the user's terminal. \
                You have tools for the clock, the local filesystem, the web browser and the \
                assistant's operating mode; use them when they help. Answer general knowledge \
                questions directly. Keep answers clear and concise."
                .into(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl ParleyConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Write the default config to `path` unless a file already exists there.
    /// Returns `true` when a file was written.
    pub fn write_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default().to_toml())?;
        Ok(true)
    }

    /// Apply `PARLEY_PROVIDER`, `PARLEY_MODEL` and `PARLEY_BASE_URL`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var("PARLEY_PROVIDER").ok().as_deref(),
            std::env::var("PARLEY_MODEL").ok().as_deref(),
            std::env::var("PARLEY_BASE_URL").ok().as_deref(),
        )
    }

    /// Apply explicit overrides; blank values are ignored.
    pub fn apply_overrides(
        &mut self,
        provider: Option<&str>,
        model: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<()> {
        if let Some(kind) = provider.filter(|p| !p.trim().is_empty()) {
            let kind: ProviderKind = kind.parse()?;
            if kind != self.provider.kind {
                // A model chosen for another provider rarely makes sense here.
                self.provider.model.clear();
                self.provider.base_url = None;
            }
            self.provider.kind = kind;
        }
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.provider.model = model.trim().to_string();
        }
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.provider.base_url = Some(url.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.debounce_window_secs == 0 {
            return Err(Error::config("session.debounce_window_secs must be at least 1"));
        }
        if self.session.indicator_interval_ms == 0 {
            return Err(Error::config("session.indicator_interval_ms must be at least 1"));
        }
        if self.session.max_tool_iterations == 0 {
            return Err(Error::config("session.max_tool_iterations must be at least 1"));
        }
        if let Some(url) = &self.provider.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::config(format!(
                    "provider.base_url '{}': expected http:// or https:// URL",
                    url
                )));
            }
        }
        Ok(())
    }
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            self.kind.default_model()
        } else {
            &self.model
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().or(self.kind.default_base_url())
    }

    /// Resolve the API key: inline config first, then the provider's env var.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(Some(key.clone()));
        }
        let Some(env_var) = self.kind.api_key_env() else {
            return Ok(None);
        };
        match std::env::var(env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(Error::missing_api_key(self.kind.as_str(), env_var)),
        }
    }
}

impl SessionSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_window_secs)
    }

    pub fn indicator_interval(&self) -> Duration {
        Duration::from_millis(self.indicator_interval_ms)
    }
}

/// `~/.config/parley`, or `./.parley` when no config dir is known.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("parley"))
        .unwrap_or_else(|| PathBuf::from(".parley"))
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
