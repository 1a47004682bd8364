use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cli::ProviderKind;
use crate::prompt::PromptKey;

/// Persisted settings. The orchestrator reads this store but never owns the
/// provider selection; updates come from the settings surface (CLI flags or
/// the settings file) and are pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: String,
    pub selected_provider: ProviderKind,
    pub selected_model: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub token_warning_threshold: u64,
    pub default_generator_type: PromptKey,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: "2025-10-01".into(),
            selected_provider: ProviderKind::OpenAI,
            selected_model: "gpt-4.1-mini".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_url: Some("http://localhost:11434".into()),
            token_warning_threshold: 10_000,
            default_generator_type: PromptKey::SeleniumJavaPageOnly,
            timeout_secs: 2400,
        }
    }
}

impl Settings {
    /// API key for a provider, falling back to the conventional env var.
    pub fn credential_for(&self, kind: ProviderKind) -> Option<String> {
        let stored = match kind {
            ProviderKind::OpenAI => self.openai_api_key.clone(),
            ProviderKind::Anthropic => self.anthropic_api_key.clone(),
            ProviderKind::Ollama => return Some(String::new()),
        };
        stored
            .filter(|k| !k.trim().is_empty())
            .or_else(|| match kind {
                ProviderKind::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
                ProviderKind::Anthropic => std::env::var("ANTHROPIC_API_KEY").ok(),
                ProviderKind::Ollama => None,
            })
            .filter(|k| !k.trim().is_empty())
    }
}

/// Shared settings store with change notification. Readers take cheap
/// snapshots; writers go through `update` so every subscriber sees the new
/// value.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
    notify: Arc<watch::Sender<u64>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { inner: Arc::new(RwLock::new(settings)), notify: Arc::new(tx) }
    }

    pub fn settings_path(root: &str) -> PathBuf {
        Path::new(root).join(".testgen").join("settings.toml")
    }

    /// Load from the settings file when present, else defaults. A missing
    /// file is not an error; a malformed one is.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.is_file() {
            let raw = fs_err::read_to_string(path)
                .with_context(|| format!("reading settings at {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parsing settings at {}", path.display()))?
        } else {
            Settings::default()
        };
        Ok(Self::new(settings))
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) {
        {
            let mut guard = self.inner.write();
            apply(&mut guard);
        }
        self.notify.send_modify(|version| *version += 1);
    }

    /// Thresholds under 100 are rejected, mirroring the settings-surface
    /// input validation.
    pub fn set_token_warning_threshold(&self, value: u64) -> Result<()> {
        if value < 100 {
            bail!("token warning threshold must be at least 100 (got {value})");
        }
        self.update(|s| s.token_warning_threshold = value);
        Ok(())
    }
}
