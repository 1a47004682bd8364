use anyhow::Result;
use async_trait::async_trait;

use crate::cli::ProviderKind;
use crate::config::Settings;
use crate::errors::GenError;
use crate::wire::CallResult;

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// Uniform surface over interchangeable LLM backends: one prompt in, text
/// plus token usage out. Transport failures come back verbatim; nothing is
/// retried here.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn send(&self, prompt: &str, model: &str, debug: bool) -> Result<CallResult>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

/// Build the adapter for the currently selected provider. The credential
/// check happens here, before any network activity.
pub fn make_provider(settings: &Settings) -> Result<DynProvider, GenError> {
    let kind = settings.selected_provider;
    let timeout_secs = settings.timeout_secs;
    match kind {
        ProviderKind::OpenAI => {
            let api_key = require_credential(settings, kind)?;
            Ok(Box::new(openai::OpenAIProvider::new(api_key, timeout_secs)))
        }
        ProviderKind::Anthropic => {
            let api_key = require_credential(settings, kind)?;
            Ok(Box::new(anthropic::Anthropic::new(api_key, timeout_secs)))
        }
        ProviderKind::Ollama => {
            let url = settings
                .ollama_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".into());
            Ok(Box::new(ollama::Ollama::new(url, timeout_secs)))
        }
    }
}

fn require_credential(settings: &Settings, kind: ProviderKind) -> Result<String, GenError> {
    if !kind.requires_credential() {
        return Ok(String::new());
    }
    settings
        .credential_for(kind)
        .ok_or_else(|| GenError::MissingCredential(kind.label().to_string()))
}

/// Indirection the orchestrator uses to obtain a provider per request, so the
/// missing-credential path stays inside the request lifecycle (and tests can
/// substitute a scripted backend).
pub trait ProviderSource: Send + Sync {
    fn acquire(&self, settings: &Settings) -> Result<DynProvider, GenError>;
}

pub struct HttpProviderSource;

impl ProviderSource for HttpProviderSource {
    fn acquire(&self, settings: &Settings) -> Result<DynProvider, GenError> {
        make_provider(settings)
    }
}
