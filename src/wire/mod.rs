use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::{BrowserEngine, GenerationMode, LanguageBinding};

/// ========================================
/// Request/response data model
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    CodeGen,
    TestData,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::CodeGen => "code-gen",
            ChannelKind::TestData => "test-data",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tx {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl Tx {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), timestamp: Utc::now() }
    }
}

/// One fully assembled generation request, snapshotted after the captured
/// content has been consumed and normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub tx: Tx,
    pub channel: ChannelKind,
    pub language_binding: LanguageBinding,
    pub browser_engine: BrowserEngine,
    pub generation_modes: Vec<GenerationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u32>,
    pub user_instruction: String,
    pub dom_snippet: String,
    pub page_url: String,
}

/// What one provider call returns: raw text plus token usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Running aggregate over the sequential calls of one request. Texts are
/// trimmed and joined with a blank line; token counts only ever grow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub calls: u32,
}

impl AggregateResult {
    pub fn absorb(&mut self, call: &CallResult) {
        let piece = call.text.trim();
        if !self.text.is_empty() && !piece.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(piece);
        self.input_tokens += call.input_tokens;
        self.output_tokens += call.output_tokens;
        self.calls += 1;
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Token counts attached to assistant turns only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Immutable transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TurnMetadata>,
    pub at: DateTime<Utc>,
}
