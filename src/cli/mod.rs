use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Ollama is a local endpoint and carries no API key.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageBinding {
    Java,
    #[value(alias = "ts", alias = "typescript")]
    TypeScript,
    #[value(alias = "csharp", alias = "cs")]
    CSharp,
    #[value(alias = "py")]
    Python,
}

impl LanguageBinding {
    pub fn label(&self) -> &'static str {
        match self {
            LanguageBinding::Java => "java",
            LanguageBinding::TypeScript => "typescript",
            LanguageBinding::CSharp => "csharp",
            LanguageBinding::Python => "python",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Selenium,
    Playwright,
}

impl BrowserEngine {
    pub fn label(&self) -> &'static str {
        match self {
            BrowserEngine::Selenium => "selenium",
            BrowserEngine::Playwright => "playwright",
        }
    }
}

/// Generation-mode toggles (the FEATURE / PAGE checkboxes).
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationMode {
    Feature,
    Page,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomFormat {
    Html,
    Json,
}

#[derive(Parser, Debug)]
#[command(name="testgen", version, about="LLM test-artifact generator over captured DOM fragments")]
pub struct Args {
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Overrides the provider persisted in settings.
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Overrides the model persisted in settings.
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, value_enum, default_value_t = LanguageBinding::Java)]
    pub language: LanguageBinding,

    #[arg(long, value_enum, default_value_t = BrowserEngine::Selenium)]
    pub engine: BrowserEngine,

    /// Repeatable: --mode feature --mode page. Empty defaults to page-object only.
    #[arg(long = "mode", value_enum)]
    pub modes: Vec<GenerationMode>,

    /// Run the test-data channel instead of code generation.
    #[arg(long, default_value_t = false)]
    pub test_data: bool,

    /// Records per category for test-data generation.
    #[arg(long, default_value_t = 0)]
    pub records: u32,

    /// Captured DOM fragment; reads stdin when omitted.
    #[arg(long)]
    pub dom_file: Option<String>,

    #[arg(long, value_enum, default_value_t = DomFormat::Html)]
    pub dom_format: DomFormat,

    #[arg(long, default_value = "unknown")]
    pub page_url: String,

    /// Free-text instruction appended to every built prompt.
    #[arg(long)]
    pub instruction: Option<String>,

    #[arg(long, default_value_t = 2400)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = true)]
    pub save_request: bool,

    #[arg(long, default_value_t = true)]
    pub save_response: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Settings file path; defaults to <root>/.testgen/settings.toml.
    #[arg(long)]
    pub config: Option<String>,
}
