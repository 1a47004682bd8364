use thiserror::Error;

/// Request-lifecycle failures the orchestrator converts into transcript turns.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Please set your {0} API key in the Settings tab.")] MissingCredential(String),
    #[error("Please select some DOM on the page first.")] NoContentSelected,
    #[error("Prompt not found: {0}")] TemplateNotFound(String),
    #[error("\u{26a0}\u{fe0f} {language}/{engine} combination is not yet supported. Only Java/Selenium and TypeScript/Playwright are currently available.")]
    UnsupportedCombination { language: String, engine: String },
    #[error("provider error: {0}")] Provider(String),
}
