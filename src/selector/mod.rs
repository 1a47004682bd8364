use crate::cli::{BrowserEngine, GenerationMode, LanguageBinding};
use crate::prompt::PromptKey;

/// Outcome of prompt-key resolution: the ordered key list to dispatch, plus
/// any unsupported-combination notices. A diagnostic does not always abort
/// the request; with both modes selected the request proceeds feature-only.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub keys: Vec<PromptKey>,
    pub diagnostics: Vec<String>,
}

impl Selection {
    fn keys(keys: Vec<PromptKey>) -> Self {
        Self { keys, diagnostics: Vec::new() }
    }

    fn unsupported(mut self, language: LanguageBinding, engine: BrowserEngine) -> Self {
        self.diagnostics.push(
            crate::errors::GenError::UnsupportedCombination {
                language: language.label().to_string(),
                engine: engine.label().to_string(),
            }
            .to_string(),
        );
        self
    }
}

fn is_java_selenium(language: LanguageBinding, engine: BrowserEngine) -> bool {
    language == LanguageBinding::Java && engine == BrowserEngine::Selenium
}

fn is_typescript_playwright(language: LanguageBinding, engine: BrowserEngine) -> bool {
    language == LanguageBinding::TypeScript && engine == BrowserEngine::Playwright
}

// typescript/selenium not supported by the selenium webdriver

/// Support matrix for page-object generation. Extending to a new
/// (language, engine) pair means adding a predicate arm here, one in
/// `combined_key`, and the catalog templates they point at.
fn page_object_key(language: LanguageBinding, engine: BrowserEngine) -> Option<PromptKey> {
    if is_typescript_playwright(language, engine) {
        Some(PromptKey::PlaywrightTypescriptPageOnly)
    } else if is_java_selenium(language, engine) {
        Some(PromptKey::SeleniumJavaPageOnly)
    } else {
        None
    }
}

fn combined_key(language: LanguageBinding, engine: BrowserEngine) -> Option<PromptKey> {
    if is_typescript_playwright(language, engine) {
        Some(PromptKey::CucumberWithPlaywrightTsSteps)
    } else if is_java_selenium(language, engine) {
        Some(PromptKey::CucumberWithSeleniumJavaSteps)
    } else {
        None
    }
}

/// Map a (language, engine, modes) tuple to the ordered prompt-key list.
/// Rules are checked in order, first match wins.
pub fn select_keys(
    language: LanguageBinding,
    engine: BrowserEngine,
    modes: &[GenerationMode],
) -> Selection {
    let feature = modes.contains(&GenerationMode::Feature);
    let page = modes.contains(&GenerationMode::Page);

    // No mode selected: default to page-object generation.
    if !feature && !page {
        return match page_object_key(language, engine) {
            Some(key) => Selection::keys(vec![key]),
            None => Selection::default().unsupported(language, engine),
        };
    }

    if feature && page {
        return match combined_key(language, engine) {
            Some(key) => Selection::keys(vec![key]),
            // Degraded: feature-only even though page-object was requested.
            None => Selection::keys(vec![PromptKey::CucumberOnly]).unsupported(language, engine),
        };
    }

    if feature {
        return Selection::keys(vec![PromptKey::CucumberOnly]);
    }

    match page_object_key(language, engine) {
        Some(key) => Selection::keys(vec![key]),
        None => Selection::default().unsupported(language, engine),
    }
}

/// The test-data flow requests exactly one template, independent of
/// language/engine.
pub fn select_test_data_keys(record_count: u32) -> Vec<PromptKey> {
    let mut keys = Vec::new();
    if record_count > 0 {
        keys.push(PromptKey::TestdataJsonMultiple);
    }
    keys
}
