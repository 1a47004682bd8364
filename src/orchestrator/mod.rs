use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::capture::{self, CaptureSlot, SelectionPort};
use crate::cli::{BrowserEngine, GenerationMode, LanguageBinding};
use crate::config::SettingsStore;
use crate::errors::GenError;
use crate::prompt::{self, PromptKey, PromptVars};
use crate::provider::ProviderSource;
use crate::selector;
use crate::session::Transcript;
use crate::wire::{AggregateResult, ChannelKind, GenerationRequest, Role, TurnMetadata, Tx};

/// Request lifecycle. One request moves Idle → Capturing → Dispatching →
/// Aggregating → Published (or AwaitingCredential / Failed), then back to
/// Idle when the trigger guard drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
    AwaitingCredential,
    Dispatching,
    Aggregating,
    Published,
    Failed,
}

/// Per-request inputs from the trigger surface.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub language: LanguageBinding,
    pub engine: BrowserEngine,
    pub modes: Vec<GenerationMode>,
    pub record_count: Option<u32>,
    pub user_instruction: String,
    pub page_url: String,
}

/// What a published request leaves behind, for rendering and artifact
/// persistence.
#[derive(Debug, Clone)]
pub struct Published {
    pub request: GenerationRequest,
    pub keys: Vec<PromptKey>,
    pub aggregate: AggregateResult,
}

/// Drives one conversation channel: consume the capture, resolve prompt
/// keys, dispatch sequentially, aggregate, publish or fail. Instantiated
/// once per channel; the two instances share nothing but the settings store.
pub struct Orchestrator {
    channel: ChannelKind,
    transcript: Transcript,
    capture: CaptureSlot,
    settings: SettingsStore,
    providers: Arc<dyn ProviderSource>,
    selection_port: Arc<dyn SelectionPort>,
    busy: Arc<AtomicBool>,
    phase: Arc<RwLock<Phase>>,
    artifact: Arc<RwLock<Option<String>>>,
    reset_epoch: Arc<AtomicU64>,
    debug: bool,
}

/// Re-enables the trigger on every exit path, success or failure.
struct TriggerGuard {
    busy: Arc<AtomicBool>,
    phase: Arc<RwLock<Phase>>,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        *self.phase.write() = Phase::Idle;
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    pub fn new(
        channel: ChannelKind,
        settings: SettingsStore,
        providers: Arc<dyn ProviderSource>,
        selection_port: Arc<dyn SelectionPort>,
        debug: bool,
    ) -> Self {
        let greeting = match channel {
            ChannelKind::CodeGen => "Ready to generate test automation code. Inspect a DOM fragment to begin.",
            ChannelKind::TestData => "Ready to generate test data. Inspect a DOM fragment to begin.",
        };
        Self {
            channel,
            transcript: Transcript::new(greeting),
            capture: CaptureSlot::default(),
            settings,
            providers,
            selection_port,
            busy: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(RwLock::new(Phase::Idle)),
            artifact: Arc::new(RwLock::new(None)),
            reset_epoch: Arc::new(AtomicU64::new(0)),
            debug,
        }
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn capture(&self) -> &CaptureSlot {
        &self.capture
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    /// The last published aggregate, until the next request overwrites it or
    /// a reset clears it.
    pub fn artifact(&self) -> Option<String> {
        self.artifact.read().clone()
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.write() = phase;
    }

    fn try_begin(&self) -> Option<TriggerGuard> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(TriggerGuard { busy: self.busy.clone(), phase: self.phase.clone() })
    }

    fn cancelled(&self, epoch: u64) -> bool {
        self.reset_epoch.load(Ordering::SeqCst) != epoch
    }

    fn resolve_keys(&self, params: &RequestParams) -> selector::Selection {
        match self.channel {
            ChannelKind::CodeGen => {
                selector::select_keys(params.language, params.engine, &params.modes)
            }
            ChannelKind::TestData => selector::Selection {
                keys: selector::select_test_data_keys(params.record_count.unwrap_or(0)),
                diagnostics: Vec::new(),
            },
        }
    }

    /// Run one generation request end to end. Precondition failures and call
    /// failures land in the transcript; `None` means nothing was published.
    /// A second request while one is in flight is refused, not queued.
    pub async fn generate(&self, params: RequestParams) -> anyhow::Result<Option<Published>> {
        let Some(_guard) = self.try_begin() else {
            if self.debug {
                eprintln!(
                    "debug/orchestrator[{}]: request refused, another is in flight",
                    self.channel.label()
                );
            }
            return Ok(None);
        };
        let epoch = self.reset_epoch.load(Ordering::SeqCst);
        let settings = self.settings.snapshot();

        // Credential precheck: short-circuits before the capture is touched
        // and before any network activity.
        let provider = match self.providers.acquire(&settings) {
            Ok(p) => p,
            Err(err) => {
                let phase = match err {
                    GenError::MissingCredential(_) => Phase::AwaitingCredential,
                    _ => Phase::Failed,
                };
                self.set_phase(phase);
                self.transcript.append(Role::System, &err.to_string(), None);
                return Ok(None);
            }
        };

        self.set_phase(Phase::Capturing);
        let Some(captured) = self.capture.get() else {
            self.set_phase(Phase::Failed);
            self.transcript
                .append(Role::System, &GenError::NoContentSelected.to_string(), None);
            return Ok(None);
        };

        self.transcript.append(Role::User, &params.user_instruction, None);

        let normalized = capture::normalize(captured);
        let dom_snippet = normalized.as_snippet();

        let selection = self.resolve_keys(&params);
        for diagnostic in &selection.diagnostics {
            self.transcript.append(Role::System, diagnostic, None);
        }

        let request = GenerationRequest {
            tx: Tx::new(),
            channel: self.channel,
            language_binding: params.language,
            browser_engine: params.engine,
            generation_modes: params.modes.clone(),
            record_count: params.record_count,
            user_instruction: params.user_instruction.clone(),
            dom_snippet: dom_snippet.clone(),
            page_url: params.page_url.clone(),
        };

        let vars = PromptVars {
            dom_content: dom_snippet,
            page_url: params.page_url.clone(),
            user_action: String::new(),
            record_count: params.record_count,
        };

        // Strictly sequential: call N+1 only starts after call N has been
        // absorbed. A reset between stages abandons the rest.
        self.set_phase(Phase::Dispatching);
        let mut aggregate = AggregateResult::default();
        for key in &selection.keys {
            if self.cancelled(epoch) {
                if self.debug {
                    eprintln!(
                        "debug/orchestrator[{}]: reset during dispatch, {} call(s) abandoned",
                        self.channel.label(),
                        selection.keys.len() as u32 - aggregate.calls
                    );
                }
                return Ok(None);
            }

            let built = match prompt::render(*key, &vars) {
                Ok(p) => p,
                Err(err) => {
                    self.set_phase(Phase::Failed);
                    self.transcript.append(Role::System, &format!("Error: {err}"), None);
                    return Ok(None);
                }
            };
            let final_prompt =
                format!("{built} Additional Instructions: {}", params.user_instruction);

            match provider.send(&final_prompt, &settings.selected_model, self.debug).await {
                Ok(call) => aggregate.absorb(&call),
                Err(err) => {
                    // Partial text is discarded; already-sent calls are not
                    // compensated for.
                    self.set_phase(Phase::Failed);
                    self.transcript.append(Role::System, &format!("Error: {err}"), None);
                    return Ok(None);
                }
            }
        }

        self.set_phase(Phase::Aggregating);
        self.transcript.append(
            Role::Assistant,
            &aggregate.text,
            Some(TurnMetadata {
                input_tokens: aggregate.input_tokens,
                output_tokens: aggregate.output_tokens,
            }),
        );

        if !aggregate.is_empty() && aggregate.total_tokens() > settings.token_warning_threshold {
            self.transcript.append(
                Role::System,
                &format!(
                    "Token usage {} exceeded the warning threshold of {}.",
                    aggregate.total_tokens(),
                    settings.token_warning_threshold
                ),
                None,
            );
        }

        self.set_phase(Phase::Published);
        if !aggregate.is_empty() {
            *self.artifact.write() = Some(aggregate.text.clone());
        }
        self.capture.clear();
        capture::clear_selection_best_effort(self.selection_port.as_ref(), self.debug).await;

        Ok(Some(Published { request, keys: selection.keys, aggregate }))
    }

    /// Full reset: reseed the transcript, drop any pending capture and the
    /// held artifact, abandon remaining stages of an in-flight request. An
    /// already-issued provider call is not interrupted.
    pub async fn reset(&self) {
        self.reset_epoch.fetch_add(1, Ordering::SeqCst);
        self.transcript.reset();
        self.capture.clear();
        *self.artifact.write() = None;
        capture::clear_selection_best_effort(self.selection_port.as_ref(), self.debug).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedContent;
    use crate::config::Settings;
    use crate::provider::{DynProvider, Provider};
    use crate::wire::CallResult;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct ScriptedProvider {
        prompts: Arc<Mutex<Vec<String>>>,
        script: Arc<Mutex<VecDeque<Result<CallResult, String>>>>,
        delay_ms: u64,
    }

    impl ScriptedProvider {
        fn push_ok(&self, text: &str, input: u64, output: u64) {
            self.script.lock().push_back(Ok(CallResult {
                text: text.into(),
                input_tokens: input,
                output_tokens: output,
            }));
        }

        fn push_err(&self, msg: &str) {
            self.script.lock().push_back(Err(msg.into()));
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn send(&self, prompt: &str, _model: &str, _debug: bool) -> anyhow::Result<CallResult> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.prompts.lock().push(prompt.to_string());
            match self.script.lock().pop_front() {
                Some(Ok(call)) => Ok(call),
                Some(Err(msg)) => Err(anyhow!(msg)),
                None => Ok(CallResult { text: "stub".into(), input_tokens: 1, output_tokens: 1 }),
            }
        }
    }

    struct ScriptedSource(ScriptedProvider);

    impl ProviderSource for ScriptedSource {
        fn acquire(&self, _settings: &Settings) -> Result<DynProvider, GenError> {
            Ok(Box::new(self.0.clone()))
        }
    }

    struct NoCredentialSource;

    impl ProviderSource for NoCredentialSource {
        fn acquire(&self, _settings: &Settings) -> Result<DynProvider, GenError> {
            Err(GenError::MissingCredential("openai".into()))
        }
    }

    #[derive(Default)]
    struct RecordingPort {
        clears: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SelectionPort for RecordingPort {
        async fn clear_selection(&self) -> anyhow::Result<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("no receiving end"))
            } else {
                Ok(())
            }
        }
    }

    fn orchestrator_with(
        channel: ChannelKind,
        provider: ScriptedProvider,
        port: Arc<RecordingPort>,
    ) -> Orchestrator {
        Orchestrator::new(
            channel,
            SettingsStore::new(Settings::default()),
            Arc::new(ScriptedSource(provider)),
            port,
            false,
        )
    }

    fn java_selenium_params() -> RequestParams {
        RequestParams {
            language: LanguageBinding::Java,
            engine: BrowserEngine::Selenium,
            modes: vec![GenerationMode::Page],
            record_count: None,
            user_instruction: "keep method names short".into(),
            page_url: "https://example.test/login".into(),
        }
    }

    #[tokio::test]
    async fn request_without_capture_makes_no_calls() {
        let provider = ScriptedProvider::default();
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default());

        let published = orch.generate(java_selenium_params()).await.unwrap();

        assert!(published.is_none());
        assert!(provider.prompts().is_empty());
        let turns = orch.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::System);
        assert!(turns[1].content.contains("select some DOM"));
    }

    #[tokio::test]
    async fn missing_credential_aborts_before_capture_is_consumed() {
        let orch = Orchestrator::new(
            ChannelKind::CodeGen,
            SettingsStore::new(Settings::default()),
            Arc::new(NoCredentialSource),
            Arc::new(RecordingPort::default()),
            false,
        );
        orch.capture().set(CapturedContent::Html("<input id=\"q\"/>".into()));

        let published = orch.generate(java_selenium_params()).await.unwrap();

        assert!(published.is_none());
        assert!(orch.capture().is_set(), "capture must survive a credential failure");
        let last = orch.transcript().last().unwrap();
        assert!(last.content.contains("openai API key"));
    }

    #[tokio::test]
    async fn published_request_aggregates_and_clears_state() {
        let provider = ScriptedProvider::default();
        provider.push_ok("  public class LoginPage {}  ", 10, 5);
        let port = Arc::new(RecordingPort::default());
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), port.clone());
        orch.capture().set(CapturedContent::Html("<form id=\"login\"/>".into()));

        let published = orch.generate(java_selenium_params()).await.unwrap().unwrap();

        assert_eq!(published.keys, vec![PromptKey::SeleniumJavaPageOnly]);
        assert_eq!(published.aggregate.text, "public class LoginPage {}");
        assert_eq!(published.aggregate.input_tokens, 10);
        assert_eq!(published.aggregate.output_tokens, 5);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("<form id=\"login\"/>"));
        assert!(prompts[0].contains("Additional Instructions: keep method names short"));

        // Published: assistant turn with metadata, capture gone, highlight
        // clear requested, artifact retained, trigger re-armed.
        let turns = orch.transcript().turns();
        let assistant = turns.iter().find(|t| t.role == Role::Assistant).unwrap();
        let meta = assistant.metadata.unwrap();
        assert_eq!(meta.input_tokens, 10);
        assert_eq!(meta.output_tokens, 5);
        assert!(!orch.capture().is_set());
        assert_eq!(port.clears.load(Ordering::SeqCst), 1);
        assert_eq!(orch.artifact().unwrap(), "public class LoginPage {}");
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn provider_failure_discards_partial_output_and_keeps_capture() {
        let provider = ScriptedProvider::default();
        provider.push_err("OpenAI API error (500): upstream exploded");
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        let published = orch.generate(java_selenium_params()).await.unwrap();

        assert!(published.is_none());
        assert!(orch.artifact().is_none());
        assert!(orch.capture().is_set(), "failed request leaves the capture for a retry");
        let last = orch.transcript().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("Error: OpenAI API error (500): upstream exploded"));
        assert!(orch.transcript().turns().iter().all(|t| t.role != Role::Assistant));

        // The trigger was re-enabled by the cleanup guard; a retry works.
        provider.push_ok("recovered", 1, 1);
        let retried = orch.generate(java_selenium_params()).await.unwrap();
        assert!(retried.is_some());
    }

    #[tokio::test]
    async fn unsupported_pair_publishes_nothing_and_emits_one_diagnostic() {
        let provider = ScriptedProvider::default();
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        let mut params = java_selenium_params();
        params.language = LanguageBinding::Python;
        let published = orch.generate(params).await.unwrap().unwrap();

        assert!(published.keys.is_empty());
        assert!(provider.prompts().is_empty());
        let diagnostics: Vec<_> = orch
            .transcript()
            .turns()
            .into_iter()
            .filter(|t| t.content.contains("not yet supported"))
            .collect();
        assert_eq!(diagnostics.len(), 1);
        assert!(orch.transcript().turns().iter().all(|t| t.role != Role::Assistant));
    }

    #[tokio::test]
    async fn both_modes_on_unsupported_pair_degrade_to_feature_only() {
        let provider = ScriptedProvider::default();
        provider.push_ok("Feature: Login", 4, 2);
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        let mut params = java_selenium_params();
        params.language = LanguageBinding::CSharp;
        params.modes = vec![GenerationMode::Feature, GenerationMode::Page];
        let published = orch.generate(params).await.unwrap().unwrap();

        assert_eq!(published.keys, vec![PromptKey::CucumberOnly]);
        assert_eq!(published.aggregate.text, "Feature: Login");
        let turns = orch.transcript().turns();
        assert!(turns.iter().any(|t| t.content.contains("not yet supported")));
        assert!(turns.iter().any(|t| t.role == Role::Assistant));
    }

    #[tokio::test]
    async fn test_data_channel_renders_record_count() {
        let provider = ScriptedProvider::default();
        provider.push_ok("{\"positive\":[]}", 3, 2);
        let orch = orchestrator_with(ChannelKind::TestData, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html("<input name=\"phone\"/>".into()));

        let mut params = java_selenium_params();
        params.record_count = Some(5);
        let published = orch.generate(params).await.unwrap().unwrap();

        assert_eq!(published.keys, vec![PromptKey::TestdataJsonMultiple]);
        let prompts = provider.prompts();
        assert!(prompts[0].contains("exactly 5 objects"));
        assert!(prompts[0].contains("<input name=\"phone\"/>"));
    }

    #[tokio::test]
    async fn test_data_channel_with_zero_records_makes_no_calls() {
        let provider = ScriptedProvider::default();
        let orch = orchestrator_with(ChannelKind::TestData, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html("<input/>".into()));

        let mut params = java_selenium_params();
        params.record_count = Some(0);
        let published = orch.generate(params).await.unwrap().unwrap();

        assert!(published.keys.is_empty());
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn select_options_are_truncated_in_the_outgoing_prompt() {
        let provider = ScriptedProvider::default();
        provider.push_ok("ok", 1, 1);
        let orch = orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default());
        orch.capture().set(CapturedContent::Html(
            "<select>\
             <option>one</option><option>two</option><option>three</option>\
             <option>four</option><option>five</option>\
             </select>"
                .into(),
        ));

        orch.generate(java_selenium_params()).await.unwrap().unwrap();

        let prompt = &provider.prompts()[0];
        assert_eq!(prompt.matches("<option").count(), 3);
        assert!(!prompt.contains("four"));
        assert!(!prompt.contains("five"));
    }

    #[tokio::test]
    async fn concurrent_request_is_refused_not_queued() {
        let provider = ScriptedProvider { delay_ms: 50, ..Default::default() };
        provider.push_ok("slow result", 1, 1);
        let orch = Arc::new(orchestrator_with(ChannelKind::CodeGen, provider.clone(), Arc::default()));
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.generate(java_selenium_params()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = orch.generate(java_selenium_params()).await.unwrap();

        assert!(second.is_none(), "in-flight request must disable the trigger");
        let first = first.await.unwrap().unwrap();
        assert!(first.is_some());
        assert_eq!(provider.prompts().len(), 1);
    }

    #[tokio::test]
    async fn token_threshold_warning_is_appended() {
        let provider = ScriptedProvider::default();
        provider.push_ok("big artifact", 9_000, 2_000);
        let store = SettingsStore::new(Settings::default());
        let orch = Orchestrator::new(
            ChannelKind::CodeGen,
            store,
            Arc::new(ScriptedSource(provider)),
            Arc::new(RecordingPort::default()),
            false,
        );
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        orch.generate(java_selenium_params()).await.unwrap().unwrap();

        let last = orch.transcript().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.content.contains("11000 exceeded the warning threshold of 10000"));
    }

    #[tokio::test]
    async fn reset_clears_everything_and_is_idempotent() {
        let provider = ScriptedProvider::default();
        provider.push_ok("artifact", 1, 1);
        let orch = orchestrator_with(ChannelKind::CodeGen, provider, Arc::default());
        orch.capture().set(CapturedContent::Html("<form/>".into()));
        orch.generate(java_selenium_params()).await.unwrap().unwrap();
        assert!(orch.artifact().is_some());

        orch.reset().await;
        orch.reset().await;

        assert_eq!(orch.transcript().len(), 1);
        assert!(orch.artifact().is_none());
        assert!(!orch.capture().is_set());
    }

    #[tokio::test]
    async fn failing_selection_port_does_not_fail_the_request() {
        let provider = ScriptedProvider::default();
        provider.push_ok("ok", 1, 1);
        let port = Arc::new(RecordingPort { fail: true, ..Default::default() });
        let orch = orchestrator_with(ChannelKind::CodeGen, provider, port.clone());
        orch.capture().set(CapturedContent::Html("<form/>".into()));

        let published = orch.generate(java_selenium_params()).await.unwrap();

        assert!(published.is_some());
        // Primary send plus one fallback retry, then the failure is dropped.
        assert_eq!(port.clears.load(Ordering::SeqCst), 2);
    }
}
