use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::{Captures, Regex};
use serde_json::Value;
use tokio::sync::mpsc;

/// A user-selected DOM fragment delivered by the inspection collaborator.
/// Raw markup and structured node trees go through the same normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedContent {
    Html(String),
    Node(Value),
}

impl CapturedContent {
    /// Serialized form used as the `domContent` prompt variable.
    pub fn as_snippet(&self) -> String {
        match self {
            CapturedContent::Html(s) => s.clone(),
            CapturedContent::Node(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
        }
    }
}

const MAX_OPTIONS: usize = 3;

/// Retain only the first 3 `<option>` children of every `<select>` to keep
/// dropdown enumerations compact in the generated artifact. Runs for every
/// request, on both channels, before prompt building.
pub fn normalize(content: CapturedContent) -> CapturedContent {
    match content {
        CapturedContent::Html(s) => CapturedContent::Html(truncate_selects_html(&s)),
        CapturedContent::Node(mut v) => {
            truncate_selects_node(&mut v);
            CapturedContent::Node(v)
        }
    }
}

fn truncate_selects_html(html: &str) -> String {
    let select_re = Regex::new(r"(?is)<select\b[^>]*>.*?</select>").expect("select pattern");
    select_re
        .replace_all(html, |caps: &Captures| truncate_options(&caps[0]))
        .into_owned()
}

fn truncate_options(select_html: &str) -> String {
    let option_re = Regex::new(r"(?is)<option\b[^>]*>.*?</option>\s*").expect("option pattern");
    let mut seen = 0usize;
    option_re
        .replace_all(select_html, |caps: &Captures| {
            seen += 1;
            if seen <= MAX_OPTIONS { caps[0].to_string() } else { String::new() }
        })
        .into_owned()
}

fn truncate_selects_node(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let is_select = map
                .get("tag")
                .and_then(Value::as_str)
                .map(|t| t.eq_ignore_ascii_case("select"))
                .unwrap_or(false);
            if is_select {
                if let Some(Value::Array(children)) = map.get_mut("children") {
                    let mut seen = 0usize;
                    children.retain(|child| {
                        let is_option = child
                            .get("tag")
                            .and_then(Value::as_str)
                            .map(|t| t.eq_ignore_ascii_case("option"))
                            .unwrap_or(false);
                        if is_option {
                            seen += 1;
                            seen <= MAX_OPTIONS
                        } else {
                            true
                        }
                    });
                }
            }
            for (_, child) in map.iter_mut() {
                truncate_selects_node(child);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                truncate_selects_node(item);
            }
        }
        _ => {}
    }
}

/// Holds at most one pending capture per channel. The inspection side writes,
/// the orchestrator consumes; `take` leaves the slot empty until the next
/// inspection cycle.
#[derive(Clone, Default)]
pub struct CaptureSlot {
    inner: Arc<Mutex<Option<CapturedContent>>>,
}

impl CaptureSlot {
    pub fn set(&self, content: CapturedContent) {
        *self.inner.lock() = Some(content);
    }

    pub fn take(&self) -> Option<CapturedContent> {
        self.inner.lock().take()
    }

    /// Read without consuming. The orchestrator only clears the slot once a
    /// request publishes, so a failed request can be retried against the
    /// same capture.
    pub fn get(&self) -> Option<CapturedContent> {
        self.inner.lock().clone()
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Subscribe the slot to a push-style capture feed. Each delivered
    /// capture replaces any pending one.
    pub fn attach(&self, mut rx: mpsc::Receiver<CapturedContent>) -> tokio::task::JoinHandle<()> {
        let slot = self.clone();
        tokio::spawn(async move {
            while let Some(content) = rx.recv().await {
                slot.set(content);
            }
        })
    }
}

/// Outbound command channel used to ask the page side to drop its selection
/// highlight after a published result or a reset.
#[async_trait]
pub trait SelectionPort: Send + Sync {
    async fn clear_selection(&self) -> anyhow::Result<()>;
}

/// Best-effort delivery: one fallback retry, then the failure is dropped.
pub async fn clear_selection_best_effort(port: &dyn SelectionPort, debug: bool) {
    if let Err(first) = port.clear_selection().await {
        if let Err(second) = port.clear_selection().await {
            if debug {
                eprintln!("debug/capture: clear-selection not delivered: {first}; retry: {second}");
            }
        }
    }
}

/// No page side to notify when running from a terminal.
pub struct NoopSelectionPort;

#[async_trait]
impl SelectionPort for NoopSelectionPort {
    async fn clear_selection(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
