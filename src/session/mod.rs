use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::wire::{Role, Turn, TurnMetadata};

/// Append-only transcript of one conversation channel. The only way a turn
/// leaves the transcript is a full reset, which reseeds the initial system
/// turn.
#[derive(Clone)]
pub struct Transcript {
    initial_system: String,
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl Transcript {
    pub fn new(initial_system: impl Into<String>) -> Self {
        let t = Self { initial_system: initial_system.into(), turns: Arc::new(RwLock::new(Vec::new())) };
        t.seed();
        t
    }

    fn seed(&self) {
        let mut turns = self.turns.write();
        turns.clear();
        turns.push(Turn {
            role: Role::System,
            content: self.initial_system.clone(),
            metadata: None,
            at: Utc::now(),
        });
    }

    /// Append a turn. Empty content is a no-op; metadata sticks to assistant
    /// turns only.
    pub fn append(&self, role: Role, content: &str, metadata: Option<TurnMetadata>) {
        if content.trim().is_empty() {
            return;
        }
        let metadata = match role {
            Role::Assistant => metadata,
            _ => None,
        };
        self.turns.write().push(Turn {
            role,
            content: content.to_string(),
            metadata,
            at: Utc::now(),
        });
    }

    pub fn reset(&self) {
        self.seed();
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.turns.read().clone()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn last(&self) -> Option<Turn> {
        self.turns.read().last().cloned()
    }
}
