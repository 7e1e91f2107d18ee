//! Tree lifecycle audit hooks.
//!
//! Each structural change to a [`CompositionTree`](crate::CompositionTree)
//! produces a [`TreeAuditEvent`] so an editor can keep an undo journal or a
//! debug timeline without wrapping every tree call.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Lifecycle checkpoints emitted by the composition tree and renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAuditStage {
    /// A tree was created around a fresh root node.
    TreeCreated,
    /// A tree was rebuilt from a serialized document.
    TreeLoaded,
    /// A detached node was created.
    NodeCreated,
    /// A node was attached to a zone.
    ChildInserted,
    /// A node was detached from a zone.
    ChildRemoved,
    /// A node changed position inside its zone.
    ChildMoved,
    /// Props of an existing node were re-resolved.
    PropsUpdated,
    /// A detached subtree was dropped from the arena.
    NodeDiscarded,
    /// A full render pass finished.
    RenderCompleted,
}

#[derive(Debug, Clone)]
pub struct TreeAuditEvent {
    pub timestamp: SystemTime,
    pub stage: TreeAuditStage,
    pub details: Vec<(String, Value)>,
}

impl TreeAuditEvent {
    fn new(stage: TreeAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct TreeAuditEventBuilder {
    event: TreeAuditEvent,
}

impl TreeAuditEventBuilder {
    pub fn new(stage: TreeAuditStage) -> Self {
        Self {
            event: TreeAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> TreeAuditEvent {
        self.event
    }
}

pub trait TreeAudit: Send + Sync {
    fn record(&self, event: TreeAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullTreeAudit;

impl TreeAudit for NullTreeAudit {
    fn record(&self, _event: TreeAuditEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct BufferedTreeAudit {
    events: Mutex<Vec<TreeAuditEvent>>,
}

impl BufferedTreeAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TreeAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<TreeAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }
}

impl TreeAudit for BufferedTreeAudit {
    fn record(&self, event: TreeAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
