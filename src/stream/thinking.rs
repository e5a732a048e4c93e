//! Thinking session lifecycle.
//!
//! At most one session is open at a time. Every session opened is closed
//! exactly once by an empty terminator part carrying its id, and ids are
//! never reused.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::types::ThinkingPart;

#[derive(Debug, Default)]
pub struct ThinkingTracker {
    active: Option<String>,
}

impl ThinkingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Emit reasoning text into the current session, opening one if needed.
    pub fn emit(&mut self, text: impl Into<String>, metadata: Option<Value>) -> ThinkingPart {
        let id = match &self.active {
            Some(id) => id.clone(),
            None => self.open(),
        };
        ThinkingPart {
            text: text.into(),
            id,
            metadata,
        }
    }

    /// Start a fresh session, closing any open one first.
    ///
    /// Returns the terminator for the session that was closed, if any.
    pub fn restart(&mut self) -> Option<ThinkingPart> {
        let closed = self.close();
        self.open();
        closed
    }

    /// Close the open session; returns its terminator.
    pub fn close(&mut self) -> Option<ThinkingPart> {
        let id = self.active.take()?;
        debug!(session = %id, "Thinking session closed");
        Some(ThinkingPart::terminator(id))
    }

    fn open(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        debug!(session = %id, "Thinking session opened");
        self.active = Some(id.clone());
        id
    }
}
