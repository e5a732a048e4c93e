//! Reassembles per-index tool-call fragments into complete invocations.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, RillError};
use crate::types::wire::ToolCallFragment;
use crate::types::ToolCallPart;

/// Accumulated state for one stream index.
#[derive(Debug, Default)]
struct ToolCallBuffer {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallBuffer {
    fn apply(&mut self, fragment: &ToolCallFragment) {
        if let Some(id) = fragment.id.as_deref().filter(|id| !id.is_empty()) {
            self.id = Some(id.to_string());
        }
        if let Some(name) = fragment.name().filter(|name| !name.is_empty()) {
            self.name = Some(name.to_string());
        }
        if let Some(arguments) = fragment.arguments_text() {
            self.arguments.push_str(&arguments);
        }
    }

    /// Arguments, once they form a complete JSON object.
    fn ready_arguments(&self) -> Option<Value> {
        if self.name.is_none() || !self.arguments.trim_end().ends_with('}') {
            return None;
        }
        parse_object(&self.arguments)
    }

    /// Arguments at a terminal flush, where an empty string means no arguments.
    fn final_arguments(&self) -> Option<Value> {
        if self.arguments.trim().is_empty() {
            return Some(Value::Object(Default::default()));
        }
        parse_object(&self.arguments)
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Per-index latch: once completed, an index never accepts fragments again.
#[derive(Debug)]
enum ToolCallSlot {
    Accumulating(ToolCallBuffer),
    Completed,
}

/// Tool-call buffers for one response, keyed by stream index.
#[derive(Debug, Default)]
pub struct ToolCallReconstructor {
    slots: BTreeMap<u32, ToolCallSlot>,
    emitted: HashSet<String>,
}

impl ToolCallReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fragment; returns the call if it just became complete.
    ///
    /// Fragments for a completed index are discarded.
    pub fn push(&mut self, fragment: &ToolCallFragment) -> Option<ToolCallPart> {
        let index = fragment.index;
        let slot = self
            .slots
            .entry(index)
            .or_insert_with(|| ToolCallSlot::Accumulating(ToolCallBuffer::default()));

        let ToolCallSlot::Accumulating(buffer) = &mut *slot else {
            debug!(index, "Discarding fragment for completed tool call");
            return None;
        };

        buffer.apply(fragment);
        let arguments = buffer.ready_arguments()?;
        let ToolCallSlot::Accumulating(buffer) = std::mem::replace(slot, ToolCallSlot::Completed)
        else {
            return None;
        };
        let name = buffer.name.unwrap_or_default();

        debug!(index, name = %name, "Tool call complete before finish signal");
        Some(self.complete(buffer.id, name, arguments))
    }

    /// Complete every buffered call.
    ///
    /// With `strict`, a buffer that cannot be completed is an error; otherwise
    /// it is dropped with a warning.
    pub fn flush(&mut self, strict: bool) -> Result<Vec<ToolCallPart>> {
        let pending: Vec<(u32, ToolCallBuffer)> = self
            .slots
            .iter_mut()
            .filter_map(|(index, slot)| {
                match std::mem::replace(slot, ToolCallSlot::Completed) {
                    ToolCallSlot::Accumulating(buffer) => Some((*index, buffer)),
                    ToolCallSlot::Completed => None,
                }
            })
            .collect();

        let mut parts = Vec::with_capacity(pending.len());
        for (index, buffer) in pending {
            match (buffer.final_arguments(), buffer.name.clone()) {
                (Some(arguments), Some(name)) => {
                    parts.push(self.complete(buffer.id, name, arguments));
                }
                _ if strict => {
                    return Err(RillError::IncompleteToolCall {
                        index,
                        name: buffer.name.unwrap_or_default(),
                        arguments: buffer.arguments,
                    });
                }
                _ => {
                    warn!(
                        index,
                        name = buffer.name.as_deref().unwrap_or(""),
                        "Dropping incomplete tool call at end of stream"
                    );
                }
            }
        }
        Ok(parts)
    }

    pub fn is_completed(&self, index: u32) -> bool {
        matches!(self.slots.get(&index), Some(ToolCallSlot::Completed))
    }

    /// Whether any index is still accumulating.
    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.slots
            .values()
            .any(|slot| matches!(slot, ToolCallSlot::Accumulating(_)))
    }

    /// Whether a call with this identity key has already been emitted.
    #[cfg(test)]
    pub fn was_emitted(&self, key: &str) -> bool {
        self.emitted.contains(key)
    }

    /// Record an identity key; returns `false` if it was already present.
    pub fn record_emitted(&mut self, key: String) -> bool {
        self.emitted.insert(key)
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.emitted.clear();
    }

    fn complete(&mut self, id: Option<String>, name: String, arguments: Value) -> ToolCallPart {
        self.emitted.insert(identity_key(&name, &arguments));
        ToolCallPart {
            id: id.unwrap_or_else(generate_call_id),
            name,
            arguments,
        }
    }
}

/// Identity of a logical call: name plus canonical (key-sorted) arguments.
pub fn identity_key(name: &str, arguments: &Value) -> String {
    let mut key = format!("{name}:");
    write_canonical(arguments, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Fallback id for calls that arrive without one.
pub fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}
