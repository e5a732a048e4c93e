//! Tool calls written into plain text as `<tool_call>{…}</tool_call>` blocks.
//!
//! Some servers (and prompt-injected function calling) put the call in the
//! content stream instead of `tool_calls`. The block body is JSON of the form
//! `{"name": "...", "arguments": {...}}`; `arguments` may also be a JSON string.

use memchr::memmem;
use serde_json::Value;
use tracing::debug;

use super::tool_calls::identity_key;

pub const TOOL_CALL_START: &str = "<tool_call>";
pub const TOOL_CALL_END: &str = "</tool_call>";

/// Output of [`TextToolCallScanner::feed`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    Text(String),
    Call(EmbeddedToolCall),
}

/// A complete call parsed out of text.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedToolCall {
    pub name: String,
    pub arguments: Value,
    /// Identity used to avoid emitting a call twice.
    pub key: String,
}

/// At most one block is open per response.
#[derive(Debug, Default)]
struct OpenBlock {
    candidate_name: Option<String>,
    buffer: String,
}

impl OpenBlock {
    /// Best-effort name lookup while the body is still streaming.
    fn observe_name(&mut self) {
        if self.candidate_name.is_some() {
            return;
        }
        let Some(at) = self.buffer.find("\"name\"") else {
            return;
        };
        let after = self.buffer[at + 6..].trim_start();
        let Some(value) = after.strip_prefix(':').map(str::trim_start) else {
            return;
        };
        let Some(quoted) = value.strip_prefix('"') else {
            return;
        };
        if let Some(end) = quoted.find('"') {
            self.candidate_name = Some(quoted[..end].to_string());
        }
    }
}

#[derive(Debug, Default)]
pub struct TextToolCallScanner {
    /// Tail that may be the beginning of a start marker.
    held: String,
    open: Option<OpenBlock>,
}

impl TextToolCallScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name seen so far in the open block, if any.
    #[cfg(test)]
    pub fn candidate_name(&self) -> Option<&str> {
        self.open.as_ref()?.candidate_name.as_deref()
    }

    /// Give up on a held partial start marker and return it as text.
    ///
    /// Called when other output is about to be emitted; an open block is
    /// left alone.
    pub fn release_held(&mut self) -> Option<String> {
        if self.open.is_some() || self.held.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.held))
    }

    pub fn feed(&mut self, text: &str) -> Vec<TextSegment> {
        let mut input = std::mem::take(&mut self.held);
        input.push_str(text);

        let mut segments = Vec::new();
        let mut rest = input.as_str();
        while !rest.is_empty() {
            if let Some(block) = self.open.as_mut() {
                let search_from = block.buffer.len().saturating_sub(TOOL_CALL_END.len() - 1);
                block.buffer.push_str(rest);
                rest = "";
                block.observe_name();

                let found = memmem::find(&block.buffer.as_bytes()[search_from..], TOOL_CALL_END.as_bytes())
                    .map(|pos| search_from + pos);
                if let Some(end) = found {
                    let body = block.buffer[..end].to_string();
                    let remainder = block.buffer[end + TOOL_CALL_END.len()..].to_string();
                    self.open = None;
                    segments.push(parse_block(&body));
                    // Re-enter the loop on the text after the block.
                    let mut more = self.feed(&remainder);
                    segments.append(&mut more);
                    return merge_text(segments);
                }
                continue;
            }

            match memmem::find(rest.as_bytes(), TOOL_CALL_START.as_bytes()) {
                Some(pos) => {
                    if pos > 0 {
                        segments.push(TextSegment::Text(rest[..pos].to_string()));
                    }
                    self.open = Some(OpenBlock::default());
                    rest = &rest[pos + TOOL_CALL_START.len()..];
                }
                None => {
                    let keep = partial_marker_len(rest, TOOL_CALL_START);
                    let (emit, hold) = rest.split_at(rest.len() - keep);
                    if !emit.is_empty() {
                        segments.push(TextSegment::Text(emit.to_string()));
                    }
                    self.held = hold.to_string();
                    rest = "";
                }
            }
        }
        merge_text(segments)
    }

    /// Return anything still buffered as plain text.
    pub fn flush(&mut self) -> Vec<TextSegment> {
        let mut text = std::mem::take(&mut self.held);
        if let Some(block) = self.open.take() {
            debug!(name = ?block.candidate_name, "Unterminated text tool call returned as text");
            text = format!("{TOOL_CALL_START}{}{text}", block.buffer);
        }
        if text.is_empty() {
            Vec::new()
        } else {
            vec![TextSegment::Text(text)]
        }
    }

    pub fn reset(&mut self) {
        self.held.clear();
        self.open = None;
    }
}

fn parse_block(body: &str) -> TextSegment {
    match parse_call(body) {
        Some(call) => TextSegment::Call(call),
        None => {
            debug!("Unparseable text tool call returned as text");
            TextSegment::Text(format!("{TOOL_CALL_START}{body}{TOOL_CALL_END}"))
        }
    }
}

fn parse_call(body: &str) -> Option<EmbeddedToolCall> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let name = value.get("name")?.as_str()?.to_string();
    let arguments = match value.get("arguments") {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(Value::String(text)) => serde_json::from_str(text).ok()?,
        Some(other) => other.clone(),
    };
    if !arguments.is_object() {
        return None;
    }
    Some(EmbeddedToolCall {
        key: identity_key(&name, &arguments),
        name,
        arguments,
    })
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|&n| text.len() >= n && text.is_char_boundary(text.len() - n) && text.ends_with(&marker[..n]))
        .unwrap_or(0)
}

fn merge_text(segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let mut merged: Vec<TextSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (merged.last_mut(), segment) {
            (Some(TextSegment::Text(prev)), TextSegment::Text(next)) => prev.push_str(&next),
            (_, segment) => merged.push(segment),
        }
    }
    merged
}
