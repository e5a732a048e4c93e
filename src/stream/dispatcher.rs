//! Routes each parsed delta to the tool-call, thinking and tag handlers.

use serde_json::Value;
use tracing::{debug, warn};

use super::inline_tags::{InlineTagScanner, TagSegment};
use super::text_tool_calls::{TextSegment, TextToolCallScanner};
use super::thinking::ThinkingTracker;
use super::tool_calls::{generate_call_id, ToolCallReconstructor};
use super::StreamOptions;
use crate::error::Result;
use crate::types::wire::{ChatCompletionChunk, ChunkDelta, ReasoningDetail, ToolCallFragment};
use crate::types::{FinishReason, ResponsePart, ToolCallPart};

/// Per-response dispatch state. One instance serves exactly one response.
#[derive(Debug)]
pub struct DeltaDispatcher {
    tool_calls: ToolCallReconstructor,
    thinking: ThinkingTracker,
    tags: InlineTagScanner,
    text_calls: Option<TextToolCallScanner>,
    emitted_text: bool,
    whitespace_hint_sent: bool,
    finish_reason: Option<FinishReason>,
}

impl DeltaDispatcher {
    pub fn new(options: &StreamOptions) -> Self {
        Self {
            tool_calls: ToolCallReconstructor::new(),
            thinking: ThinkingTracker::new(),
            tags: InlineTagScanner::new(&options.inline_tags),
            text_calls: options.text_tool_calls.then(TextToolCallScanner::new),
            emitted_text: false,
            whitespace_hint_sent: false,
            finish_reason: None,
        }
    }

    /// Parse and dispatch one `data:` payload, appending parts to `out`.
    ///
    /// Malformed JSON is logged and dropped. The only error is an explicit
    /// finish signal arriving while a tool call is still invalid; parts pushed
    /// before that point stay in `out`.
    pub fn dispatch(&mut self, payload: &str, out: &mut Vec<ResponsePart>) -> Result<()> {
        match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => self.dispatch_chunk(chunk, out),
            Err(e) => {
                warn!(error = %e, "Dropping malformed stream payload");
                Ok(())
            }
        }
    }

    pub fn dispatch_chunk(
        &mut self,
        chunk: ChatCompletionChunk,
        out: &mut Vec<ResponsePart>,
    ) -> Result<()> {
        let Some(choice) = chunk.into_first_choice() else {
            return Ok(());
        };

        if let Some(delta) = choice.delta {
            self.dispatch_delta(delta, out);
        }

        if let Some(reason) = choice.finish_reason.as_deref() {
            let reason = FinishReason::from_wire(reason);
            debug!(finish_reason = %reason, "Finish signal");
            self.finish_reason = Some(reason);
            if reason.completes_tool_calls() {
                self.release_held_text(out);
                let parts = self.tool_calls.flush(true)?;
                out.extend(parts.into_iter().map(ResponsePart::from));
            }
        }

        Ok(())
    }

    /// End of stream: flush leniently, close any open session and reset.
    pub fn finish(&mut self) -> Vec<ResponsePart> {
        let mut out = Vec::new();

        if let Some(scanner) = self.text_calls.as_mut() {
            let segments = scanner.flush();
            self.apply_text_segments(segments, &mut out);
        }

        if self.tags.in_tag() {
            debug!("Inline reasoning tag still open at end of stream");
        }

        match self.tool_calls.flush(false) {
            Ok(parts) => out.extend(parts.into_iter().map(ResponsePart::from)),
            Err(e) => warn!(error = %e, "Tool call flush failed at end of stream"),
        }

        if let Some(terminator) = self.thinking.close() {
            out.push(terminator.into());
        }

        self.reset();
        out
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn reset(&mut self) {
        self.tool_calls.reset();
        self.thinking = ThinkingTracker::new();
        self.tags.reset();
        if let Some(scanner) = self.text_calls.as_mut() {
            scanner.reset();
        }
        self.emitted_text = false;
        self.whitespace_hint_sent = false;
        self.finish_reason = None;
    }

    fn dispatch_delta(&mut self, mut delta: ChunkDelta, out: &mut Vec<ResponsePart>) {
        match delta.take_reasoning_details() {
            Some(details) => {
                for detail in ReasoningDetail::sorted(details) {
                    let text = detail.text();
                    if !text.is_empty() {
                        self.emit_thinking(text, Some(detail.metadata()), out);
                    }
                }
            }
            None if !delta.reasoning_disabled() => {
                if let Some(field) = delta.bare_thinking() {
                    let (text, metadata) = field.into_parts();
                    if !text.is_empty() {
                        self.emit_thinking(text, metadata, out);
                    }
                }
            }
            None => {}
        }

        if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            self.dispatch_content(content, out);
        }

        if let Some(fragments) = delta.tool_calls.as_deref().filter(|f| !f.is_empty()) {
            self.dispatch_tool_calls(fragments, out);
        }
    }

    fn dispatch_content(&mut self, content: &str, out: &mut Vec<ResponsePart>) {
        let Some(segments) = self.tags.scan(content) else {
            self.emit_plain(content, out);
            return;
        };

        for segment in segments {
            match segment {
                TagSegment::Text(text) => self.emit_plain(&text, out),
                TagSegment::Open => {
                    self.release_held_text(out);
                    if let Some(terminator) = self.thinking.restart() {
                        out.push(terminator.into());
                    }
                }
                TagSegment::Reasoning(text) => self.emit_thinking(text, None, out),
                TagSegment::Close => {
                    if let Some(terminator) = self.thinking.close() {
                        out.push(terminator.into());
                    }
                }
            }
        }
    }

    fn dispatch_tool_calls(&mut self, fragments: &[ToolCallFragment], out: &mut Vec<ResponsePart>) {
        self.release_held_text(out);
        if self.emitted_text && !self.whitespace_hint_sent {
            // Nudges consumers that buffer text to flush before the call.
            out.push(ResponsePart::text(" "));
            self.whitespace_hint_sent = true;
        }

        for fragment in fragments {
            if self.tool_calls.is_completed(fragment.index) {
                debug!(index = fragment.index, "Ignoring fragment for completed tool call");
                continue;
            }
            if let Some(part) = self.tool_calls.push(fragment) {
                out.push(part.into());
            }
        }
    }

    fn emit_thinking(&mut self, text: String, metadata: Option<Value>, out: &mut Vec<ResponsePart>) {
        self.release_held_text(out);
        out.push(self.thinking.emit(text, metadata).into());
    }

    /// Text held back as a possible `<tool_call>` prefix must not trail
    /// output that arrived after it.
    fn release_held_text(&mut self, out: &mut Vec<ResponsePart>) {
        let Some(held) = self.text_calls.as_mut().and_then(TextToolCallScanner::release_held) else {
            return;
        };
        self.emit_text(&held, out);
    }

    fn emit_plain(&mut self, text: &str, out: &mut Vec<ResponsePart>) {
        match self.text_calls.as_mut() {
            Some(scanner) => {
                let segments = scanner.feed(text);
                self.apply_text_segments(segments, out);
            }
            None => self.emit_text(text, out),
        }
    }

    fn apply_text_segments(&mut self, segments: Vec<TextSegment>, out: &mut Vec<ResponsePart>) {
        for segment in segments {
            match segment {
                TextSegment::Text(text) => self.emit_text(&text, out),
                TextSegment::Call(call) => {
                    if !self.tool_calls.record_emitted(call.key) {
                        debug!(name = %call.name, "Skipping text tool call already emitted");
                        continue;
                    }
                    out.push(
                        ToolCallPart {
                            id: generate_call_id(),
                            name: call.name,
                            arguments: call.arguments,
                        }
                        .into(),
                    );
                }
            }
        }
    }

    /// Visible text closes the open thinking session unless it is only whitespace.
    fn emit_text(&mut self, text: &str, out: &mut Vec<ResponsePart>) {
        if text.is_empty() {
            return;
        }
        if !text.trim().is_empty() {
            if let Some(terminator) = self.thinking.close() {
                out.push(terminator.into());
            }
        }
        out.push(ResponsePart::text(text));
        self.emitted_text = true;
    }
}
