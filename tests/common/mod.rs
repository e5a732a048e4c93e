//! Shared helpers for building SSE streams.

#![allow(dead_code)]

use rill::stream::{ResponseAssembler, StreamOptions};
use rill::types::ResponsePart;
use serde_json::{json, Value};

/// A `data:` frame carrying one delta.
pub fn delta_frame(delta: Value) -> String {
    frame(json!({"choices": [{"index": 0, "delta": delta, "finish_reason": null}]}))
}

/// A `data:` frame carrying only a finish reason.
pub fn finish_frame(reason: &str) -> String {
    frame(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": reason}]}))
}

pub fn frame(payload: Value) -> String {
    format!("data: {payload}\n\n")
}

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Run a body through a fresh assembler, split into `chunk_size` byte pieces.
pub fn assemble_chunked(
    body: &str,
    chunk_size: usize,
    options: &StreamOptions,
) -> rill::error::Result<Vec<ResponsePart>> {
    let mut assembler = ResponseAssembler::new(options);
    let mut parts = Vec::new();
    for piece in body.as_bytes().chunks(chunk_size.max(1)) {
        parts.extend(assembler.push_bytes(piece)?);
    }
    parts.extend(assembler.finish()?);
    Ok(parts)
}

/// Like [`assemble_chunked`], but keeps the parts produced before a failure.
pub fn assemble_until_error(
    body: &str,
    chunk_size: usize,
    options: &StreamOptions,
) -> (Vec<ResponsePart>, Option<rill::error::RillError>) {
    let mut assembler = ResponseAssembler::new(options);
    let mut parts = Vec::new();
    for piece in body.as_bytes().chunks(chunk_size.max(1)) {
        match assembler.push_bytes(piece) {
            Ok(more) => parts.extend(more),
            Err(e) => return (parts, Some(e)),
        }
    }
    match assembler.finish() {
        Ok(more) => {
            parts.extend(more);
            (parts, None)
        }
        Err(e) => (parts, Some(e)),
    }
}

pub fn assemble_all(body: &str) -> rill::error::Result<Vec<ResponsePart>> {
    assemble_chunked(body, body.len(), &StreamOptions::default())
}

/// Drop session ids so part sequences from different runs compare equal.
pub fn without_ids(parts: &[ResponsePart]) -> Vec<ResponsePart> {
    parts
        .iter()
        .cloned()
        .map(|part| match part {
            ResponsePart::Thinking(mut t) => {
                t.id = String::new();
                ResponsePart::Thinking(t)
            }
            ResponsePart::ToolCall(mut c) if c.id.starts_with("call_") => {
                c.id = String::new();
                ResponsePart::ToolCall(c)
            }
            other => other,
        })
        .collect()
}
