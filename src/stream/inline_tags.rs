//! Extraction of reasoning embedded as `<think>…</think>` markup in content.

use memchr::memmem;
use tracing::debug;

use crate::config::InlineTagConfig;

/// A piece of scanned content, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSegment {
    /// Plain text outside any tag.
    Text(String),
    /// A start marker: a fresh thinking session begins.
    Open,
    /// Reasoning inside the open tag (whitespace preserved).
    Reasoning(String),
    /// An end marker: the tag's session ends.
    Close,
}

/// Scanner state for one response.
///
/// Once content containing no start marker has been seen outside a tag, the
/// response is treated as tag-free and later content is never scanned.
#[derive(Debug)]
pub struct InlineTagScanner {
    start: String,
    end: String,
    in_tag: bool,
    detection_failed: bool,
}

impl Default for InlineTagScanner {
    fn default() -> Self {
        Self::new(&InlineTagConfig::default())
    }
}

impl InlineTagScanner {
    pub fn new(config: &InlineTagConfig) -> Self {
        Self {
            start: config.start.clone(),
            end: config.end.clone(),
            in_tag: false,
            detection_failed: false,
        }
    }

    pub fn in_tag(&self) -> bool {
        self.in_tag
    }

    #[cfg(test)]
    pub fn detection_failed(&self) -> bool {
        self.detection_failed
    }

    /// Split `content` into segments.
    ///
    /// Returns `None` when no tag is open and the content starts no tag; the
    /// caller then owns the content as plain text.
    pub fn scan(&mut self, content: &str) -> Option<Vec<TagSegment>> {
        if content.is_empty() || (!self.in_tag && self.detection_failed) {
            return None;
        }

        let mut segments = Vec::new();
        let mut rest = content;
        while !rest.is_empty() {
            if self.in_tag {
                match memmem::find(rest.as_bytes(), self.end.as_bytes()) {
                    Some(pos) => {
                        if pos > 0 {
                            segments.push(TagSegment::Reasoning(rest[..pos].to_string()));
                        }
                        segments.push(TagSegment::Close);
                        self.in_tag = false;
                        rest = &rest[pos + self.end.len()..];
                    }
                    None => {
                        segments.push(TagSegment::Reasoning(rest.to_string()));
                        rest = "";
                    }
                }
            } else {
                match memmem::find(rest.as_bytes(), self.start.as_bytes()) {
                    Some(pos) => {
                        if pos > 0 {
                            segments.push(TagSegment::Text(rest[..pos].to_string()));
                        }
                        segments.push(TagSegment::Open);
                        self.in_tag = true;
                        rest = &rest[pos + self.start.len()..];
                    }
                    None => {
                        if !rest.trim().is_empty() {
                            debug!("No inline reasoning tag; scanning disabled for this response");
                            self.detection_failed = true;
                        }
                        if segments.is_empty() {
                            return None;
                        }
                        segments.push(TagSegment::Text(rest.to_string()));
                        rest = "";
                    }
                }
            }
        }
        Some(segments)
    }

    pub fn reset(&mut self) {
        self.in_tag = false;
        self.detection_failed = false;
    }
}
