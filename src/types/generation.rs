//! Finish signals reported by the upstream service.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why generation finished.
///
/// Unrecognised wire values parse as [`FinishReason::Other`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

impl FinishReason {
    /// Parse a wire `finish_reason` value.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(Self::Other)
    }

    /// Whether this signal declares the response structurally complete,
    /// so buffered tool calls must be flushed and must be valid.
    pub fn completes_tool_calls(self) -> bool {
        matches!(self, Self::Stop | Self::ToolCalls)
    }
}
