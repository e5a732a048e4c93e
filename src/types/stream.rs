//! Reconstructed output parts.

use serde::{Deserialize, Serialize};

/// One unit of reconstructed output, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePart {
    /// Visible text content.
    Text(TextPart),
    /// Reasoning content belonging to a thinking session.
    Thinking(ThinkingPart),
    /// A complete tool invocation with parsed arguments.
    ToolCall(ToolCallPart),
}

/// Visible text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// Reasoning content tagged with its session id.
///
/// An empty `text` with no metadata terminates the session `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingPart {
    pub text: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ThinkingPart {
    /// The empty part that closes session `id`.
    pub fn terminator(id: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            id: id.into(),
            metadata: None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.text.is_empty() && self.metadata.is_none()
    }
}

/// A reconstructed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    /// Always a JSON object.
    pub arguments: serde_json::Value,
}

impl ResponsePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart { text: text.into() })
    }

    /// Text payload if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(part) => Some(&part.text),
            _ => None,
        }
    }

    pub fn as_thinking(&self) -> Option<&ThinkingPart> {
        match self {
            Self::Thinking(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallPart> {
        match self {
            Self::ToolCall(part) => Some(part),
            _ => None,
        }
    }
}

impl From<ThinkingPart> for ResponsePart {
    fn from(part: ThinkingPart) -> Self {
        Self::Thinking(part)
    }
}

impl From<ToolCallPart> for ResponsePart {
    fn from(part: ToolCallPart) -> Self {
        Self::ToolCall(part)
    }
}
