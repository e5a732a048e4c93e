//! Tool declarations sent with a request.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RillError};

/// Default ceiling on the number of tools one request may declare.
pub const DEFAULT_MAX_TOOLS: usize = 128;

/// Tool definition sent to the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Wire form: `{"type": "function", "function": {...}}`.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Reject tool lists longer than `max`. Runs before any network attempt.
pub fn check_tool_limit(tools: &[ToolDefinition], max: usize) -> Result<()> {
    if tools.len() > max {
        return Err(RillError::ToolLimitExceeded {
            count: tools.len(),
            max,
        });
    }
    Ok(())
}
