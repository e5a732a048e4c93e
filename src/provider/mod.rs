//! Chat-completions request building and the streaming client.

pub mod http;
pub mod openai_compatible;

pub use openai_compatible::ChatCompletionsClient;

use serde_json::{Map, Value};

use crate::types::ToolDefinition;

/// A streaming chat-completions request.
///
/// Messages are passed through as already-shaped JSON objects.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub tools: Vec<ToolDefinition>,
    /// Extra top-level body fields (`temperature`, `reasoning`, ...).
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Request body. `model`, `messages`, `stream` and `tools` always win over `extra`.
    pub fn to_body(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert("model".into(), self.model.clone().into());
        body.insert("messages".into(), Value::Array(self.messages.clone()));
        body.insert("stream".into(), true.into());
        if !self.tools.is_empty() {
            let tool_defs: Vec<Value> = self.tools.iter().map(ToolDefinition::to_wire).collect();
            body.insert("tools".into(), tool_defs.into());
        }
        Value::Object(body)
    }
}
