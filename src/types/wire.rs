//! Chat-completion chunk shapes as they arrive on the wire.
//!
//! Only the fields the assembler reads are modelled; everything else is ignored.

use serde::Deserialize;
use serde_json::Value;

/// Text substituted for encrypted reasoning details.
pub const REDACTED_REASONING: &str = "[REDACTED]";

/// One `data:` payload of a streaming chat completion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// The first choice, which is the only one the assembler follows.
    pub fn into_first_choice(self) -> Option<ChunkChoice> {
        self.choices.into_iter().next()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallFragment>>,
    #[serde(default)]
    pub reasoning_content: Option<ThinkingField>,
    #[serde(default)]
    pub thinking: Option<ThinkingField>,
    /// Either bare reasoning text or a settings object such as `{"enabled": false}`.
    #[serde(default)]
    pub reasoning: Option<Value>,
    /// Expected to be an array; anything else is ignored.
    #[serde(default)]
    pub reasoning_details: Option<Value>,
}

impl ChunkDelta {
    /// Take the `reasoning_details` entries, if the field is a non-empty array.
    pub fn take_reasoning_details(&mut self) -> Option<Vec<Value>> {
        match self.reasoning_details.take()? {
            Value::Array(details) if !details.is_empty() => Some(details),
            _ => None,
        }
    }

    /// `reasoning.enabled == false` switches off the bare thinking fallback for this delta.
    pub fn reasoning_disabled(&self) -> bool {
        self.reasoning
            .as_ref()
            .and_then(|r| r.get("enabled"))
            .and_then(Value::as_bool)
            == Some(false)
    }

    /// The bare thinking field, in precedence order `thinking`,
    /// `reasoning_content`, then a string-valued `reasoning`.
    pub fn bare_thinking(&self) -> Option<ThinkingField> {
        let usable = |field: &Option<ThinkingField>| field.clone().filter(ThinkingField::is_usable);
        if let Some(field) = usable(&self.thinking).or_else(|| usable(&self.reasoning_content)) {
            return Some(field);
        }
        match &self.reasoning {
            Some(Value::String(text)) => Some(ThinkingField::Text(text.clone())),
            _ => None,
        }
    }
}

/// A partial tool call keyed by its stream index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionFragment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionFragment {
    #[serde(default)]
    pub name: Option<String>,
    /// Usually a string slice of JSON; some servers send a whole object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ToolCallFragment {
    pub fn name(&self) -> Option<&str> {
        self.function.as_ref()?.name.as_deref()
    }

    /// The argument text carried by this fragment, if any.
    pub fn arguments_text(&self) -> Option<String> {
        match self.function.as_ref()?.arguments.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Free-form thinking content: a plain string or `{text, metadata}`.
///
/// Any other shape lands in `Unsupported` so the rest of the delta still parses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThinkingField {
    Text(String),
    Structured {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        metadata: Option<Value>,
    },
    Unsupported(Value),
}

impl ThinkingField {
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Extracted text and metadata.
    pub fn into_parts(self) -> (String, Option<Value>) {
        match self {
            Self::Text(text) => (text, None),
            Self::Structured { text, metadata } => (text.unwrap_or_default(), metadata),
            Self::Unsupported(_) => (String::new(), None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningDetailKind {
    Summary,
    Text,
    Encrypted,
    Unknown(String),
}

/// One entry of `reasoning_details`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningDetail {
    pub kind: ReasoningDetailKind,
    pub format: Option<String>,
    pub index: Option<u64>,
    raw: Value,
}

impl ReasoningDetail {
    pub fn from_value(raw: Value) -> Self {
        let kind = match raw.get("type").and_then(Value::as_str) {
            Some("reasoning.summary") => ReasoningDetailKind::Summary,
            Some("reasoning.text") => ReasoningDetailKind::Text,
            Some("reasoning.encrypted") => ReasoningDetailKind::Encrypted,
            other => ReasoningDetailKind::Unknown(other.unwrap_or_default().to_string()),
        };
        Self {
            kind,
            format: raw.get("format").and_then(Value::as_str).map(str::to_string),
            index: raw.get("index").and_then(Value::as_u64),
            raw,
        }
    }

    /// Parse and order a detail array by declared index. Entries without an
    /// index keep their relative position after the indexed ones.
    pub fn sorted(values: Vec<Value>) -> Vec<Self> {
        let mut details: Vec<Self> = values.into_iter().map(Self::from_value).collect();
        details.sort_by_key(|d| d.index.unwrap_or(u64::MAX));
        details
    }

    /// The text this detail contributes to the thinking stream.
    pub fn text(&self) -> String {
        let field = |name: &str| {
            self.raw
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        match self.kind {
            ReasoningDetailKind::Summary => field("summary"),
            ReasoningDetailKind::Text => field("text"),
            ReasoningDetailKind::Encrypted => REDACTED_REASONING.to_string(),
            ReasoningDetailKind::Unknown(_) => self.raw.to_string(),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    /// Metadata attached to the emitted thinking part.
    pub fn metadata(&self) -> Value {
        serde_json::json!({
            "format": self.format,
            "type": self.type_name(),
            "index": self.index,
        })
    }
}
