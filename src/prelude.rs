//! Convenience re-exports for common use.

pub use crate::config::RillConfig;
pub use crate::error::{Result, RillError};
pub use crate::provider::{ChatCompletionsClient, ChatRequest};
pub use crate::stream::{assemble, ResponseAssembler, StreamOptions};
pub use crate::types::{
    FinishReason, ResponsePart, TextPart, ThinkingPart, ToolCallPart, ToolDefinition,
};
pub use crate::util::retry::RetryPolicy;
