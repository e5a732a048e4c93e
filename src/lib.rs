//! Rill: streaming chat-completion assembler.
//!
//! Consumes the `data:`-framed event stream of an OpenAI-compatible
//! chat-completions endpoint and reconstructs it, progressively and in order,
//! into text, thinking (reasoning) and tool-call parts. Requests are sent with
//! bounded, cancellation-aware retries.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use rill::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> rill::error::Result<()> {
//! let client = ChatCompletionsClient::new(RillConfig::from_env()?)?;
//! let request = ChatRequest::new(
//!     "gpt-4o",
//!     vec![serde_json::json!({"role": "user", "content": "Hello!"})],
//! );
//! let mut parts = client.stream_chat(&request, CancellationToken::new()).await?;
//! while let Some(part) = parts.next().await {
//!     if let ResponsePart::Text(text) = part? {
//!         print!("{}", text.text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod types;
pub mod util;
