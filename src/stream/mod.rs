//! Stream-to-parts assembly.
//!
//! Raw bytes flow through [`sse::FrameDecoder`] into [`dispatcher::DeltaDispatcher`],
//! which fans each delta out to the tool-call, thinking and inline-tag handlers.
//! [`ResponseAssembler`] owns all of that state for exactly one response;
//! [`assemble`] drives it from an async byte stream.

pub mod dispatcher;
pub mod inline_tags;
pub mod sse;
pub mod text_tool_calls;
pub mod thinking;
pub mod tool_calls;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{InlineTagConfig, RillConfig};
use crate::error::{Result, RillError};
use crate::types::{FinishReason, ResponsePart};

use dispatcher::DeltaDispatcher;
use sse::{EventPayload, FrameDecoder};

/// Per-response parsing options.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub inline_tags: InlineTagConfig,
    pub text_tool_calls: bool,
}

impl From<&RillConfig> for StreamOptions {
    fn from(config: &RillConfig) -> Self {
        Self {
            inline_tags: config.inline_tags.clone(),
            text_tool_calls: config.text_tool_calls,
        }
    }
}

/// Decoder plus dispatcher for a single response.
///
/// A fatal error never swallows parts produced before it: when a chunk yields
/// parts and then fails, the parts are returned and the error is held back
/// for the next call (or [`ResponseAssembler::take_failure`]).
#[derive(Debug)]
pub struct ResponseAssembler {
    decoder: FrameDecoder,
    dispatcher: DeltaDispatcher,
    done: bool,
    finish_reason: Option<FinishReason>,
    failure: Option<RillError>,
}

impl ResponseAssembler {
    pub fn new(options: &StreamOptions) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            dispatcher: DeltaDispatcher::new(options),
            done: false,
            finish_reason: None,
            failure: None,
        }
    }

    /// Feed one chunk of raw bytes.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Result<Vec<ResponsePart>> {
        self.raise_failure()?;
        let mut out = Vec::new();
        for payload in self.decoder.push(chunk) {
            if let Err(e) = self.handle(payload, &mut out) {
                return self.fail(out, e);
            }
        }
        Ok(out)
    }

    /// The byte stream ended. Decodes any unterminated line and, if no
    /// done-marker was seen, performs the end-of-stream flush.
    pub fn finish(&mut self) -> Result<Vec<ResponsePart>> {
        self.raise_failure()?;
        let mut out = Vec::new();
        if let Some(payload) = self.decoder.finish() {
            if let Err(e) = self.handle(payload, &mut out) {
                return self.fail(out, e);
            }
        }
        if !self.done {
            self.complete(&mut out);
        }
        Ok(out)
    }

    /// An error held back behind parts that were already returned.
    pub fn take_failure(&mut self) -> Option<RillError> {
        self.failure.take()
    }

    /// Whether the done-marker (or end of input) has been processed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason.or(self.dispatcher.finish_reason())
    }

    fn handle(&mut self, payload: EventPayload, out: &mut Vec<ResponsePart>) -> Result<()> {
        if self.done {
            debug!("Ignoring payload after end of stream");
            return Ok(());
        }
        match payload {
            EventPayload::Data(json) => self.dispatcher.dispatch(&json, out)?,
            EventPayload::Done => self.complete(out),
        }
        Ok(())
    }

    fn raise_failure(&mut self) -> Result<()> {
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The response is over once a payload fails; later payloads are ignored.
    fn fail(&mut self, out: Vec<ResponsePart>, error: RillError) -> Result<Vec<ResponsePart>> {
        self.done = true;
        if out.is_empty() {
            return Err(error);
        }
        self.failure = Some(error);
        Ok(out)
    }

    fn complete(&mut self, out: &mut Vec<ResponsePart>) {
        self.finish_reason = self.dispatcher.finish_reason();
        out.extend(self.dispatcher.finish());
        self.done = true;
    }
}

/// Turn a byte stream into an ordered stream of response parts.
///
/// Reading stops at the done-marker, at the first error, or when `cancel`
/// fires; the byte stream is dropped on every exit path. Cancellation yields
/// a single [`RillError::Cancelled`] and no further parts.
pub fn assemble<S, B, E>(
    bytes: S,
    options: StreamOptions,
    cancel: CancellationToken,
) -> BoxStream<'static, Result<ResponsePart>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<RillError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut assembler = ResponseAssembler::new(&options);
        futures::pin_mut!(bytes);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = bytes.next() => Some(next),
            };

            let Some(next) = next else {
                debug!("Response stream cancelled");
                yield Err(RillError::Cancelled);
                break;
            };

            let result = match next {
                Some(Ok(chunk)) => assembler.push_bytes(chunk.as_ref()),
                Some(Err(e)) => Err(e.into()),
                None => assembler.finish(),
            };

            match result {
                Ok(parts) => {
                    for part in parts {
                        if cancel.is_cancelled() {
                            break;
                        }
                        yield Ok(part);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }

            if let Some(e) = assembler.take_failure() {
                if !cancel.is_cancelled() {
                    yield Err(e);
                    break;
                }
            }

            if cancel.is_cancelled() {
                yield Err(RillError::Cancelled);
                break;
            }
            if assembler.is_done() {
                break;
            }
        }
    };

    Box::pin(stream)
}
