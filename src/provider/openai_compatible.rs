//! Streaming client for OpenAI-compatible `/chat/completions` endpoints.

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RillConfig;
use crate::error::{Result, RillError};
use crate::stream::{assemble, StreamOptions};
use crate::types::{check_tool_limit, ResponsePart};
use crate::util::retry::RetryPolicy;

use super::http::{bearer_headers, retry_after_header_ms, shared_client, status_to_error};
use super::ChatRequest;

pub struct ChatCompletionsClient {
    config: RillConfig,
    retry: RetryPolicy,
    http: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(config: RillConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            retry: config.retry.policy(),
            http: shared_client().clone(),
            config,
        })
    }

    /// Use a specific reqwest client instead of the shared one.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &RillConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send the request with bounded retries and return the successful response.
    ///
    /// The tool ceiling is checked first and is never retried.
    pub async fn open(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        check_tool_limit(&request.tools, self.config.max_tools)?;

        let url = self.endpoint();
        let body = request.to_body();
        let mut attempt = 0u32;

        self.retry
            .execute(cancel, || {
                attempt += 1;
                self.attempt(&url, &body, attempt)
            })
            .await
    }

    /// Send the request and assemble the streamed response into parts.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, Result<ResponsePart>>> {
        let response = self.open(request, &cancel).await?;
        Ok(assemble(
            response.bytes_stream(),
            StreamOptions::from(&self.config),
            cancel,
        ))
    }

    /// Collect a whole response. Stops at the first error.
    pub async fn collect_chat(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<ResponsePart>> {
        use futures::TryStreamExt;

        self.stream_chat(request, cancel).await?.try_collect().await
    }

    async fn attempt(
        &self,
        url: &str,
        body: &serde_json::Value,
        attempt: u32,
    ) -> Result<reqwest::Response> {
        debug!(url, attempt, model = ?body.get("model"), "Opening chat stream");

        let resp = self
            .http
            .post(url)
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let header_retry_after = retry_after_header_ms(resp.headers());
        let body_text = resp.text().await.unwrap_or_default();
        let mut err = status_to_error(status.as_u16(), &body_text);
        if let RillError::RateLimited { retry_after_ms } = &mut err {
            *retry_after_ms = retry_after_ms.or(header_retry_after);
        }
        Err(err)
    }
}
