use async_trait::async_trait;
use bytes::Bytes;
use relay_core::chat::{ChatRequest, UpstreamResult};
use relay_core::config::UpstreamConfig;
use relay_core::error::RelayError;
use relay_core::provider::ChatExecutor;

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// A fresh client is built per call from the current [`UpstreamConfig`], so a
/// reloaded key, base URL, or proxy takes effect on the next request.
#[derive(Debug, Default)]
pub struct OpenAIExecutor;

impl OpenAIExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn build_client(upstream: &UpstreamConfig) -> Result<reqwest::Client, RelayError> {
    relay_core::proxy::build_http_client(upstream)
        .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl ChatExecutor for OpenAIExecutor {
    fn identifier(&self) -> &str {
        "openai"
    }

    async fn execute(
        &self,
        upstream: &UpstreamConfig,
        request: ChatRequest,
    ) -> Result<UpstreamResult, RelayError> {
        let client = build_client(upstream)?;
        let url = upstream.chat_completions_url();
        let payload = serde_json::to_vec(&request)
            .map_err(|e| RelayError::Internal(format!("failed to encode request: {e}")))?;

        let resp = client
            .post(&url)
            .header("authorization", format!("Bearer {}", upstream.api_key))
            .header("content-type", "application/json")
            .body(payload)
            .send()
            .await?;

        let status = resp.status().as_u16();
        // A body that cannot be read is treated like one that cannot be parsed.
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(model = %request.model, status, "Failed to read upstream body: {e}");
                Bytes::new()
            }
        };

        let result = UpstreamResult::from_parts(status, &body);
        tracing::debug!(
            model = %request.model,
            status,
            ok = result.ok,
            bytes = body.len(),
            "Upstream call finished"
        );
        Ok(result)
    }
}
