use crate::chat::{ChatRequest, UpstreamResult};
use crate::config::UpstreamConfig;
use crate::error::RelayError;
use async_trait::async_trait;

/// Performs one upstream chat-completion call.
///
/// Any HTTP response, success or not, comes back as `Ok(UpstreamResult)`;
/// only transport failures are errors.
#[async_trait]
pub trait ChatExecutor: Send + Sync {
    /// Short name used in logs (e.g. "openai").
    fn identifier(&self) -> &str;

    /// Send `request` using the endpoint and credentials in `upstream`.
    async fn execute(
        &self,
        upstream: &UpstreamConfig,
        request: ChatRequest,
    ) -> Result<UpstreamResult, RelayError>;
}
