use relay_core::chat::ChatParams;
use relay_core::config::UpstreamConfig;
use relay_core::error::RelayError;
use relay_core::provider::ChatExecutor;
use serde_json::Value;

/// Walk the model attempt plan, one upstream call at a time.
///
/// Stops at the first success, at the first failure that is not "model
/// unavailable" (403/404), or after the last attempt. A success is tagged with
/// the model that produced it; a final failure becomes
/// [`RelayError::Upstream`] carrying the upstream status and body untouched.
pub async fn dispatch(
    executor: &dyn ChatExecutor,
    upstream: &UpstreamConfig,
    params: &ChatParams,
) -> Result<Value, RelayError> {
    let attempts = params.attempts();

    for (idx, attempt) in attempts.iter().enumerate() {
        let mut result = executor
            .execute(upstream, params.request_for(&attempt.model))
            .await?;

        if result.is_model_unavailable() && !attempt.is_last {
            let next = attempts
                .get(idx + 1)
                .map(|a| a.model.as_str())
                .unwrap_or_default();
            tracing::warn!(
                provider = executor.identifier(),
                model = %attempt.model,
                status = result.status,
                fallback = %next,
                detail = %result.data,
                "Model unavailable, falling back"
            );
            continue;
        }

        if !result.ok {
            return Err(RelayError::Upstream {
                status: result.status,
                detail: result.data,
            });
        }

        result.tag_used_model(&attempt.model);
        return Ok(result.data);
    }

    Err(RelayError::Internal(
        "model attempt plan finished without a result".into(),
    ))
}
