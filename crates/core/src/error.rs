use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Unified error type for everything the chat relay can fail on.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("upstream error (status {status}): {detail}")]
    Upstream {
        status: u16,
        /// Parsed upstream body, or an empty object when it was not JSON.
        detail: Value,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Network(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON body sent to the caller. Network and internal failures share a
    /// generic message so nothing about the upstream leaks out.
    fn body(&self) -> Value {
        match self {
            Self::MethodNotAllowed => json!({ "error": "Method not allowed" }),
            Self::MalformedRequest(_) => json!({ "error": "Malformed request body" }),
            Self::PayloadTooLarge { .. } => json!({ "error": "Request body too large" }),
            Self::Upstream { detail, .. } => json!({
                "error": "OpenAI API error",
                "detail": detail,
            }),
            Self::Network(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Network(format!("connection failed: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn into_parts(err: RelayError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_method_not_allowed_response() {
        let (status, body) = into_parts(RelayError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_status_and_detail() {
        let err = RelayError::Upstream {
            status: 429,
            detail: json!({ "error": { "message": "slow down" } }),
        };
        let (status, body) = into_parts(err).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "OpenAI API error");
        assert_eq!(body["detail"]["error"]["message"], "slow down");
    }

    #[tokio::test]
    async fn test_network_error_is_generic_500() {
        let (status, body) =
            into_parts(RelayError::Network("connection refused at 10.0.0.1".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_malformed_request_hides_parser_message() {
        let (status, body) =
            into_parts(RelayError::MalformedRequest("expected value at line 1".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Malformed request body" }));
    }

    #[tokio::test]
    async fn test_payload_too_large_response() {
        let (status, body) = into_parts(RelayError::PayloadTooLarge { limit: 1024 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "error": "Request body too large" }));
    }

    #[test]
    fn test_invalid_upstream_status_maps_to_bad_gateway() {
        let err = RelayError::Upstream {
            status: 42,
            detail: json!({}),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
