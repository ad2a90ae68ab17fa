use crate::AppState;
use crate::dispatch::dispatch;
use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use relay_core::chat::parse_chat_params;
use relay_core::error::RelayError;
use serde_json::Value;

/// Chat relay entry point.
///
/// `OPTIONS` is answered with an empty 200 (CORS preflight), any method other
/// than `POST` with 405. A `POST` body is parsed, forwarded upstream with the
/// fallback policy applied, and the upstream JSON (or an error envelope) is
/// returned.
///
/// The body is only buffered (and held to the route's body limit) once the
/// method is known to be `POST`.
pub async fn chat(State(state): State<AppState>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if request.method() != Method::POST {
        return RelayError::MethodNotAllowed.into_response();
    }

    let result = match Bytes::from_request(request, &state).await {
        Ok(body) => relay(&state, &body).await,
        Err(rejection) => Err(body_error(&state, rejection)),
    };

    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(err) => {
            log_failure(&err);
            err.into_response()
        }
    }
}

async fn relay(state: &AppState, body: &[u8]) -> Result<Value, RelayError> {
    // One snapshot per request; a reload mid-request does not mix settings.
    let config = state.config.load_full();
    let params = parse_chat_params(body, &config.defaults)?;
    dispatch(state.executor.as_ref(), &config.upstream, &params).await
}

fn body_error(state: &AppState, rejection: BytesRejection) -> RelayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge {
            limit: state.config.load().body_limit_bytes(),
        }
    } else {
        RelayError::MalformedRequest(rejection.body_text())
    }
}

fn log_failure(err: &RelayError) {
    match err {
        RelayError::Upstream { status, detail } => {
            tracing::error!(status = *status, detail = %detail, "Upstream API error");
        }
        RelayError::MalformedRequest(reason) => {
            tracing::warn!("Rejected malformed chat request: {reason}");
        }
        RelayError::PayloadTooLarge { limit } => {
            tracing::warn!(limit = *limit, "Rejected oversized chat request");
        }
        RelayError::MethodNotAllowed => {}
        other => tracing::error!("Chat relay failed: {other}"),
    }
}
