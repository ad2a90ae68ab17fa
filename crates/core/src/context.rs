use std::time::Instant;

/// Response header carrying the request id back to the caller.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request metadata for logging, injected as an axum `Extension`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// UUID v4.
    pub request_id: String,
    pub start_time: Instant,
    pub client_ip: Option<String>,
}

impl RequestContext {
    pub fn new(client_ip: Option<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            client_ip,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }
}
