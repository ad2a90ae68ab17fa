pub mod dispatch;
pub mod handler;
pub mod middleware;

use arc_swap::ArcSwap;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::{Router, middleware as axum_mw};
use relay_core::config::Config;
use relay_core::provider::ChatExecutor;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Path the chat relay is mounted on.
pub const CHAT_PATH: &str = "/api/chat";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub executor: Arc<dyn ChatExecutor>,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit_bytes = state.config.load().body_limit_bytes();

    // The handler answers every method itself (OPTIONS, 405, POST); the limit
    // applies when it buffers a POST body.
    let chat_routes = Router::new()
        .route(CHAT_PATH, axum::routing::any(handler::chat::chat))
        .layer(DefaultBodyLimit::max(body_limit_bytes));

    // Layers run outer → inner from the bottom up. CORS headers sit outside
    // everything so that 404 and panic responses carry them too.
    Router::new()
        .route("/health", axum::routing::get(handler::health::health))
        .merge(chat_routes)
        .fallback(handler::not_found)
        .layer(axum_mw::from_fn(
            middleware::request_logging::request_logging_middleware,
        ))
        .layer(axum_mw::from_fn(
            middleware::request_context::request_context_middleware,
        ))
        .layer(CatchPanicLayer::custom(handler::panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
