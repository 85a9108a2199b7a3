//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::state::AppState;

pub mod extract;
pub mod http;

/// Build the application router with:
/// - auth under `/auth/...` and `/users/me`
/// - learning endpoints `/daily`, `/mcqs`, `/doubt`
/// - progress tracking at `/progress`
/// - CORS restricted to the configured frontend origins (credentials allowed)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/health", get(http::http_health))
        // Auth
        .route("/auth/register", post(http::http_register))
        .route("/auth/jwt/login", post(http::http_login))
        .route("/auth/jwt/logout", post(http::http_logout))
        .route("/users/me", get(http::http_get_me).patch(http::http_patch_me))
        // Learning
        .route("/daily", get(http::http_daily))
        .route("/mcqs", get(http::http_mcqs))
        .route("/doubt", post(http::http_post_doubt))
        // Progress
        .route("/progress", get(http::http_get_progress).post(http::http_post_progress))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(target: "dsa_mentor", origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
