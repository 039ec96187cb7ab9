use std::time::Duration;

use axum::http::{header, HeaderName, Method};
use axum::{middleware::from_fn_with_state, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod middleware;
mod routes;

pub use auth::{AdminUser, AuthUser, MaybeAuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::feed())
        .merge(routes::posts())
        .merge(routes::comments())
        .merge(routes::users())
        .merge(routes::social())
        .merge(routes::search())
        .merge(routes::messages())
        .merge(routes::notifications())
        .merge(routes::stories())
        .merge(routes::moderation())
        .merge(routes::admin())
        .merge(routes::releases())
        .fallback(handlers::fallback)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::ban::blocked_account_middleware,
        ))
        .with_state(state)
}

/// The router with the CORS, body limit and tracing layers used in production.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-authorization"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_seconds));

    router(state)
        .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
