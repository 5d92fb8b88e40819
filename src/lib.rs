//! Live text broadcasting to wearable displays.
//!
//! A broadcaster goes live, listeners join by the broadcaster's identity, and
//! every message sent is kept in a short history for pollers and pushed to
//! each listener's attached glasses, cut into screen-sized chunks.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils {
    pub mod auth;
    pub mod jwt;
    pub mod ring;
}

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::Config;
use crate::services::delivery::DeliveryPipeline;
use crate::state::{Directory, Registry};

/// Full HTTP + WebSocket surface with its shared state attached.
pub fn app(
    cfg: Arc<Config>,
    registry: Registry,
    directory: Directory,
    pipeline: DeliveryPipeline,
) -> Router {
    let limit = cfg.body_limit;
    Router::new()
        .merge(routes::router())
        .layer(Extension(registry))
        .layer(Extension(directory))
        .layer(Extension(pipeline))
        .layer(Extension(cfg))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
