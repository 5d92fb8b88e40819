use std::sync::Arc;

use axum::{extract::Extension, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{config::Config, state::Directory};

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(dir): Extension<Directory>,
) -> Json<Value> {
    let mut body = json!({ "ok": true, "connectedGlasses": dir.count().await });
    if cfg.debug {
        body["users"] = json!(dir.connected_users().await);
    }
    Json(body)
}
