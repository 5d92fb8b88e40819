//! REST surface polled by the web front end. Every route needs a caller identity.
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Query},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{bad, AppResult},
    services::registry::{JoinReport, LeaveReport, SendReport, StartReport, StatusReport, StopReport},
    state::{Message, Registry},
    utils::auth::AuthUser,
};

#[derive(Deserialize, Default)]
struct SendBody { #[serde(default)] text: Option<String> }

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TargetBody { #[serde(default)] broadcaster_email: Option<String> }

/* a missing or non-JSON body reads as `{}` */
fn body_or_default<T: Default>(body: Result<Json<T>, JsonRejection>) -> T {
    body.map(|Json(b)| b).unwrap_or_default()
}

#[derive(Deserialize)]
struct MessagesQuery { broadcaster: Option<String> }

#[derive(Serialize)]
struct MessagesJson { live: bool, messages: Vec<Message> }

pub fn router() -> Router {
    Router::new()
        .route("/start",    post(start))
        .route("/stop",     post(stop))
        .route("/send",     post(send))
        .route("/status",   get(status))
        .route("/join",     post(join))
        .route("/leave",    post(leave))
        .route("/messages", get(messages))
}

async fn start(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
) -> Json<StartReport> {
    Json(reg.start(&uid).await)
}

async fn stop(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
) -> Json<StopReport> {
    Json(reg.stop(&uid).await)
}

async fn send(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
    body: Result<Json<SendBody>, JsonRejection>,
) -> AppResult<Json<SendReport>> {
    let p = body_or_default(body);
    let text = p.text.filter(|t| !t.is_empty()).ok_or_else(|| bad("Text required"))?;
    Ok(Json(reg.send(&uid, &text).await))
}

async fn status(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
) -> Json<StatusReport> {
    Json(reg.status(&uid).await)
}

async fn join(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
    body: Result<Json<TargetBody>, JsonRejection>,
) -> AppResult<Json<JoinReport>> {
    let p = body_or_default(body);
    let target = p
        .broadcaster_email
        .filter(|b| !b.is_empty())
        .ok_or_else(|| bad("broadcasterEmail required"))?;
    Ok(Json(reg.join(&uid, &target).await))
}

async fn leave(
    AuthUser(uid): AuthUser,
    Extension(reg): Extension<Registry>,
    body: Result<Json<TargetBody>, JsonRejection>,
) -> Json<LeaveReport> {
    match body_or_default(body).broadcaster_email {
        Some(target) => Json(reg.leave(&uid, &target).await),
        None         => Json(LeaveReport { left: true }),
    }
}

async fn messages(
    AuthUser(_uid): AuthUser,
    Extension(reg): Extension<Registry>,
    Query(q): Query<MessagesQuery>,
) -> AppResult<Json<MessagesJson>> {
    let b = q.broadcaster.filter(|b| !b.is_empty()).ok_or_else(|| bad("broadcaster required"))?;
    let messages = reg.history(&b).await;
    Ok(Json(MessagesJson { live: reg.is_live(&b).await, messages }))
}
