use axum::Router;

pub mod broadcast;
pub mod glasses;
pub mod health;

pub fn router() -> Router {
    Router::new()
        .nest("/api/broadcast", broadcast::router())
        .nest("/ws",            glasses::router())
        .merge(health::router())
}
