use std::sync::Arc;

use cast_server::{
    app,
    config::Config,
    error::AppErr,
    services::{delivery::DeliveryPipeline, directory::SessionDirectory, registry::BroadcastRegistry},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    let cfg = Arc::new(Config::from_env()?);

    let level = if cfg.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let directory = Arc::new(SessionDirectory::new());
    let registry  = Arc::new(BroadcastRegistry::new(Arc::clone(&directory)));
    let pipeline  = DeliveryPipeline::new(cfg.display);

    let app = app(Arc::clone(&cfg), registry, directory, pipeline);

    let listener = tokio::net::TcpListener::bind(cfg.addr()).await?;
    info!("server ready on http://{}", cfg.addr());
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
