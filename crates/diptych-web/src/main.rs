//! diptych web server.
//!
//! Run with: cargo run -p diptych-web

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use diptych_llm::build_gateway;
use diptych_raster::PdfiumRasterizer;
use diptych_store::{AccountStore, JsonFileStore};
use diptych_web::config::Config;
use diptych_web::router::build_router;
use diptych_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;

    let rasterizer = Arc::new(PdfiumRasterizer::new(
        config.raster.scale,
        config.raster.page_ceiling,
    ));

    let gateway = build_gateway(&config.model.settings())
        .map_err(|e| anyhow::anyhow!("model backend: {e}"))?;
    info!(model = gateway.model_id(), "model backend ready");

    let kv = Arc::new(JsonFileStore::open(&config.store.path)?);
    let accounts = AccountStore::open(kv);

    let state = AppState::new(rasterizer, Arc::new(gateway), accounts, config.model.tone);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %config.server.bind, "diptych listening");
    axum::serve(listener, app).await?;

    Ok(())
}
