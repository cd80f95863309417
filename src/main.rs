use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::trace::TraceLayer; // request / response spans
use tracing::info;
use tracing_subscriber::EnvFilter;

use goal_scheduler::routes_validate;
use goal_scheduler::settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = settings::load_settings().context("failed to load settings")?;

    // RUST_LOG overrides the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind_addr {:?}", settings.bind_addr))?;

    let app = Router::new()
        .nest("/api", routes_validate::router(Arc::new(settings.clone())))
        .layer(TraceLayer::new_for_http());

    info!(%addr, tolerance_min = settings.point_tolerance_min, "goal scheduler listening");
    info!("API base: http://{addr}/api");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr} failed"))?;

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
