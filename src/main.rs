use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use cool_destinations::{
    api::routes::create_router,
    config::Config,
    points::PointStore,
    provider::OpenMeteoClient,
    shutdown::shutdown_signal,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let points = PointStore::load(&config.points_file)?;
    info!(count = points.points().len(), file = %config.points_file, "loaded tracked points");

    let source = Arc::new(OpenMeteoClient::from_config(&config));
    let warm_deadline = config.warm_deadline;
    let refresh_deadline = config.refresh_deadline;
    let app_state = AppState::build(config, points, source);

    // Fill the cache before serving the first request
    info!("warming destinations cache");
    match app_state.cache.warm(warm_deadline).await {
        Ok(()) => info!("destinations cache warmed"),
        Err(e) => warn!(error = %e, "failed to warm destinations cache"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = app_state.cache.start_background_refresh(refresh_deadline, shutdown_rx);

    let app = create_router(app_state);
    let listener = TcpListener::bind(server_addr).await?;

    info!(%server_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher.await {
        warn!(error = %e, "background refresh task ended abnormally");
    }
    info!("server stopped");

    Ok(())
}

