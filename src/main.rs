use axum::{routing::get, Router};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{trace::TraceLayer, cors::{Any, CorsLayer}};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod models;
mod query;
mod routes;
mod store;
mod topic;
mod video;

#[cfg(test)]
mod testing;

use video::{HttpVideoBackend, TokioPacer, VideoOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "coursecast_runtime=info,axum=info".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    // crate-relative path for sqlx migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    let store = Arc::new(db::PgStore::new(pool));

    let backend = HttpVideoBackend::new(config.video.base_url.clone(), config.video.timeout)?;
    let videos = VideoOrchestrator::new(config.video.clone(), Arc::new(backend), Arc::new(TokioPacer));

    let status = videos.probe().await;
    if status.is_running {
        tracing::info!(url = %config.video.base_url, "video backend reachable");
    } else {
        tracing::warn!(url = %config.video.base_url, error = ?status.error, "video backend not reachable, generation will use fallback videos");
    }

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(routes::AppState::new(store, videos)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
