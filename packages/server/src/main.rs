use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, header};
use common::storage::open_blob_store;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::{Deriver, FfmpegTool};

use server::config::{AppConfig, CorsConfig};
use server::database::init_db;
use server::pipeline::{DbDerivationSink, DerivationQueue, spawn_dispatcher};
use server::state::AppState;
use server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;
    seed::seed_banned_tags(&db, &config.moderation.banned_tags)
        .await
        .context("Failed to seed banned tags")?;

    let blob_store = open_blob_store(&config.storage)
        .await
        .context("Failed to open blob store")?;
    info!(backend = ?config.storage.backend, "Blob store ready");

    let work_root = config.media.work_root();
    tokio::fs::create_dir_all(&work_root)
        .await
        .with_context(|| format!("Failed to create media work dir {}", work_root.display()))?;

    let deriver = Arc::new(Deriver::new(
        Arc::clone(&blob_store),
        Arc::new(FfmpegTool::new(&config.media)),
        Arc::new(DbDerivationSink::new(db.clone())),
        work_root,
    ));
    let (derivations, rx) = DerivationQueue::new(config.media.queue_capacity);
    // Runs until process exit; queued jobs are abandoned on shutdown.
    let _dispatcher = spawn_dispatcher(deriver, rx, config.media.max_concurrent_jobs);
    info!(
        max_concurrent = config.media.max_concurrent_jobs,
        queue_capacity = config.media.queue_capacity,
        "Derivation dispatcher started"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cors = cors_layer(&config.server.cors);
    let state = AppState {
        db,
        config,
        blob_store,
        derivations,
    };

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ])
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
