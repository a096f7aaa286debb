//! Watchpost - citizen incident reporting gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchpost::{
    backend::{Backend, MemoryBackend, MongoBackend},
    config::{Args, LogFormat},
    db::MongoClient,
    realtime::ChangeHub,
    server::{self, AppState},
    service::IncidentService,
    storage::VideoStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("watchpost={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Watchpost - Incident Reporting");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db {})", args.mongodb_uri, args.mongodb_db);
    info!("Videos: {} (max {} MB)", args.video_dir.display(), args.max_video_bytes / (1024 * 1024));
    info!("Public URL: {}", args.public_url);
    info!("======================================");

    let jwt = match args.jwt_validator() {
        Ok(jwt) => jwt,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // MongoDB is optional in dev mode
    let backend: Arc<dyn Backend> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Arc::new(MongoBackend::new(client).await?)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryBackend::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let hub = Arc::new(ChangeHub::new(args.realtime_buffer));
    let videos = Arc::new(VideoStore::new(args.video_store_config()));
    let service = Arc::new(IncidentService::new(backend, hub, videos));

    let state = Arc::new(AppState::new(args, service, jwt));
    server::run(state).await?;

    Ok(())
}
