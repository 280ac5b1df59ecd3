use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapjudge::{
    api,
    config::ServerConfig,
    judge::JudgeConfig,
    sources::{Dice, SystemClock},
    state::AppState,
    store::{FileStore, MemoryStore, RoomStore},
    sweeper,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapjudge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SnapJudge...");

    let config = ServerConfig::from_env();

    let store: Arc<dyn RoomStore> = match &config.rooms_file {
        Some(path) => {
            tracing::info!("Persisting rooms to {}", path.display());
            Arc::new(FileStore::open(path.clone()).await)
        }
        None => {
            tracing::info!("ROOMS_FILE not set, keeping rooms in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let dice = Arc::new(Dice::from_entropy());
    let judge = JudgeConfig::from_env().build_judge(dice.clone());

    let state = Arc::new(
        AppState::new(store, judge, Arc::new(SystemClock), dice).with_room_ttl(config.room_ttl),
    );

    // Purges once right away, then every cleanup interval
    sweeper::spawn_room_sweeper(state.clone(), config.cleanup_interval);

    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
