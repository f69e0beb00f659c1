pub mod types;
pub mod config;
pub mod error;
pub mod participants;
pub mod bracket;
pub mod storage;
pub mod tournament;
pub mod view;
pub mod commands;

use types::*;
use config::*;
use storage::FileStore;
use tournament::Tournament;

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── Board HTTP server ──────────────────────────────────────────────────

/// Routes for the renderer: the derived bracket at `/state.json`, the
/// command API under `/api`, and static board files for everything else.
pub fn board_router(state: BoardServerState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/state.json", get(commands::get_state_json))
        .route("/api/participants", get(commands::list_participants))
        .route("/api/participants/:id", put(commands::update_participant))
        .route("/api/win", post(commands::record_win))
        .route("/api/champion", post(commands::crown_champion))
        .route("/api/reset", post(commands::reset_bracket))
        .route("/api/config", get(commands::get_config).put(commands::save_config))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn start_board_server(state: BoardServerState, static_dir: PathBuf, addr: &str) {
    let app = board_router(state, static_dir);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("board server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("board server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("board server error: {e}");
    }
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();

    // Initialize tracing with a daily rolling file
    let logs_dir = logs_dir();
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Bracket Board starting");

    let config_path = config_path();
    let config = load_config_from(&config_path).unwrap_or_else(|e| {
        warn!("{e}; using default config");
        apply_env_defaults(AppConfig::default())
    });
    log_env_warnings(&config);

    let data_dir = resolved_data_dir(&config);
    let static_dir = resolved_static_dir(&config);
    let addr = resolved_listen_addr(&config);
    info!("bracket data stored in {}", data_dir.display());

    let tournament: SharedTournament = Arc::new(Mutex::new(Tournament::load(Box::new(FileStore::new(data_dir)))));
    let state = BoardServerState {
        tournament,
        config: Arc::new(Mutex::new(config)),
        config_path,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return;
        }
    };
    runtime.block_on(start_board_server(state, static_dir, &addr));
}
