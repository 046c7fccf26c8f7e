pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod pagination;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::Config;
use state::AppState;

pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("DEVLOG_LOG"))
        .init();

    let config = Config::from_env().unwrap_or_else(|e| panic!("invalid configuration: {e}"));
    tracing::debug!(?config, "configuration loaded");

    let pool = storage::new_db_pool(&config.database_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {e}"));

    let app = AppState::new(pool, config.jwt_secret.as_bytes());

    api::run_server(app, &config).await
}
