mod app;
mod config;
mod db;
mod error;
mod images;
mod nutrition;
mod recognition;
mod records;
mod retention;
mod state;
mod storage;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "calorielog=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let app_state = AppState::init(config).await?;

    // Retention only advances on restart
    let report = retention::sweep(
        &app_state.store,
        app_state.storage.as_ref(),
        app_state.config.retention_days,
    )
    .await?;
    if report.files_failed > 0 {
        tracing::warn!(
            files_failed = report.files_failed,
            rows_deleted = report.rows_deleted,
            "some expired uploads could not be removed"
        );
    }

    let config = app_state.config.clone();
    let app = app::build_app(app_state);
    app::serve(app, &config).await
}
