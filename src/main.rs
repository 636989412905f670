mod accounts;
mod app;
mod auth;
mod config;
mod db;
mod response;
mod state;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Real environment variables take precedence over .env
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accountd=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;

    let app_state = AppState::init(config).await.inspect_err(|e| {
        tracing::error!(error = %e, "startup failed");
    })?;

    let app = app::build_app(app_state.clone());

    if let Err(e) = app_state.accounts.ensure_admin_exists().await {
        tracing::error!(error = %e, "ensuring admin user exists failed");
        return Err(e.into());
    }

    app::serve(app, &app_state.config).await
}
