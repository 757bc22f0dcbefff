use std::sync::Arc;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod response;
mod state;
mod tasks;
mod users;

#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "taskboard=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let state = AppState::postgres(config.clone(), pool);
    if let Some(admin) = &config.admin {
        auth::services::bootstrap_admin(state.users.as_ref(), admin).await?;
    }

    tracing::info!(filter_scope = ?config.filter_scope, "task service ready");
    app::serve(app::build_app(state), &config).await
}
