mod app;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod state;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "authsvc=debug,axum=info,tower_http=info".to_string());
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

    let (app_state, pool) = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    app::serve(app::build_app(app_state)).await?;

    tracing::info!("closing database pool");
    pool.close().await;
    Ok(())
}
