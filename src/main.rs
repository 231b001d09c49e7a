mod app;
mod auth;
mod config;
mod genai;
mod goals;
mod jobs;
mod notify;
mod oauth;
mod publish;
mod social;
mod state;
mod vault;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "lockin=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    // Deadline watch + commitment engine; in-flight ticks are abandoned on
    // shutdown, which is safe since every write is single-row and idempotent.
    let background = jobs::spawn(app_state.clone());

    let app = app::build_app(app_state);
    let result = app::serve(app).await;

    for task in background {
        task.abort();
    }
    tracing::info!("background jobs stopped");

    result
}
