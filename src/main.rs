use tracing_subscriber::EnvFilter;

use trailhead_api::config::AppConfig;
use trailhead_api::state::AppState;
use trailhead_api::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("starting Trailhead API in {} mode", config.environment);

    let pool = db::connect(&config.database).await?;
    sqlx::migrate!().run(&pool).await?;

    let port = config.port;
    let state = AppState::new(pool, config);
    let router = app(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{bind_addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
