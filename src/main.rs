use std::sync::Arc;

use movieshelf::{AppState, app, config::Config, db, store::SqliteDataManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movieshelf=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let conn = db::connect_and_migrate(&config.database_url).await?;
    let data = Arc::new(SqliteDataManager::new(conn));

    if config.seed_demo {
        db::seed_demo(data.as_ref()).await?;
    }

    let state = AppState::new(data, &config.secret_key);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
