use std::time::Duration;

use migration::Migrator;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{error::AppResult, models::MovieInput, store::DataManager};

const PRAGMAS: &[&str] =
    &["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL", "PRAGMA cache_size=-64000"];

/// Lifetime for the single `:memory:` connection. Recycling it drops the database.
const MEMORY_KEEP_ALIVE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url);
    // Every pooled connection to :memory: would get its own empty database.
    if database_url.contains(":memory:") {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_KEEP_ALIVE)
            .max_lifetime(MEMORY_KEEP_ALIVE);
    }
    options
}

pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(database_url)).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts a starter user and movie into an empty database.
pub async fn seed_demo(data: &dyn DataManager) -> AppResult<()> {
    if !data.get_all_users().await?.is_empty() {
        return Ok(());
    }

    let admin = data.add_user("Admin").await?;
    data.add_movie(
        admin.id,
        MovieInput {
            title: "Titanic".to_string(),
            year: 1997,
            rating: 7.9,
            poster: "https://m.media-amazon.com/images/M/MV5BZTE2ZjE1MmYtNzhiMC00ZDZkLWEzYjAtM2M2NTM0YjMzMzAyXkEyXkFqcGc@._V1_.jpg".to_string(),
        },
    )
    .await?;

    info!(user_id = admin.id, "seeded demo data");
    Ok(())
}
