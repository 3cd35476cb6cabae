use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

const PRAGMAS: [&str; 2] = ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"];

pub async fn connect_and_migrate(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);
    opts.sqlx_logging(false);
    connect_with(opts).await
}

pub async fn connect_with(opts: ConnectOptions) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(opts).await.context("connect to database")?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string()))
            .await
            .with_context(|| pragma.to_string())?;
    }

    Migrator::up(&db, None).await.context("run migrations")?;
    tracing::info!("database ready");
    Ok(db)
}

/// Fresh migrated in-memory database. A single pooled connection keeps every
/// query on the same in-memory file.
#[cfg(test)]
pub async fn memory() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    connect_with(opts).await.expect("in-memory database")
}
