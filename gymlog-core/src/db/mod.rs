pub mod models;
pub mod operations;

use std::str::FromStr;
use std::time::Duration;

use log::{debug, error, info};
pub use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::errors::{GymError, Result};

/// Open (creating if needed) the database behind `url` and bring its schema
/// up to date.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);
    let pool = SqlitePool::connect_with(options).await?;

    init_database(&pool).await?;
    Ok(pool)
}

/// A private in-memory database. Pinned to one connection that never
/// expires, otherwise every new connection would see an empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    init_database(&pool).await?;
    Ok(pool)
}

pub async fn reset_database(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in [
        "log_sets",
        "log_workouts",
        "workout_sets",
        "workouts",
        "blocks",
        "programs",
        "historic_prs",
        "exercise_muscles",
        "exercises",
        "muscles",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    info!("Database reset");
    Ok(())
}

struct Migration {
    name: &'static str,
    up_sql: &'static str,
}

const MIGRATION_2026_10_18_090000_0000_SETUP_TABLES: &str =
    include_str!("../../../migrations/2026-10-18-090000-0000_setup_tables/up.sql");

const MIGRATIONS: &[Migration] = &[Migration {
    name: "2026-10-18-090000-0000_setup_tables",
    up_sql: MIGRATION_2026_10_18_090000_0000_SETUP_TABLES,
}];

async fn init_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER NOT NULL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER))
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn is_migration_applied(pool: &SqlitePool, migration_name: &str) -> Result<bool> {
    let result =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _migrations WHERE name = ?1")
            .bind(migration_name)
            .fetch_one(pool)
            .await?;
    Ok(result > 0)
}

fn parse_sql_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    init_migrations_table(pool).await?;

    for migration in MIGRATIONS {
        if is_migration_applied(pool, migration.name).await? {
            debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        let mut tx = pool.begin().await?;
        for statement in parse_sql_statements(migration.up_sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!(
                        "Failed to execute migration statement in {}: {} - Error: {}",
                        migration.name, statement, e
                    );
                    GymError::from(e)
                })?;
        }
        sqlx::query("INSERT INTO _migrations (name) VALUES (?1)")
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}
