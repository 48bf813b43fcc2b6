use std::fs::File;
use std::io::Write;
use std::path::Path;

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError as SqlxMigrateError;
use thiserror::Error;

use crate::core::DbContext;

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to run embedded migrations")]
    EmbeddedMigrationFailed { source: SqlxMigrateError },

    #[error("No migrations applied yet")]
    NoMigrationsApplied,

    #[error("Failed to fetch applied migrations")]
    FetchAppliedMigrationsFailed { #[from] source: SqlxError },

    #[error("File system error")]
    FileSystemOperationFailed { #[from] source: std::io::Error },
}

/// Directory the `create` command writes new migrations to, relative to the working directory.
const MIGRATIONS_DIR: &str = "backend/migrations";

/// Applied versus embedded migrations, as reported by `migrate status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub available: usize,
    pub applied: usize,
}

impl MigrationStatus {
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.available.saturating_sub(self.applied)
    }
}

/// Embedded migrations as `version description`, oldest first.
#[must_use]
pub fn list_migrations() -> Vec<String> {
    sqlx::migrate!()
        .iter()
        .map(|m| format!("{} {}", m.version, m.description))
        .collect()
}

pub async fn run_migrations(db: &DbContext) -> Result<(), MigrationError> {
    sqlx::migrate!()
        .run(db)
        .await
        .map_err(|e| MigrationError::EmbeddedMigrationFailed { source: e })?;
    tracing::info!(count = list_migrations().len(), "Database schema is up to date");
    Ok(())
}

/// Compares the embedded migrations with the successful rows in `_sqlx_migrations`.
pub async fn migration_status(db: &DbContext) -> Result<MigrationStatus, MigrationError> {
    let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(db)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(e) if e.message().contains("no such table") => MigrationError::NoMigrationsApplied,
            _ => MigrationError::FetchAppliedMigrationsFailed { source: err },
        })?;
    Ok(MigrationStatus {
        available: list_migrations().len(),
        applied: usize::try_from(applied).unwrap_or_default(),
    })
}

/// Create a new migration file with the current timestamp
pub fn create_migration(name: &str) -> Result<String, MigrationError> {
    let migrations_path = Path::new(MIGRATIONS_DIR);
    if !migrations_path.exists() {
        std::fs::create_dir_all(migrations_path)?;
    }

    // sqlx takes the leading integer as the version: YYYYMMDDHHMMSS
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
    let normalized_name: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let filename = format!("{timestamp}_{normalized_name}.sql");
    let filepath = migrations_path.join(&filename);

    let mut file = File::create(&filepath)?;
    writeln!(file, "-- Migration: {name}")?;
    writeln!(file, "--")?;
    writeln!(file, "-- Embedded at build time; applied in version order on the next start.")?;

    tracing::info!("Created new migration file: {}.", filepath.display());
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::cfg::DatabaseSettings;

    async fn memory_db() -> DbContext {
        let settings = DatabaseSettings { url: "sqlite::memory:".to_string(), max_connections: 1, ..Default::default() };
        app::create_db_context(&settings).await.unwrap()
    }

    #[test]
    fn test_initial_schema_is_embedded() {
        let migrations = list_migrations();
        assert!(!migrations.is_empty());
        assert!(migrations[0].ends_with("initial schema"));
    }

    #[tokio::test]
    async fn test_status_before_and_after_running() {
        let db = memory_db().await;
        assert!(matches!(migration_status(&db).await, Err(MigrationError::NoMigrationsApplied)));

        run_migrations(&db).await.unwrap();
        let status = migration_status(&db).await.unwrap();
        assert_eq!(status.applied, status.available);
        assert_eq!(status.pending(), 0);
    }
}
