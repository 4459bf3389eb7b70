use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub type DbPool = SqlitePool;

#[derive(Error, Debug)]
pub enum LogError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Failed to prepare database directory: {0}")]
  Io(#[from] std::io::Error),
}

/// Open (creating if needed) the workout log database and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, LogError> {
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  info!(path = %db_path.display(), "opening workout log");

  let options = SqliteConnectOptions::new()
    .filename(db_path)
    .create_if_missing(true);

  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect_with(options)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  Ok(pool)
}
