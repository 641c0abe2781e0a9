//! SQLite-backed persistence for every entity in the data model. See spec §3.
//!
//! Mirrors the upstream state crate's shape: a [`StoreRuntime`] owns the
//! pool and runs embedded migrations at startup, and each entity gets its
//! own `runtime/*.rs` module of query methods plus a matching `model/*.rs`
//! row-conversion type. Status transitions on `review_requests` are written
//! as conditional `UPDATE ... WHERE status = ?` statements so a tick-driven
//! timeout and an in-flight callback can race safely — the loser's write
//! affects zero rows and is treated as a no-op, not an error.

mod error;
pub mod model;
pub mod runtime;

pub use error::StoreError;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Sqlite;
use sqlx::SqlitePool;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Owns the connection pool and exposes one accessor method per entity
/// module. Cheap to clone — `SqlitePool` is already an `Arc` internally.
#[derive(Clone)]
pub struct StoreRuntime {
    pool: SqlitePool,
}

impl StoreRuntime {
    /// Open (creating if absent) the SQLite database at `path`, enable WAL
    /// journaling, and run any pending migrations.
    pub async fn init(path: &Path) -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(StoreError::Connect)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(connect_options)
            .await
            .map_err(StoreError::Connect)?;

        MIGRATOR.run(&pool).await.map_err(StoreError::Migrate)?;

        Ok(Self { pool })
    }

    /// An in-memory runtime for tests: no file on disk, migrations still run.
    pub async fn init_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::Connect)?;
        MIGRATOR.run(&pool).await.map_err(StoreError::Migrate)?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) type Executor<'a> = &'a sqlx::Pool<Sqlite>;
