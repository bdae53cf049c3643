pub mod models;
pub mod snapshot;
pub mod writer;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

pub use snapshot::SnapshotStore;
pub use writer::{DiffWriter, PersistStats};

/// Owns the SQLite pool for one run. Open once, close on every exit path.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect (creating the file if needed) and apply migrations.
    pub async fn open(db_path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Database ready at {db_path}");
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn snapshots(&self) -> SnapshotStore {
        SnapshotStore::new(self.pool.clone())
    }

    pub fn diff_writer(&self) -> DiffWriter {
        DiffWriter::new(self.pool.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl Store {
    /// Single-connection in-memory database; every connection would otherwise get its own.
    pub(crate) async fn in_memory() -> Self {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("memory url")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .expect("in-memory pool");
        let store = Self { pool };
        store.migrate().await.expect("migrations");
        store
    }
}
