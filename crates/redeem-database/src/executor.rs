//! Async SQLite executor using a dedicated background thread.
//!
//! - A single dedicated thread runs every SQLite operation for a handle
//! - Queries are sent through a channel and run in FIFO order
//! - The Tokio runtime is never blocked by SQLite
//!
//! Handles are cheap to clone; clones share the same executor thread. The
//! handle is opened once at startup and closed explicitly at shutdown.

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Convert a tokio_rusqlite::Error to DatabaseError.
fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => DatabaseError::Connection("Connection closed".to_string()),
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Async SQLite database with a dedicated executor thread.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open a database at the given path.
    ///
    /// This will:
    /// - Create the database file and its parent directory if missing
    /// - Enable WAL mode and a busy timeout so other connections wait for
    ///   the write lock instead of failing
    /// - Run any pending migrations
    /// - Start the dedicated executor thread
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();

        info!(path = %path_str, "Opening code store");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA busy_timeout = 5000;
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        conn.call(|conn| {
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(|e| match from_tokio_rusqlite(e) {
            DatabaseError::Sqlite(inner) => DatabaseError::Migration(inner.to_string()),
            other => other,
        })?;

        info!(path = %path_str, "Code store initialized with WAL mode");

        Ok(Self {
            conn,
            path: path_str,
        })
    }

    /// Execute a closure on the database connection.
    ///
    /// The closure runs on the dedicated SQLite thread and must only run SQL
    /// and light row mapping.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Our DatabaseResult travels inside tokio_rusqlite's Ok so that both
        // error layers collapse into one.
        let outer_result = self
            .conn
            .call(move |conn| Ok(f(conn)))
            .await;

        match outer_result {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Execute a closure that returns a rusqlite::Result.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    /// Check if the database is healthy by executing a simple query.
    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1"))
            .await?;
        debug!("Database health check passed");
        Ok(())
    }

    /// Close the database connection.
    ///
    /// Waits for pending operations, then shuts down the executor thread.
    /// Other clones of this handle fail with a connection error afterwards.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Code store closed");
        Ok(())
    }
}
