// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. The [`Database`] struct IS the single writer: query modules take
//! `&Database` and run inside `connection().call()`, and the vector index
//! shares the same connection handle. Do NOT open additional connections
//! for writes.

use std::path::Path;

use mnemo_core::MnemoError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the application's SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs, and run migrations.
    pub async fn open(path: &str) -> Result<Self, MnemoError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn).await
    }

    /// Open a private in-memory database. Used by tests and one-shot CLI commands.
    pub async fn open_in_memory() -> Result<Self, MnemoError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, MnemoError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            // journal_mode returns a row, so it cannot go through execute_batch.
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| MnemoError::Storage {
                source: Box::new(e),
            })?;

        debug!("database ready");
        Ok(Self { conn })
    }

    /// The shared single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), MnemoError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert tokio-rusqlite errors to [`MnemoError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MnemoError {
    MnemoError::Storage {
        source: Box::new(e),
    }
}
