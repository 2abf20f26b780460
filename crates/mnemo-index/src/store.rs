// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector storage, partitioned by namespace.
//!
//! Embeddings are stored as little-endian f32 BLOBs next to the chunk text.
//! Every statement goes through the shared tokio-rusqlite connection, and
//! each mutating operation is one transaction, so readers observe either
//! the state before or after a mutation and never a partial one.

use mnemo_core::{Chunk, MnemoError};
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use crate::types::{blob_to_vec, content_hash, vec_to_blob, NamespaceInfo, VectorRecord};

/// Helper to convert tokio_rusqlite errors into [`MnemoError::Index`].
fn index_err(e: tokio_rusqlite::Error) -> MnemoError {
    MnemoError::Index {
        source: Box::new(e),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn ensure_namespace(conn: &rusqlite::Connection, namespace: &str, now: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
        params![namespace, now],
    )?;
    Ok(())
}

fn insert_records(
    conn: &rusqlite::Connection,
    namespace: &str,
    records: &[VectorRecord],
    now: &str,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO vectors (id, namespace, source_file, content, content_hash, embedding, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for record in records {
        stmt.execute(params![
            record.id,
            namespace,
            record.chunk.metadata.source_file,
            record.chunk.text,
            content_hash(&record.chunk.text),
            vec_to_blob(&record.embedding),
            now,
        ])?;
    }
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorRecord> {
    let namespace: String = row.get(1)?;
    let source_file: String = row.get(2)?;
    let content: String = row.get(3)?;
    let blob: Vec<u8> = row.get(4)?;
    Ok(VectorRecord {
        id: row.get(0)?,
        embedding: blob_to_vec(&blob),
        chunk: Chunk::new(content, namespace, source_file),
    })
}

/// Persistent vector storage.
#[derive(Clone)]
pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Wrap a connection whose database already carries the vector schema.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Create the namespace if absent. Returns `true` when it was created.
    pub async fn create_namespace(&self, namespace: &str) -> Result<bool, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![namespace, now()],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(index_err)
    }

    pub async fn namespace_exists(&self, namespace: &str) -> Result<bool, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT 1 FROM namespaces WHERE name = ?1",
                        params![namespace],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await
            .map_err(index_err)
    }

    /// All namespaces with their vector counts, by name.
    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>, MnemoError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT n.name, n.created_at, COUNT(v.id)
                     FROM namespaces n LEFT JOIN vectors v ON v.namespace = n.name
                     GROUP BY n.name ORDER BY n.name",
                )?;
                let rows = stmt.query_map([], |row| {
                    let count: i64 = row.get(2)?;
                    Ok(NamespaceInfo {
                        name: row.get(0)?,
                        created_at: row.get(1)?,
                        vectors: usize::try_from(count).unwrap_or_default(),
                    })
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(index_err)
    }

    /// Append records to a namespace, creating the namespace on first use.
    pub async fn insert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let now = now();
                let tx = conn.transaction()?;
                ensure_namespace(&tx, &namespace, &now)?;
                insert_records(&tx, &namespace, &records, &now)?;
                tx.commit()?;
                Ok(records.len())
            })
            .await
            .map_err(index_err)
    }

    /// Atomically drop every record of a namespace and insert `records` in their place.
    pub async fn replace(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let now = now();
                let tx = conn.transaction()?;
                ensure_namespace(&tx, &namespace, &now)?;
                tx.execute("DELETE FROM vectors WHERE namespace = ?1", params![namespace])?;
                insert_records(&tx, &namespace, &records, &now)?;
                tx.commit()?;
                Ok(records.len())
            })
            .await
            .map_err(index_err)
    }

    /// Every record in a namespace, oldest first.
    pub async fn records(&self, namespace: &str) -> Result<Vec<VectorRecord>, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, namespace, source_file, content, embedding
                     FROM vectors WHERE namespace = ?1 ORDER BY rowid",
                )?;
                let rows = stmt.query_map(params![namespace], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(index_err)
    }

    /// Text of every chunk from one source file, in insertion order.
    pub async fn source_texts(&self, namespace: &str, source_file: &str) -> Result<Vec<String>, MnemoError> {
        let namespace = namespace.to_string();
        let source_file = source_file.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT content FROM vectors
                     WHERE namespace = ?1 AND source_file = ?2 ORDER BY rowid",
                )?;
                let rows = stmt.query_map(params![namespace, source_file], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .map_err(index_err)
    }

    /// Delete the records of one source file. Returns how many were removed.
    pub async fn delete_by_source(&self, namespace: &str, source_file: &str) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        let source_file = source_file.to_string();
        self.conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM vectors WHERE namespace = ?1 AND source_file = ?2",
                    params![namespace, source_file],
                )?;
                Ok(removed)
            })
            .await
            .map_err(index_err)
    }

    /// Delete every record of a namespace but keep the namespace itself.
    pub async fn clear(&self, namespace: &str) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let removed =
                    conn.execute("DELETE FROM vectors WHERE namespace = ?1", params![namespace])?;
                Ok(removed)
            })
            .await
            .map_err(index_err)
    }

    /// Remove a namespace and all of its records. Returns `false` if it did not exist.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<bool, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM vectors WHERE namespace = ?1", params![namespace])?;
                let removed = tx.execute("DELETE FROM namespaces WHERE name = ?1", params![namespace])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(index_err)
    }

    /// Move every record of `from` under `to`.
    ///
    /// Returns `Ok(false)` when `from` does not exist or `to` already does.
    pub async fn rename_namespace(&self, from: &str, to: &str) -> Result<bool, MnemoError> {
        let from = from.to_string();
        let to = to.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let created_at: Option<String> = tx
                    .query_row(
                        "SELECT created_at FROM namespaces WHERE name = ?1",
                        params![from],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(created_at) = created_at else {
                    return Ok(false);
                };
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![to, created_at],
                )?;
                if inserted == 0 {
                    return Ok(false);
                }
                tx.execute(
                    "UPDATE vectors SET namespace = ?1 WHERE namespace = ?2",
                    params![to, from],
                )?;
                tx.execute("DELETE FROM namespaces WHERE name = ?1", params![from])?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(index_err)
    }

    /// Number of records in a namespace (0 if it was never created).
    pub async fn count(&self, namespace: &str) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM vectors WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                )?;
                Ok(usize::try_from(n).unwrap_or_default())
            })
            .await
            .map_err(index_err)
    }

    /// Number of records from one source file.
    pub async fn count_by_source(&self, namespace: &str, source_file: &str) -> Result<usize, MnemoError> {
        let namespace = namespace.to_string();
        let source_file = source_file.to_string();
        self.conn
            .call(move |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM vectors WHERE namespace = ?1 AND source_file = ?2",
                    params![namespace, source_file],
                    |row| row.get(0),
                )?;
                Ok(usize::try_from(n).unwrap_or_default())
            })
            .await
            .map_err(index_err)
    }
}
