// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File record operations. Only `(id, file_name, file_path)` drive ingestion;
//! the JSON columns are opaque analysis payloads.

use mnemo_core::{FileRecord, MnemoError};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        file_name: row.get(2)?,
        file_path: row.get(3)?,
        file_info: super::json_column(row, 4)?,
        analysis_data: super::json_column(row, 5)?,
        insights: super::json_column(row, 6)?,
        created_at: row.get(7)?,
    })
}

/// Record a file. `id` and `created_at` are assigned here.
pub async fn insert_file(
    db: &Database,
    conversation_id: Option<&str>,
    file_name: &str,
    file_path: &str,
    file_info: Option<serde_json::Value>,
) -> Result<FileRecord, MnemoError> {
    let record = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: conversation_id.map(str::to_string),
        file_name: file_name.to_string(),
        file_path: file_path.to_string(),
        file_info,
        analysis_data: None,
        insights: None,
        created_at: super::now(),
    };
    let row = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO files (id, conversation_id, file_name, file_path, file_info, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id,
                    row.conversation_id,
                    row.file_name,
                    row.file_path,
                    row.file_info.as_ref().map(|v| v.to_string()),
                    row.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(record)
}

/// Files attached to a conversation, oldest first.
pub async fn list_files(db: &Database, conversation_id: &str) -> Result<Vec<FileRecord>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, file_name, file_path, file_info, analysis_data, insights, created_at
                 FROM files WHERE conversation_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_file)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// One file record by id.
pub async fn get_file(db: &Database, id: &str) -> Result<Option<FileRecord>, MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, conversation_id, file_name, file_path, file_info, analysis_data, insights, created_at
                 FROM files WHERE id = ?1",
                params![id],
                row_to_file,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a file record. Returns `false` when nothing matched.
pub async fn delete_file(db: &Database, id: &str) -> Result<bool, MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::create_conversation;

    #[tokio::test]
    async fn insert_list_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = create_conversation(&db, "c", None).await.unwrap();
        let info = serde_json::json!({"size": 42, "mime": "text/plain"});
        let record = insert_file(&db, Some(&conversation.id), "notes.txt", "/tmp/notes.txt", Some(info.clone()))
            .await
            .unwrap();

        let listed = list_files(&db, &conversation.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_info.as_ref(), Some(&info));
        assert!(listed[0].analysis_data.is_none());

        let fetched = get_file(&db, &record.id).await.unwrap().unwrap();
        assert_eq!(fetched.file_name, "notes.txt");
        assert_eq!(fetched.conversation_id.as_deref(), Some(conversation.id.as_str()));

        assert!(delete_file(&db, &record.id).await.unwrap());
        assert!(!delete_file(&db, &record.id).await.unwrap());
        assert!(get_file(&db, &record.id).await.unwrap().is_none());
    }
}
