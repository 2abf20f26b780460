// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use mnemo_core::{Conversation, MnemoError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const COLUMNS: &str = "id, title, user_id, created_at, updated_at, is_active";

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        is_active: row.get(5)?,
    })
}

/// Create a new active conversation.
pub async fn create_conversation(
    db: &Database,
    title: &str,
    user_id: Option<&str>,
) -> Result<Conversation, MnemoError> {
    let now = super::now();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        user_id: user_id.map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
        is_active: true,
    };
    let row = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, title, user_id, created_at, updated_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                params![row.id, row.title, row.user_id, row.created_at, row.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(conversation)
}

/// Get an active conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1 AND is_active = 1"),
                params![id],
                row_to_conversation,
            );
            match result {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List active conversations, most recently updated first.
pub async fn list_conversations(
    db: &Database,
    limit: usize,
) -> Result<Vec<Conversation>, MnemoError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations WHERE is_active = 1
                 ORDER BY updated_at DESC, created_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_conversation)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Rename an active conversation. Returns `false` if it does not exist.
pub async fn update_title(db: &Database, id: &str, title: &str) -> Result<bool, MnemoError> {
    let id = id.to_string();
    let title = title.to_string();
    let now = super::now();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET title = ?1, updated_at = ?2
                 WHERE id = ?3 AND is_active = 1",
                params![title, now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a conversation. Its messages become invisible with it.
pub async fn deactivate(db: &Database, id: &str) -> Result<bool, MnemoError> {
    let id = id.to_string();
    let now = super::now();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET is_active = 0, updated_at = ?1
                 WHERE id = ?2 AND is_active = 1",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_list_deactivate() {
        let db = Database::open_in_memory().await.unwrap();
        let a = create_conversation(&db, "a", None).await.unwrap();
        let b = create_conversation(&db, "b", Some("alice")).await.unwrap();

        let fetched = get_conversation(&db, &b.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id.as_deref(), Some("alice"));
        assert!(fetched.is_active);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(update_title(&db, &a.id, "renamed").await.unwrap());
        let listed = list_conversations(&db, 100).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id, "most recently updated first");

        assert!(deactivate(&db, &a.id).await.unwrap());
        assert!(!deactivate(&db, &a.id).await.unwrap());
        assert!(get_conversation(&db, &a.id).await.unwrap().is_none());
        assert!(!update_title(&db, &a.id, "x").await.unwrap());
        assert_eq!(list_conversations(&db, 100).await.unwrap().len(), 1);
    }
}
