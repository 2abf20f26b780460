// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and read operations.
//!
//! Sequence numbers come from `conversations.last_sequence`, bumped inside the
//! same transaction as the insert. Because every statement runs on the single
//! writer thread, concurrent appends to one conversation still produce a
//! gapless 1, 2, 3, ... sequence, and cleared sequences are never reused.

use std::str::FromStr;

use mnemo_core::{Message, MnemoError, Role};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::title::{smart_title, DEFAULT_TITLE};

const COLUMNS: &str = "m.id, m.conversation_id, m.role, m.content, m.sequence, m.created_at, m.tool_call";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let role = Role::from_str(&role).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        sequence: row.get(4)?,
        created_at: row.get(5)?,
        tool_call: super::json_column(row, 6)?,
    })
}

/// Append a message to an active conversation.
///
/// The first message of a conversation still carrying [`DEFAULT_TITLE`]
/// also sets a title derived from its content.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    role: Role,
    content: &str,
    tool_call: Option<serde_json::Value>,
) -> Result<Message, MnemoError> {
    let conversation_id = conversation_id.to_string();
    let content = content.to_string();
    let tool_call_json = tool_call.as_ref().map(|v| v.to_string());
    let lookup_id = conversation_id.clone();

    let appended = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let header: Option<(String, i64)> = tx
                .query_row(
                    "SELECT title, last_sequence FROM conversations
                     WHERE id = ?1 AND is_active = 1",
                    params![conversation_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((title, last_sequence)) = header else {
                return Ok(None);
            };

            let now = super::now();
            let message = Message {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id,
                role,
                content,
                sequence: last_sequence + 1,
                created_at: now.clone(),
                tool_call,
            };

            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, tool_call, sequence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.conversation_id,
                    message.role.to_string(),
                    message.content,
                    tool_call_json,
                    message.sequence,
                    message.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_sequence = ?1, updated_at = ?2 WHERE id = ?3",
                params![message.sequence, now, message.conversation_id],
            )?;
            if last_sequence == 0 && title == DEFAULT_TITLE {
                tx.execute(
                    "UPDATE conversations SET title = ?1 WHERE id = ?2",
                    params![smart_title(&message.content), message.conversation_id],
                )?;
            }
            tx.commit()?;
            Ok(Some(message))
        })
        .await
        .map_err(map_tr_err)?;

    appended.ok_or_else(|| MnemoError::not_found("conversation", lookup_id))
}

/// All messages of an active conversation in sequence order.
pub async fn get_messages(db: &Database, conversation_id: &str) -> Result<Vec<Message>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE m.conversation_id = ?1 AND c.is_active = 1
                 ORDER BY m.sequence ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The last `n` messages of an active conversation, oldest first.
pub async fn last_messages(
    db: &Database,
    conversation_id: &str,
    n: usize,
) -> Result<Vec<Message>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    let mut messages: Vec<Message> = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE m.conversation_id = ?1 AND c.is_active = 1
                 ORDER BY m.sequence DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![conversation_id, n], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    messages.reverse();
    Ok(messages)
}

/// Delete every message of an active conversation. The sequence counter is kept.
pub async fn clear_messages(db: &Database, conversation_id: &str) -> Result<bool, MnemoError> {
    let conversation_id = conversation_id.to_string();
    let now = super::now();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2 AND is_active = 1",
                params![now, conversation_id],
            )?;
            if touched == 0 {
                return Ok(false);
            }
            tx.execute(
                "DELETE FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{create_conversation, deactivate, get_conversation};

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = create_conversation(&db, DEFAULT_TITLE, None).await.unwrap();
        (db, conversation.id)
    }

    #[tokio::test]
    async fn append_assigns_gapless_sequence_from_one() {
        let (db, id) = setup().await;
        for (i, role) in [Role::User, Role::Assistant, Role::User].into_iter().enumerate() {
            let msg = append_message(&db, &id, role, &format!("m{i}"), None).await.unwrap();
            assert_eq!(msg.sequence, i as i64 + 1);
        }
        let all = get_messages(&db, &id).await.unwrap();
        let seqs: Vec<i64> = all.iter().map(|m| m.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(all[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn first_message_sets_smart_title() {
        let (db, id) = setup().await;
        append_message(&db, &id, Role::User, "你好", None).await.unwrap();
        append_message(&db, &id, Role::User, "第二条消息不会改标题", None)
            .await
            .unwrap();
        let conversation = get_conversation(&db, &id).await.unwrap().unwrap();
        assert_eq!(conversation.title, "你好");
    }

    #[tokio::test]
    async fn explicit_title_is_kept() {
        let db = Database::open_in_memory().await.unwrap();
        let conversation = create_conversation(&db, "Research", None).await.unwrap();
        append_message(&db, &conversation.id, Role::User, "hello", None)
            .await
            .unwrap();
        let conversation = get_conversation(&db, &conversation.id).await.unwrap().unwrap();
        assert_eq!(conversation.title, "Research");
    }

    #[tokio::test]
    async fn unknown_or_deleted_conversation_is_not_found() {
        let (db, id) = setup().await;
        let err = append_message(&db, "nope", Role::User, "x", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        append_message(&db, &id, Role::User, "x", None).await.unwrap();
        deactivate(&db, &id).await.unwrap();
        assert!(append_message(&db, &id, Role::User, "y", None)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(get_messages(&db, &id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_messages_returns_tail_oldest_first() {
        let (db, id) = setup().await;
        for i in 1..=5 {
            append_message(&db, &id, Role::User, &format!("m{i}"), None)
                .await
                .unwrap();
        }
        let tail = last_messages(&db, &id, 3).await.unwrap();
        let contents: Vec<&str> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);
        assert_eq!(last_messages(&db, &id, 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn clear_keeps_sequence_counter() {
        let (db, id) = setup().await;
        append_message(&db, &id, Role::User, "a", None).await.unwrap();
        append_message(&db, &id, Role::Assistant, "b", None).await.unwrap();
        assert!(clear_messages(&db, &id).await.unwrap());
        assert!(get_messages(&db, &id).await.unwrap().is_empty());

        let next = append_message(&db, &id, Role::User, "c", None).await.unwrap();
        assert_eq!(next.sequence, 3);
        assert!(!clear_messages(&db, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn tool_call_round_trips_as_json() {
        let (db, id) = setup().await;
        let call = serde_json::json!({"name": "search", "args": {"q": "量子"}});
        append_message(&db, &id, Role::Assistant, "", Some(call.clone()))
            .await
            .unwrap();
        let all = get_messages(&db, &id).await.unwrap();
        assert_eq!(all[0].tool_call.as_ref(), Some(&call));
    }
}
