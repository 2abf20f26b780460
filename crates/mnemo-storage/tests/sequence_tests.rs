// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence numbering under sequential and concurrent appends.

use std::sync::Arc;

use mnemo_config::model::StorageConfig;
use mnemo_core::{ConversationStore, Role, StorageAdapter};
use mnemo_storage::SqliteStorage;
use proptest::prelude::*;

async fn open_store(dir: &tempfile::TempDir) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("seq.db").display().to_string(),
    });
    storage.initialize().await.unwrap();
    Arc::new(storage)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_are_gapless() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let conversation = store.create_conversation(None).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        let id = conversation.id.clone();
        handles.push(tokio::spawn(async move {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.add_message(&id, role, &format!("msg {i}")).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let sequences: Vec<i64> = store
        .get_messages(&conversation.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.sequence)
        .collect();
    assert_eq!(sequences, (1..=40).collect::<Vec<i64>>());
}

#[tokio::test]
async fn conversations_number_independently() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let a = store.create_conversation(None).await.unwrap();
    let b = store.create_conversation(None).await.unwrap();

    store.add_message(&a.id, Role::User, "a1").await.unwrap();
    store.add_message(&b.id, Role::User, "b1").await.unwrap();
    let a2 = store.add_message(&a.id, Role::Assistant, "a2").await.unwrap();
    let b2 = store.add_message(&b.id, Role::Assistant, "b2").await.unwrap();
    assert_eq!((a2.sequence, b2.sequence), (2, 2));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn interleaved_appends_stay_strictly_increasing(plan in prop::collection::vec(0usize..3, 1..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = open_store(&dir).await;
            let mut ids = Vec::new();
            for _ in 0..3 {
                ids.push(store.create_conversation(None).await.unwrap().id);
            }
            for (step, target) in plan.iter().enumerate() {
                store.add_message(&ids[*target], Role::User, &format!("s{step}")).await.unwrap();
            }
            for (target, id) in ids.iter().enumerate() {
                let expected = plan.iter().filter(|t| **t == target).count() as i64;
                let seqs: Vec<i64> = store.get_messages(id).await.unwrap().iter().map(|m| m.sequence).collect();
                prop_assert_eq!(seqs, (1..=expected).collect::<Vec<i64>>());
            }
            Ok(())
        })?;
    }
}
