// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Mnemo.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for
//! conversations, messages, and file records. The vector index tables live in
//! the same database and are driven by `mnemo-index`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod title;

pub use adapter::SqliteStorage;
pub use database::{map_tr_err, Database};
pub use title::DEFAULT_TITLE;
