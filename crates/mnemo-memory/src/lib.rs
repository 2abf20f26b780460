// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Mnemo.
//!
//! Every user message and assistant reply is chunked and written into a
//! vector namespace, and each new turn recalls the closest entries. With
//! the default global scope all conversations share one namespace; with
//! conversation scope each conversation gets `ltm_{id}`. Entries are never
//! deleted.

pub mod memory;

pub use memory::LongTermMemory;
