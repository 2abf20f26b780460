// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mnemo integration tests.
//!
//! Provides a mock model and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockModel`] - Mock chat model with scripted replies
//! - [`TestHarness`] - Full store stack on a temp directory
//! - [`RejectingStore`] - Conversation store that fails writes for one role

pub mod harness;
pub mod mock_model;
pub mod store;

pub use harness::{TestHarness, TestHarnessBuilder, conversation_id_of, streamed_text};
pub use mock_model::{DEFAULT_REPLY, MockModel, MockReply};
pub use store::RejectingStore;
