// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for Mnemo.
//!
//! `GET /ws` upgrades to a WebSocket driven by a turn controller; the REST
//! routes expose conversations, conversation files, non-streaming chat and
//! knowledge base management over the same stores. Errors map onto status codes: not found is 404, invalid input is
//! 400, everything else 500.

pub mod error;
pub mod files;
pub mod handlers;
pub mod kb;
pub mod server;
pub mod ws;

pub use error::{ApiError, ErrorResponse};
pub use files::{ConversationFiles, FileUploadResponse};
pub use server::{GatewayState, HealthState, router, serve, start_server};
pub use ws::WsTransport;
