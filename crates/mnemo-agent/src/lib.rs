// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn and stream control for Mnemo chat connections.
//!
//! A [`TurnController`] owns one connection. It:
//! - Receives `user_message` frames and records them
//! - Fuses short-term history with long-term memory and knowledge base hits
//! - Streams the model response back in `stream_chunk` frames
//! - Pings idle clients on a heartbeat
//! - Closes the connection exactly once, on disconnect or shutdown

pub mod controller;
pub mod frames;
pub mod shutdown;
pub mod transport;

pub use controller::{
    ControllerSettings, ControllerState, MAX_PENDING_FRAMES, TurnController, TurnReply,
    TurnServices,
};
pub use frames::{ClientFrame, ServerFrame};
pub use transport::{ChannelClient, ChannelTransport, StreamTransport};
