// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-frame transports the turn controller runs over.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mnemo_core::MnemoError;
use tokio::sync::mpsc;

use crate::frames::ServerFrame;

/// A bidirectional stream of text frames.
#[async_trait]
pub trait StreamTransport: Send {
    /// Next inbound text frame. `None` once the peer has gone away.
    async fn recv(&mut self) -> Option<Result<String, MnemoError>>;

    async fn send(&mut self, text: String) -> Result<(), MnemoError>;

    async fn close(&mut self) -> Result<(), MnemoError>;
}

pub(crate) fn channel_closed() -> MnemoError {
    MnemoError::Channel {
        message: "peer disconnected".into(),
        source: None,
    }
}

/// In-memory transport backed by mpsc channels.
pub struct ChannelTransport {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closes: Arc<AtomicUsize>,
}

impl ChannelTransport {
    /// A transport plus the client end that drives it.
    pub fn pair() -> (Self, ChannelClient) {
        let (in_tx, in_rx) = mpsc::channel(64);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            inbound: in_rx,
            outbound: out_tx,
            closes: closes.clone(),
        };
        let client = ChannelClient {
            sender: Some(in_tx),
            receiver: out_rx,
            pending: String::new(),
            closes,
        };
        (transport, client)
    }
}

#[async_trait]
impl StreamTransport for ChannelTransport {
    async fn recv(&mut self) -> Option<Result<String, MnemoError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, text: String) -> Result<(), MnemoError> {
        self.outbound.send(text).map_err(|_| channel_closed())
    }

    async fn close(&mut self) -> Result<(), MnemoError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inbound.close();
        Ok(())
    }
}

/// The client side of a [`ChannelTransport`].
pub struct ChannelClient {
    sender: Option<mpsc::Sender<String>>,
    receiver: mpsc::UnboundedReceiver<String>,
    pending: String,
    closes: Arc<AtomicUsize>,
}

impl ChannelClient {
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), MnemoError> {
        match &self.sender {
            Some(sender) => sender.send(text.into()).await.map_err(|_| channel_closed()),
            None => Err(channel_closed()),
        }
    }

    pub async fn send_json(&self, value: &serde_json::Value) -> Result<(), MnemoError> {
        self.send_text(value.to_string()).await
    }

    /// Hang up. The controller observes end of stream.
    pub fn disconnect(&mut self) {
        self.sender = None;
    }

    /// Next logical frame, reassembled from wire segments. `None` once the
    /// server side is gone.
    pub async fn next_frame(&mut self) -> Option<ServerFrame> {
        loop {
            let segment = self.receiver.recv().await?;
            self.pending.push_str(&segment);
            if let Ok(frame) = serde_json::from_str::<ServerFrame>(&self.pending) {
                self.pending.clear();
                return Some(frame);
            }
        }
    }

    /// Every remaining frame until the server side is gone.
    pub async fn drain(&mut self) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame().await {
            frames.push(frame);
        }
        frames
    }

    /// Next wire segment, without reassembly.
    pub async fn next_raw(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Raw segments still queued, without reassembly.
    pub fn try_raw(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// How many times the server closed the transport.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}
