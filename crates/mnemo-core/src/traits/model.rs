// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model adapter trait for language model integrations.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, ModelOptions, ModelResponse, StreamDelta};

/// A boxed stream of text increments from a model.
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, MnemoError>> + Send>>;

/// Adapter for language model APIs.
///
/// Supports single-shot completion and streaming. Dropping a [`ModelStream`]
/// must abandon the underlying generation.
#[async_trait]
pub trait ModelAdapter: PluginAdapter {
    /// Sends the ordered messages and returns the full decoded response.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: ModelOptions,
    ) -> Result<ModelResponse, MnemoError>;

    /// Sends the ordered messages and returns a stream of text increments.
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: ModelOptions,
    ) -> Result<ModelStream, MnemoError>;
}
