// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction adapter trait for turning source files into text.

use std::path::Path;

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ExtractedDocument;

/// Adapter for format-specific text extraction (plain text, PDF, DOCX, ...).
#[async_trait]
pub trait ExtractionAdapter: PluginAdapter {
    /// Whether this adapter understands the file at `path` (usually by extension).
    fn supports(&self, path: &Path) -> bool;

    /// Extracts text and structured sections from the file at `path`.
    ///
    /// Returns [`MnemoError::Extraction`] for unreadable or unsupported sources.
    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, MnemoError>;
}
