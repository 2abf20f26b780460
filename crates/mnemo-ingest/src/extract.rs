// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in extraction for UTF-8 text formats.

use std::path::Path;

use async_trait::async_trait;

use mnemo_core::{
    AdapterType, ExtractedDocument, ExtractedTable, ExtractionAdapter, HealthStatus, MnemoError,
    PluginAdapter,
};

/// Extensions handled by [`PlainTextExtractor`], lowercase without the dot.
pub const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json", "log"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Reads plain text, markdown, CSV, JSON, and log files.
///
/// Paragraphs are split on blank lines. CSV files additionally yield one
/// table with every record as a row.
#[derive(Debug, Default, Clone)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    text.replace('\r', "")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn csv_table(text: &str) -> Result<ExtractedTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(ExtractedTable { rows })
}

#[async_trait]
impl PluginAdapter for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl ExtractionAdapter for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| PLAIN_TEXT_EXTENSIONS.contains(&ext.as_str()))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, MnemoError> {
        if !self.supports(path) {
            return Err(MnemoError::Extraction {
                message: format!("unsupported file format: {}", path.display()),
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(|e| MnemoError::Extraction {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let text = String::from_utf8(bytes).map_err(|_| MnemoError::Extraction {
            message: format!("{} is not valid UTF-8", path.display()),
        })?;

        let mut doc = ExtractedDocument {
            paragraphs: paragraphs(&text),
            full_text: text,
            ..Default::default()
        };
        if extension(path).as_deref() == Some("csv") {
            match csv_table(&doc.full_text) {
                Ok(table) if !table.rows.is_empty() => doc.tables.push(table),
                Ok(_) => {}
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "csv table parse failed"),
            }
        }
        Ok(doc)
    }
}
