// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding backends for the vector index.

mod hashing;
#[cfg(feature = "onnx")]
mod onnx;

use std::path::Path;
use std::sync::Arc;

use mnemo_config::model::IndexConfig;
use mnemo_core::{EmbeddingAdapter, MnemoError};

pub use hashing::HashingEmbedder;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Choose the embedder described by the `[index]` section.
///
/// An ONNX model directory takes precedence when the `onnx` feature is
/// compiled in; otherwise the hashing embedder is used.
pub fn from_config(config: &IndexConfig) -> Result<Arc<dyn EmbeddingAdapter>, MnemoError> {
    if let Some(dir) = config.onnx_model_dir.as_deref() {
        return onnx_embedder(Path::new(dir), config.embedding_dimensions);
    }
    Ok(Arc::new(HashingEmbedder::new(config.embedding_dimensions)))
}

#[cfg(feature = "onnx")]
fn onnx_embedder(dir: &Path, dimensions: usize) -> Result<Arc<dyn EmbeddingAdapter>, MnemoError> {
    Ok(Arc::new(OnnxEmbedder::from_dir(dir, dimensions)?))
}

#[cfg(not(feature = "onnx"))]
fn onnx_embedder(dir: &Path, _dimensions: usize) -> Result<Arc<dyn EmbeddingAdapter>, MnemoError> {
    Err(MnemoError::Config(format!(
        "index.onnx_model_dir is set to {} but mnemo was built without the `onnx` feature",
        dir.display()
    )))
}
