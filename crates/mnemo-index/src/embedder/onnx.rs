// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local sentence embeddings through ONNX Runtime.
//!
//! Expects a sentence-transformer export (`model.onnx` plus `tokenizer.json`)
//! in one directory. Inference is CPU-only and single-threaded.

use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use mnemo_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, MnemoError,
    PluginAdapter,
};

use super::l2_normalize;

fn embed_err(context: &str, e: impl Display) -> MnemoError {
    MnemoError::Internal(format!("{context}: {e}"))
}

/// Embedder backed by an ONNX sentence-transformer model.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `dir`.
    ///
    /// `dimensions` is the hidden size the model produces; a mismatch is
    /// reported on the first embedding call.
    pub fn from_dir(dir: &Path, dimensions: usize) -> Result<Self, MnemoError> {
        let tokenizer_path = dir.join("tokenizer.json");
        let model_path = dir.join("model.onnx");

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embed_err(&format!("load tokenizer {}", tokenizer_path.display()), e))?;

        let session = Session::builder()
            .map_err(|e| embed_err("create onnx session", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| embed_err("set optimization level", e))?
            .with_intra_threads(1)
            .map_err(|e| embed_err("set intra threads", e))?
            .commit_from_file(&model_path)
            .map_err(|e| embed_err(&format!("load model {}", model_path.display()), e))?;

        tracing::info!(dir = %dir.display(), dimensions, "onnx embedder loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_err("tokenize", e))?;

        let widen = |xs: &[u32]| xs.iter().map(|&x| i64::from(x)).collect::<Vec<i64>>();
        let ids = widen(encoding.get_ids());
        let mask = widen(encoding.get_attention_mask());
        let type_ids = widen(encoding.get_type_ids());
        let seq_len = ids.len();

        let to_array = |v: Vec<i64>| {
            Array2::from_shape_vec((1, seq_len), v).map_err(|e| embed_err("shape input", e))
        };
        let ids = to_array(ids)?;
        let mask_array = to_array(mask.clone())?;
        let type_ids = to_array(type_ids)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embed_err("lock onnx session", e))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => TensorRef::from_array_view(&ids).map_err(|e| embed_err("bind input_ids", e))?,
                "attention_mask" => TensorRef::from_array_view(&mask_array).map_err(|e| embed_err("bind attention_mask", e))?,
                "token_type_ids" => TensorRef::from_array_view(&type_ids).map_err(|e| embed_err("bind token_type_ids", e))?
            ])
            .map_err(|e| embed_err("onnx inference", e))?;

        // [1, seq_len, hidden]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embed_err("read output tensor", e))?;
        let hidden = shape.last().map(|&h| h as usize).unwrap_or_default();
        if hidden != self.dimensions {
            return Err(MnemoError::Internal(format!(
                "model produces {hidden}-dimensional vectors, index expects {}",
                self.dimensions
            )));
        }

        let mut pooled = masked_mean(data, &mask, hidden);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

/// Mean of the token vectors whose attention mask is set.
fn masked_mean(tokens: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut used = 0usize;
    for (row, _) in tokens
        .chunks_exact(hidden)
        .zip(mask)
        .filter(|(_, m)| **m > 0)
    {
        for (acc, v) in sum.iter_mut().zip(row) {
            *acc += v;
        }
        used += 1;
    }
    if used > 0 {
        let n = used as f32;
        sum.iter_mut().for_each(|v| *v /= n);
    }
    sum
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        match self.session.lock() {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("session lock poisoned: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let embeddings = input
            .texts
            .iter()
            .map(|text| self.embed_one(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_mean_skips_padding() {
        let tokens = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        assert_eq!(masked_mean(&tokens, &[0, 1], 3), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn masked_mean_averages_all_tokens() {
        let tokens = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mean = masked_mean(&tokens, &[1, 1, 1], 2);
        assert!((mean[0] - 3.0).abs() < f32::EPSILON);
        assert!((mean[1] - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_model_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OnnxEmbedder::from_dir(dir.path(), 384).is_err());
    }
}
