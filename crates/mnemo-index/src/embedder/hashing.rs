// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency-free embedder based on character n-gram feature hashing.
//!
//! Each text is mapped to a fixed-size vector by hashing its character
//! unigrams and bigrams into buckets with a sign bit, then L2-normalizing.
//! Texts sharing many characters end up with high cosine similarity, which
//! is enough for lexical retrieval over CJK and Latin text alike.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use mnemo_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, MnemoError,
    PluginAdapter,
};

use super::l2_normalize;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text. Deterministic across processes and platforms.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        let chars: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        let mut buf = [0u8; 8];
        for (i, c) in chars.iter().enumerate() {
            self.add_feature(&mut v, c.encode_utf8(&mut buf).as_bytes(), 1.0);
            if let Some(next) = chars.get(i + 1) {
                let gram: String = [*c, *next].iter().collect();
                self.add_feature(&mut v, gram.as_bytes(), 1.5);
            }
        }

        l2_normalize(&mut v);
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        let h = u64::from_le_bytes(word);
        let bucket = (h % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.embed_text(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cosine_similarity;

    #[test]
    fn vectors_have_configured_length_and_unit_norm() {
        let e = HashingEmbedder::new(64);
        let v = e.embed_text("向量检索");
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn deterministic() {
        let e = HashingEmbedder::new(128);
        assert_eq!(e.embed_text("hello world"), e.embed_text("hello world"));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_text("   ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn similar_texts_score_higher() {
        let e = HashingEmbedder::new(384);
        let q = e.embed_text("量子计算的基本原理");
        let near = e.embed_text("量子计算依赖叠加原理");
        let far = e.embed_text("今天的天气非常晴朗");
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let e = HashingEmbedder::new(32);
        let out = e
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 32);
        assert_eq!(out.embeddings[0], e.embed_text("a"));
        assert_eq!(out.embeddings[1], e.embed_text("b"));
    }
}
