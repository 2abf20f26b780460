// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maximal marginal relevance selection.
//!
//! Picks the most query-relevant candidate first, then repeatedly the one
//! maximizing `λ * relevance - (1 - λ) * max_sim_to_selected`, so near-duplicate
//! chunks do not crowd out the rest of the result set.

use crate::types::cosine_similarity;

/// Select up to `k` candidate indices in MMR order.
///
/// Ties go to the lower index, so results are deterministic for a given
/// candidate order.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    // Running max similarity of each candidate to anything selected so far.
    let mut max_sim = vec![f32::NEG_INFINITY; candidates.len()];
    let mut taken = vec![false; candidates.len()];
    let mut selected = Vec::with_capacity(k);

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (i, rel) in relevance.iter().enumerate() {
            if taken[i] {
                continue;
            }
            let score = if selected.is_empty() {
                *rel
            } else {
                lambda * rel - (1.0 - lambda) * max_sim[i]
            };
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        let Some((pick, _)) = best else { break };

        taken[pick] = true;
        selected.push(pick);
        for (i, sim) in max_sim.iter_mut().enumerate() {
            if !taken[i] {
                *sim = sim.max(cosine_similarity(&candidates[pick], &candidates[i]));
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (Vec<f32>, Vec<Vec<f32>>) {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            vec![0.95, 0.31, 0.0],  // relevant
            vec![0.95, 0.30, 0.03], // near-duplicate of 0, slightly more relevant
            vec![0.9, -0.436, 0.0], // relevant from a different direction
        ];
        (query, candidates)
    }

    #[test]
    fn lambda_one_is_pure_relevance() {
        let (query, candidates) = fixtures();
        assert_eq!(maximal_marginal_relevance(&query, &candidates, 2, 1.0), vec![1, 0]);
    }

    #[test]
    fn balanced_lambda_skips_near_duplicates() {
        let (query, candidates) = fixtures();
        assert_eq!(maximal_marginal_relevance(&query, &candidates, 2, 0.5), vec![1, 2]);
    }

    #[test]
    fn k_is_bounded_by_candidates() {
        let (query, candidates) = fixtures();
        let all = maximal_marginal_relevance(&query, &candidates, 10, 0.5);
        assert_eq!(all.len(), 3);
        let mut sorted = all.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 3, "no index selected twice");
        assert!(maximal_marginal_relevance(&query, &[], 3, 0.5).is_empty());
        assert!(maximal_marginal_relevance(&query, &candidates, 0, 0.5).is_empty());
    }
}
