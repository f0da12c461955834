// ============================================
// Ranking Module
// ============================================
//
// Two ranking strategies over a user's preference vector:
// - **Sparse**: dot/cosine between the profile and per-candidate label
//   scores supplied by the caller
// - **Embedding**: a synthetic user embedding dotted against every stored
//   article embedding (full corpus scan; no ANN index, a design limit to
//   revisit if the corpus grows large)
//
// Both exclude already-read articles, explain per-label contributions, fall
// back to cold-start scoring when no profile exists, and occasionally splice
// in a random unseen candidate to gather feedback outside the current
// ranking's bias.

pub mod embedding;
pub mod sparse;

pub use embedding::EmbeddingRanker;
pub use sparse::{SparseCandidate, SparseRanker};

use crate::models::{LabelScores, ProfileVector};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Similarity used by sparse ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    Dot,
    Cosine,
}

/// Abstraction over ambient randomness so tests can force deterministic
/// exploration outcomes
pub trait RandomSource: Send + Sync {
    /// Uniform draw from [0, 1)
    fn roll(&self) -> f64;
    /// Uniform index from 0..n (n > 0)
    fn pick(&self, n: usize) -> usize;
}

pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn roll(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn pick(&self, n: usize) -> usize {
        rand::thread_rng().gen_range(0..n)
    }
}

/// Exploration draw shared by both rankers
#[derive(Clone)]
pub struct ExplorationPolicy {
    probability: f64,
    rng: Arc<dyn RandomSource>,
}

impl ExplorationPolicy {
    pub fn new(probability: f64, rng: Arc<dyn RandomSource>) -> Self {
        Self { probability, rng }
    }

    /// Policy that never explores
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            rng: Arc::new(ThreadRngSource),
        }
    }

    pub fn should_explore(&self) -> bool {
        self.probability > 0.0 && self.rng.roll() < self.probability
    }

    pub fn pick(&self, n: usize) -> usize {
        self.rng.pick(n)
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

pub(crate) fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum::<f64>()
        .sqrt()
}

pub(crate) fn add_scaled(acc: &mut [f32], vector: &[f32], scale: f64) {
    for (a, v) in acc.iter_mut().zip(vector.iter()) {
        *a += (*v as f64 * scale) as f32;
    }
}

/// Cosine similarity between two sparse label->value mappings, treating
/// missing labels as 0. Defined as 0 when either norm is 0.
pub(crate) fn sparse_cosine(a: &ProfileVector, b: &LabelScores) -> f64 {
    let labels: HashSet<&String> = a.keys().chain(b.keys()).collect();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for label in labels {
        let x = a.get(label).copied().unwrap_or(0.0);
        let y = b.get(label).copied().unwrap_or(0.0);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
