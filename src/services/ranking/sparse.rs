/// Sparse label-score ranking
///
/// Ranks caller-supplied candidates (each with a precomputed score mapping)
/// against the user's stored preference vector. Without a stored profile the
/// raw label scores themselves rank the candidates (cold start).
use super::{sparse_cosine, ExplorationPolicy, Similarity};
use crate::error::Result;
use crate::models::{LabelContribution, LabelScores, ProfileVector, SparseRankedItem};
use crate::services::score_cache::sparsify;
use crate::storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One candidate article with its precomputed classification scores
#[derive(Debug, Clone)]
pub struct SparseCandidate {
    pub index: i64,
    pub scores: LabelScores,
}

pub struct SparseRanker {
    storage: Arc<dyn Storage>,
    tau: f64,
    top_k: usize,
    exploration: ExplorationPolicy,
}

impl SparseRanker {
    pub fn new(
        storage: Arc<dyn Storage>,
        tau: f64,
        top_k: usize,
        exploration: ExplorationPolicy,
    ) -> Self {
        Self {
            storage,
            tau,
            top_k,
            exploration,
        }
    }

    pub async fn rank(
        &self,
        user_id: &str,
        label_set_hash: &str,
        candidates: &[SparseCandidate],
        topk: usize,
        similarity: Similarity,
    ) -> Result<Vec<SparseRankedItem>> {
        let profile = self.storage.get_profile(user_id, label_set_hash).await?;
        let read = self.storage.read_article_ids(user_id).await?;

        let pool: Vec<&SparseCandidate> = candidates
            .iter()
            .filter(|c| !read.contains(&c.index.to_string()))
            .collect();

        let mut items: Vec<SparseRankedItem> = pool
            .iter()
            .map(|c| self.score_candidate(c, profile.as_ref(), similarity))
            .collect();

        // Stable sort: ties keep the caller's candidate order
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items.truncate(topk);

        if pool.len() > items.len() && self.exploration.should_explore() {
            let selected: HashSet<i64> = items.iter().map(|item| item.index).collect();
            let remaining: Vec<&&SparseCandidate> = pool
                .iter()
                .filter(|c| !selected.contains(&c.index))
                .collect();

            if !remaining.is_empty() {
                let choice = remaining[self.exploration.pick(remaining.len())];
                let mut item = self.score_candidate(choice, profile.as_ref(), similarity);
                item.exploration = true;

                debug!(
                    user_id = %user_id,
                    index = item.index,
                    "Splicing exploration candidate into first position"
                );

                // Displace the head so the exploration item is guaranteed
                // visibility; result length is unchanged
                if items.is_empty() {
                    items.push(item);
                } else {
                    items[0] = item;
                }
            }
        }

        Ok(items)
    }

    /// Score + explanation for one candidate. Exploration items go through
    /// this same path, so chosen and exploration explanations share one
    /// tau-gating rule.
    fn score_candidate(
        &self,
        candidate: &SparseCandidate,
        profile: Option<&ProfileVector>,
        similarity: Similarity,
    ) -> SparseRankedItem {
        match profile {
            None => {
                let score: f64 = candidate.scores.values().sum();
                let mut explanation: Vec<LabelContribution> = candidate
                    .scores
                    .iter()
                    .map(|(label, value)| LabelContribution {
                        label: label.clone(),
                        weight: *value,
                        pref: 0.0,
                        sim: None,
                    })
                    .collect();
                sort_by_magnitude(&mut explanation);

                SparseRankedItem {
                    index: candidate.index,
                    score,
                    explanation,
                    cold_start: true,
                    exploration: false,
                }
            }
            Some(profile) => {
                let sparse = sparsify(&candidate.scores, self.tau, self.top_k);
                let score = match similarity {
                    Similarity::Dot => sparse
                        .iter()
                        .map(|(label, value)| {
                            profile.get(label).copied().unwrap_or(0.0) * value
                        })
                        .sum(),
                    Similarity::Cosine => sparse_cosine(profile, &sparse),
                };

                let mut explanation: Vec<LabelContribution> = candidate
                    .scores
                    .iter()
                    .map(|(label, value)| {
                        let pref = profile.get(label).copied().unwrap_or(0.0);
                        let gated = if *value >= self.tau { *value } else { 0.0 };
                        LabelContribution {
                            label: label.clone(),
                            weight: pref * gated,
                            pref,
                            sim: None,
                        }
                    })
                    .collect();
                sort_by_magnitude(&mut explanation);

                SparseRankedItem {
                    index: candidate.index,
                    score,
                    explanation,
                    cold_start: false,
                    exploration: false,
                }
            }
        }
    }
}

/// Largest |weight| first; label breaks ties so output is deterministic
fn sort_by_magnitude(explanation: &mut [LabelContribution]) {
    explanation.sort_by(|a, b| {
        b.weight
            .abs()
            .partial_cmp(&a.weight.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
}
