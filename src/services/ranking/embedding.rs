/// Embedding ranking
///
/// Builds a synthetic user embedding as a weighted sum of the label set's
/// embedding vectors (profile weights when a profile exists, uniform 1.0 at
/// cold start) and dots it against every stored article embedding.
use super::{add_scaled, dot, l2_norm, ExplorationPolicy};
use crate::clients::TextEmbedder;
use crate::error::Result;
use crate::models::{EmbeddingRankedItem, LabelContribution, ProfileVector};
use crate::services::embedding_cache::{LabelEmbeddingCache, LabelEmbeddings};
use crate::storage::Storage;
use std::sync::Arc;
use tracing::debug;

pub struct EmbeddingRanker {
    storage: Arc<dyn Storage>,
    label_cache: Arc<LabelEmbeddingCache>,
    tau: f64,
    exploration: ExplorationPolicy,
}

impl EmbeddingRanker {
    pub fn new(
        storage: Arc<dyn Storage>,
        label_cache: Arc<LabelEmbeddingCache>,
        tau: f64,
        exploration: ExplorationPolicy,
    ) -> Self {
        Self {
            storage,
            label_cache,
            tau,
            exploration,
        }
    }

    /// Rank the full stored article corpus for one user.
    ///
    /// `labels` must already be resolved from the label-set registry.
    pub async fn rank(
        &self,
        user_id: &str,
        label_set_hash: &str,
        labels: &[String],
        topk: usize,
        embedder: &dyn TextEmbedder,
    ) -> Result<Vec<EmbeddingRankedItem>> {
        let profile = self.storage.get_profile(user_id, label_set_hash).await?;
        let embeddings = self
            .label_cache
            .get_or_embed(label_set_hash, labels, embedder)
            .await?;

        let user_vector = build_user_vector(&embeddings, labels, profile.as_ref());

        let read = self.storage.read_article_ids(user_id).await?;
        let articles = self.storage.all_articles().await?;
        let corpus_size = articles.len();

        let mut scored: Vec<EmbeddingRankedItem> = articles
            .into_iter()
            .filter(|article| !read.contains(&article.id))
            .map(|article| {
                let score = dot(&user_vector, &article.vector);
                let explanation =
                    self.explain(&embeddings, labels, profile.as_ref(), &article.vector);

                EmbeddingRankedItem {
                    id: article.id,
                    title: article.title,
                    description: article.description,
                    link: article.link,
                    score,
                    explanation,
                    exploration: false,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            user_id = %user_id,
            label_set_hash = %label_set_hash,
            corpus_size = corpus_size,
            unread = scored.len(),
            cold_start = profile.is_none(),
            "Embedding ranking scored corpus"
        );

        let mut remainder = scored.split_off(topk.min(scored.len()));
        let mut items = scored;

        if !remainder.is_empty() && self.exploration.should_explore() {
            let mut item = remainder.swap_remove(self.exploration.pick(remainder.len()));
            item.exploration = true;

            // Displace the head so the exploration item is guaranteed
            // visibility; result length is unchanged
            if items.is_empty() {
                items.push(item);
            } else {
                items[0] = item;
            }
        }

        Ok(items)
    }

    /// Per-label contribution: raw label/article similarity, gated to 0
    /// below tau, scaled by the preference weight (1.0 at cold start)
    fn explain(
        &self,
        embeddings: &LabelEmbeddings,
        labels: &[String],
        profile: Option<&ProfileVector>,
        article_vector: &[f32],
    ) -> Vec<LabelContribution> {
        let mut explanation: Vec<LabelContribution> = labels
            .iter()
            .filter_map(|label| embeddings.vector(label).map(|v| (label, v)))
            .map(|(label, label_vector)| {
                let sim = dot(label_vector, article_vector);
                let gated = if sim.abs() >= self.tau { sim } else { 0.0 };
                let pref = match profile {
                    Some(p) => p.get(label).copied().unwrap_or(0.0),
                    None => 1.0,
                };

                LabelContribution {
                    label: label.clone(),
                    weight: pref * gated,
                    pref,
                    sim: Some(sim),
                }
            })
            .collect();

        explanation.sort_by(|a, b| {
            b.weight
                .abs()
                .partial_cmp(&a.weight.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });

        explanation
    }
}

/// Weighted sum of label embeddings, L2-normalized (no-op on zero norm)
fn build_user_vector(
    embeddings: &LabelEmbeddings,
    labels: &[String],
    profile: Option<&ProfileVector>,
) -> Vec<f32> {
    let mut user_vector = vec![0.0f32; embeddings.dim()];

    for label in labels {
        let weight = match profile {
            Some(p) => p.get(label).copied().unwrap_or(0.0),
            None => 1.0,
        };
        if weight == 0.0 {
            continue;
        }
        if let Some(vector) = embeddings.vector(label) {
            add_scaled(&mut user_vector, vector, weight);
        }
    }

    let norm = l2_norm(&user_vector);
    if norm > 0.0 {
        for value in &mut user_vector {
            *value = (*value as f64 / norm) as f32;
        }
    }

    user_vector
}
