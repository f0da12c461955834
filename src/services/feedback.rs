// ============================================
// Feedback Pipeline
// ============================================
//
// Turns one like/dislike into a profile update:
// resolve label set -> classify article (cached) -> sparsify -> directional
// gate against the embedding space -> gated update -> persist profile and
// read-history record.
//
// The directional gate zeroes any label whose embedding is not actually
// aligned with the article's embedding, a cross-check between two
// independent signals that keeps the classifier's high scores from updating
// unrelated labels.

use crate::clients::{TextEmbedder, TopicClassifier};
use crate::error::{AppError, Result};
use crate::models::{Feedback, ProfileVector, ReadRecord};
use crate::services::embedding_cache::LabelEmbeddingCache;
use crate::services::learner::{apply_gated_update, GatedParams};
use crate::services::ranking::dot;
use crate::services::score_cache::{sparsify, ScoreCache};
use crate::storage::Storage;
use std::sync::Arc;
use tracing::info;

pub struct FeedbackService {
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn TopicClassifier>,
    embedder: Arc<dyn TextEmbedder>,
    score_cache: Arc<ScoreCache>,
    label_embeddings: Arc<LabelEmbeddingCache>,
    params: GatedParams,
    top_k: usize,
}

impl FeedbackService {
    pub fn new(
        storage: Arc<dyn Storage>,
        classifier: Arc<dyn TopicClassifier>,
        embedder: Arc<dyn TextEmbedder>,
        score_cache: Arc<ScoreCache>,
        label_embeddings: Arc<LabelEmbeddingCache>,
        params: GatedParams,
        top_k: usize,
    ) -> Self {
        Self {
            storage,
            classifier,
            embedder,
            score_cache,
            label_embeddings,
            params,
            top_k,
        }
    }

    /// Apply one feedback event and return the updated profile vector.
    ///
    /// Concurrent feedback for the same (user, label set) is read-modify-
    /// write with last-writer-wins; no transaction spans the update.
    pub async fn apply(
        &self,
        user_id: &str,
        label_set_hash: &str,
        article_id: &str,
        feedback: Feedback,
        alpha_override: Option<f64>,
    ) -> Result<ProfileVector> {
        let labels = self
            .storage
            .get_label_set(label_set_hash)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("unknown label set: {}", label_set_hash))
            })?;

        let article = self
            .storage
            .get_article(article_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown article: {}", article_id)))?;

        // Full scores; the tau gate below decides what counts
        let raw = self
            .score_cache
            .get_or_classify(
                label_set_hash,
                article_id,
                &article.text(),
                &labels,
                true,
                0.0,
                self.classifier.as_ref(),
            )
            .await?;
        let mut scores = sparsify(&raw, self.params.tau, self.top_k);

        // Directional gate: drop labels the embedding space does not back.
        // Label and article vectors are unit norm, so the dot is the cosine.
        let embeddings = self
            .label_embeddings
            .get_or_embed(label_set_hash, &labels, self.embedder.as_ref())
            .await?;
        for label in &labels {
            if let Some(label_vector) = embeddings.vector(label) {
                if dot(label_vector, &article.vector).abs() < self.params.tau {
                    scores.remove(label);
                }
            }
        }

        let current = self
            .storage
            .get_profile(user_id, label_set_hash)
            .await?
            .unwrap_or_default();

        let params = match alpha_override {
            Some(alpha) => self.params.with_alpha(alpha),
            None => self.params,
        };
        let updated = apply_gated_update(&current, &scores, &labels, feedback.sign(), &params);

        self.storage
            .put_profile(user_id, label_set_hash, &updated)
            .await?;
        self.storage
            .record_read(&ReadRecord {
                user_id: user_id.to_string(),
                label_set_hash: label_set_hash.to_string(),
                article_id: article_id.to_string(),
                feedback,
                ts: chrono::Utc::now().timestamp_millis(),
            })
            .await?;

        info!(
            user_id = %user_id,
            label_set_hash = %label_set_hash,
            article_id = %article_id,
            feedback = feedback.as_str(),
            "Profile updated from feedback"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockTextEmbedder, MockTopicClassifier};
    use crate::db::MemoryStorage;
    use crate::models::ArticleEmbedding;
    use crate::storage::{EmbeddingStore, LabelSetStore, ReadHistoryStore};
    use std::collections::HashMap;

    fn labels() -> Vec<String> {
        vec!["Sport".to_string(), "War".to_string()]
    }

    async fn seeded_storage(article_vector: Vec<f32>) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_label_set("hash", &labels()).await.unwrap();
        storage
            .upsert_article(&ArticleEmbedding {
                id: "a1".to_string(),
                title: "Final score".to_string(),
                description: "A match report".to_string(),
                link: "https://news.example/a1".to_string(),
                vector: article_vector,
                updated_at: 0,
            })
            .await
            .unwrap();
        storage
    }

    fn service(storage: Arc<MemoryStorage>) -> FeedbackService {
        let mut classifier = MockTopicClassifier::new();
        classifier.expect_classify().returning(|_, _, _| {
            Ok(HashMap::from([
                ("Sport".to_string(), 0.9),
                ("War".to_string(), 0.05),
            ]))
        });

        let mut embedder = MockTextEmbedder::new();
        embedder.expect_embed().returning(|text| {
            Ok(match text {
                "Sport" => vec![1.0, 0.0],
                _ => vec![0.0, 1.0],
            })
        });

        FeedbackService::new(
            storage.clone(),
            Arc::new(classifier),
            Arc::new(embedder),
            Arc::new(ScoreCache::new(storage, 100)),
            Arc::new(LabelEmbeddingCache::new()),
            GatedParams::default(),
            0,
        )
    }

    #[tokio::test]
    async fn test_like_reinforces_aligned_label() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage.clone());

        let vector = service
            .apply("u1", "hash", "a1", Feedback::Like, None)
            .await
            .unwrap();

        // 0 + 0.1 * 1 * 0.9^2
        assert!((vector["Sport"] - 0.081).abs() < 1e-9);
        // Below-tau score only decays, and 0 stays 0
        assert_eq!(vector["War"], 0.0);

        let reads = storage.list_reads("u1").await.unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].article_id, "a1");
        assert_eq!(reads[0].feedback, Feedback::Like);
    }

    #[tokio::test]
    async fn test_dislike_uses_negative_sign() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage);

        let vector = service
            .apply("u1", "hash", "a1", Feedback::Dislike, None)
            .await
            .unwrap();

        assert!(vector["Sport"] < 0.0);
    }

    #[tokio::test]
    async fn test_directional_gate_blocks_misaligned_label() {
        // Article embedding is orthogonal to the Sport label embedding, so
        // the classifier's 0.9 for Sport must not move the profile
        let storage = seeded_storage(vec![0.0, 1.0]).await;
        let service = service(storage);

        let vector = service
            .apply("u1", "hash", "a1", Feedback::Like, None)
            .await
            .unwrap();

        assert_eq!(vector["Sport"], 0.0);
    }

    #[tokio::test]
    async fn test_alpha_override() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage);

        let vector = service
            .apply("u1", "hash", "a1", Feedback::Like, Some(0.5))
            .await
            .unwrap();

        assert!((vector["Sport"] - 0.5 * 0.81).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resubmitted_feedback_overwrites_history() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage.clone());

        service
            .apply("u1", "hash", "a1", Feedback::Like, None)
            .await
            .unwrap();
        service
            .apply("u1", "hash", "a1", Feedback::Dislike, None)
            .await
            .unwrap();

        let reads = storage.list_reads("u1").await.unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].feedback, Feedback::Dislike);
    }

    #[tokio::test]
    async fn test_unknown_label_set_fails() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage);

        let result = service
            .apply("u1", "missing", "a1", Feedback::Like, None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_article_fails() {
        let storage = seeded_storage(vec![1.0, 0.0]).await;
        let service = service(storage);

        let result = service
            .apply("u1", "hash", "missing", Feedback::Like, None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
