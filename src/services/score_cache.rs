// ============================================
// Classification Score Cache
// ============================================
//
// Two-tier memoization of classifier output per (label set, article):
// an in-process bounded map in front of the persistent store. Cache fills
// are single-flighted per key so concurrent misses invoke the external
// classifier once. Persistent writes are last-writer-wins.

use crate::clients::TopicClassifier;
use crate::error::Result;
use crate::models::LabelScores;
use crate::storage::Storage;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type CacheKey = (String, String);

pub struct ScoreCache {
    storage: Arc<dyn Storage>,
    entries: DashMap<CacheKey, LabelScores>,
    capacity: usize,
    flights: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl ScoreCache {
    pub fn new(storage: Arc<dyn Storage>, capacity: usize) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            capacity: capacity.max(1),
            flights: DashMap::new(),
        }
    }

    /// Memoized classification of one article against one label set.
    ///
    /// Checks the in-process tier, then the persistent store, and only on a
    /// true miss invokes the classifier; results are filtered to
    /// `score >= min_score` at write time and written through both tiers.
    /// Once computed, the mapping for a key is stable across calls.
    pub async fn get_or_classify(
        &self,
        label_set_hash: &str,
        article_key: &str,
        text: &str,
        labels: &[String],
        multi_label: bool,
        min_score: f64,
        classifier: &dyn TopicClassifier,
    ) -> Result<LabelScores> {
        let key = (label_set_hash.to_string(), article_key.to_string());

        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        // Single-flight: one fill per key at a time
        let flight = self
            .flights
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = flight.lock().await;

        // A concurrent fill may have landed while we waited
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        if let Some(stored) = self.storage.get_scores(label_set_hash, article_key).await? {
            self.insert_local(key.clone(), stored.clone());
            self.flights.remove(&key);
            return Ok(stored);
        }

        let raw = classifier.classify(text, labels, multi_label).await?;
        let scores: LabelScores = raw
            .into_iter()
            .filter(|(_, score)| *score >= min_score)
            .collect();

        debug!(
            label_set_hash = %label_set_hash,
            article_key = %article_key,
            kept = scores.len(),
            "Classified article on cache miss"
        );

        self.storage
            .put_scores(label_set_hash, article_key, &scores)
            .await?;
        self.insert_local(key.clone(), scores.clone());
        self.flights.remove(&key);

        Ok(scores)
    }

    fn insert_local(&self, key: CacheKey, scores: LabelScores) {
        if self.entries.len() >= self.capacity {
            self.evict_batch();
        }
        self.entries.insert(key, scores);
    }

    /// Drop a batch of arbitrary entries when the cap is hit; the persistent
    /// tier still holds everything evicted here
    fn evict_batch(&self) {
        let batch = (self.capacity / 8).max(1);
        let victims: Vec<CacheKey> = self
            .entries
            .iter()
            .take(batch)
            .map(|entry| entry.key().clone())
            .collect();

        for key in victims {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reduce a score mapping to its significant entries: drop `|score| < tau`,
/// then keep only the `top_k` largest magnitudes when `top_k > 0`. Ties are
/// broken by label so the result is deterministic for a fixed input.
/// Applying `sparsify` twice is a no-op.
pub fn sparsify(scores: &LabelScores, tau: f64, top_k: usize) -> LabelScores {
    let mut entries: Vec<(&String, f64)> = scores
        .iter()
        .map(|(label, score)| (label, *score))
        .filter(|(_, score)| score.abs() >= tau)
        .collect();

    if top_k > 0 && entries.len() > top_k {
        entries.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        entries.truncate(top_k);
    }

    entries
        .into_iter()
        .map(|(label, score)| (label.clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockTopicClassifier;
    use crate::db::MemoryStorage;
    use crate::storage::ScoreStore;
    use std::collections::HashMap;

    fn scores(pairs: &[(&str, f64)]) -> LabelScores {
        pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
    }

    #[test]
    fn test_sparsify_threshold() {
        let input = scores(&[("a", 0.9), ("b", 0.05)]);
        let output = sparsify(&input, 0.1, 0);
        assert_eq!(output, scores(&[("a", 0.9)]));
    }

    #[test]
    fn test_sparsify_top_k() {
        let input = scores(&[("a", 0.9), ("b", 0.5), ("c", -0.7)]);
        let output = sparsify(&input, 0.1, 2);

        assert_eq!(output.len(), 2);
        assert!(output.contains_key("a"));
        assert!(output.contains_key("c"));
    }

    #[test]
    fn test_sparsify_idempotent() {
        let input = scores(&[("a", 0.9), ("b", 0.05), ("c", 0.4)]);
        let once = sparsify(&input, 0.1, 2);
        let twice = sparsify(&once, 0.1, 2);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_classifier_invoked_once_per_key() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ScoreCache::new(storage, 100);

        let mut classifier = MockTopicClassifier::new();
        classifier
            .expect_classify()
            .times(1)
            .returning(|_, _, _| Ok(HashMap::from([("Sport".to_string(), 0.8)])));

        let labels = vec!["Sport".to_string()];
        let first = cache
            .get_or_classify("hash", "0", "text", &labels, true, 0.05, &classifier)
            .await
            .unwrap();
        let second = cache
            .get_or_classify("hash", "0", "text", &labels, true, 0.05, &classifier)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.get("Sport"), Some(&0.8));
    }

    #[tokio::test]
    async fn test_min_score_filter_applied_at_write() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ScoreCache::new(storage.clone(), 100);

        let mut classifier = MockTopicClassifier::new();
        classifier.expect_classify().times(1).returning(|_, _, _| {
            Ok(HashMap::from([
                ("Sport".to_string(), 0.8),
                ("War".to_string(), 0.01),
            ]))
        });

        let labels = vec!["Sport".to_string(), "War".to_string()];
        let result = cache
            .get_or_classify("hash", "0", "text", &labels, true, 0.05, &classifier)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains_key("Sport"));

        // The filtered mapping is what the persistent tier holds
        let stored = storage.get_scores("hash", "0").await.unwrap().unwrap();
        assert_eq!(stored, result);
    }

    #[tokio::test]
    async fn test_persistent_tier_hit_skips_classifier() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put_scores("hash", "7", &scores(&[("Sport", 0.6)]))
            .await
            .unwrap();

        let cache = ScoreCache::new(storage, 100);
        let classifier = MockTopicClassifier::new(); // no expectations: must not be called

        let labels = vec!["Sport".to_string()];
        let result = cache
            .get_or_classify("hash", "7", "text", &labels, true, 0.05, &classifier)
            .await
            .unwrap();

        assert_eq!(result.get("Sport"), Some(&0.6));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ScoreCache::new(storage, 4);

        let mut classifier = MockTopicClassifier::new();
        classifier
            .expect_classify()
            .returning(|_, _, _| Ok(HashMap::from([("Sport".to_string(), 0.8)])));

        let labels = vec!["Sport".to_string()];
        for i in 0..10 {
            cache
                .get_or_classify("hash", &i.to_string(), "text", &labels, true, 0.05, &classifier)
                .await
                .unwrap();
        }

        assert!(cache.len() <= 4);
    }
}
