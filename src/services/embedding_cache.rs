/// Label-embedding cache
///
/// Process-lifetime cache of per-label embedding vectors, keyed by label-set
/// fingerprint. Label text for a fixed fingerprint is immutable, so entries
/// are computed once and never invalidated. Fills are single-flighted per
/// key; an embedder failure aborts the fill and caches nothing.
use crate::clients::TextEmbedder;
use crate::error::Result;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Embeddings for every label of one label set
pub struct LabelEmbeddings {
    pub labels: Vec<String>,
    vectors: HashMap<String, Vec<f32>>,
}

impl LabelEmbeddings {
    pub fn vector(&self, label: &str) -> Option<&[f32]> {
        self.vectors.get(label).map(|v| v.as_slice())
    }

    /// Embedding dimension, taken from the first label
    pub fn dim(&self) -> usize {
        self.labels
            .first()
            .and_then(|l| self.vectors.get(l))
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct LabelEmbeddingCache {
    entries: DashMap<String, Arc<LabelEmbeddings>>,
    flights: DashMap<String, Arc<Mutex<()>>>,
}

impl LabelEmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_embed(
        &self,
        label_set_hash: &str,
        labels: &[String],
        embedder: &dyn TextEmbedder,
    ) -> Result<Arc<LabelEmbeddings>> {
        if let Some(cached) = self.entries.get(label_set_hash) {
            return Ok(cached.clone());
        }

        let flight = self
            .flights
            .entry(label_set_hash.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = flight.lock().await;

        if let Some(cached) = self.entries.get(label_set_hash) {
            return Ok(cached.clone());
        }

        let mut vectors = HashMap::with_capacity(labels.len());
        for label in labels {
            let vector = embedder.embed(label).await?;
            vectors.insert(label.clone(), vector);
        }

        let embeddings = Arc::new(LabelEmbeddings {
            labels: labels.to_vec(),
            vectors,
        });

        debug!(
            label_set_hash = %label_set_hash,
            label_count = labels.len(),
            dim = embeddings.dim(),
            "Label embeddings computed"
        );

        self.entries
            .insert(label_set_hash.to_string(), embeddings.clone());
        self.flights.remove(label_set_hash);

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockTextEmbedder;

    #[tokio::test]
    async fn test_embedded_once_per_label_set() {
        let cache = LabelEmbeddingCache::new();
        let labels = vec!["Sport".to_string(), "War".to_string()];

        let mut embedder = MockTextEmbedder::new();
        embedder
            .expect_embed()
            .times(2) // one call per label, first fill only
            .returning(|_| Ok(vec![1.0, 0.0]));

        let first = cache.get_or_embed("hash", &labels, &embedder).await.unwrap();
        let second = cache.get_or_embed("hash", &labels, &embedder).await.unwrap();

        assert_eq!(first.dim(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.vector("Sport"), Some(&[1.0, 0.0][..]));
    }

    #[tokio::test]
    async fn test_failed_fill_caches_nothing() {
        let cache = LabelEmbeddingCache::new();
        let labels = vec!["Sport".to_string()];

        let mut failing = MockTextEmbedder::new();
        failing
            .expect_embed()
            .times(1)
            .returning(|_| Err(crate::error::AppError::Upstream("down".to_string())));

        assert!(cache.get_or_embed("hash", &labels, &failing).await.is_err());

        let mut working = MockTextEmbedder::new();
        working.expect_embed().times(1).returning(|_| Ok(vec![0.5]));

        let result = cache.get_or_embed("hash", &labels, &working).await.unwrap();
        assert_eq!(result.vector("Sport"), Some(&[0.5][..]));
    }
}
