/// Label-set registry
///
/// Canonicalizes and identifies label collections. A label set's identity is
/// a stable fingerprint, insensitive to ordering, casing, and surrounding
/// whitespace of its labels. Label sets are persisted once and reused.
use crate::error::{AppError, Result};
use crate::storage::Storage;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Hex characters kept from the SHA-256 digest
const FINGERPRINT_LEN: usize = 16;

#[derive(Clone)]
pub struct LabelRegistry {
    storage: Arc<dyn Storage>,
}

impl LabelRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Deterministic fingerprint of a label collection.
    ///
    /// Labels are trimmed, lower-cased, sorted, and joined before hashing,
    /// so `["B", "a"]`, `["a", "B"]`, and `["a", " b "]` all resolve to the
    /// same id.
    pub fn fingerprint(labels: &[String]) -> Result<String> {
        if labels.is_empty() {
            return Err(AppError::BadRequest("labels required".to_string()));
        }

        let mut normalized: Vec<String> = labels
            .iter()
            .map(|l| l.trim().to_lowercase())
            .collect();
        normalized.sort();

        let digest = Sha256::digest(normalized.join("|").as_bytes());
        Ok(hex::encode(digest)[..FINGERPRINT_LEN].to_string())
    }

    /// Persist the fingerprint -> labels mapping if absent; returns the
    /// fingerprint either way
    pub async fn register(&self, labels: &[String]) -> Result<String> {
        let hash = Self::fingerprint(labels)?;
        self.storage.insert_label_set(&hash, labels).await?;

        debug!(label_set_hash = %hash, label_count = labels.len(), "Label set registered");
        Ok(hash)
    }

    /// Look up the labels behind a fingerprint
    pub async fn resolve(&self, hash: &str) -> Result<Vec<String>> {
        self.storage
            .get_label_set(hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown label set: {}", hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fingerprint_normalization() {
        let a = LabelRegistry::fingerprint(&labels(&["B", "a"])).unwrap();
        let b = LabelRegistry::fingerprint(&labels(&["a", "B"])).unwrap();
        let c = LabelRegistry::fingerprint(&labels(&["a", " b "])).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_distinguishes_sets() {
        let a = LabelRegistry::fingerprint(&labels(&["Sport", "War"])).unwrap();
        let b = LabelRegistry::fingerprint(&labels(&["Sport", "Tech"])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_empty_fails() {
        let result = LabelRegistry::fingerprint(&[]);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = LabelRegistry::new(Arc::new(MemoryStorage::new()));
        let set = labels(&["Sport", "War"]);

        let first = registry.register(&set).await.unwrap();
        let second = registry.register(&set).await.unwrap();
        assert_eq!(first, second);

        let resolved = registry.resolve(&first).await.unwrap();
        assert_eq!(resolved, set);
    }

    #[tokio::test]
    async fn test_resolve_unknown_fails() {
        let registry = LabelRegistry::new(Arc::new(MemoryStorage::new()));
        let result = registry.resolve("deadbeefdeadbeef").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
