/// Profile operations: migration between label sets, interaction-based
/// seeding, and the user's read history view.
use crate::error::Result;
use crate::models::{Feedback, ProfileVector};
use crate::services::label_registry::LabelRegistry;
use crate::services::learner::{aggregate_interactions, AggregationMethod, Interaction};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// One read-history entry joined with its article metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReadListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub feedback: Feedback,
    pub ts: i64,
}

#[derive(Clone)]
pub struct ProfileService {
    storage: Arc<dyn Storage>,
}

impl ProfileService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Carry a profile forward onto a new label set: weights are kept for
    /// labels present in both, labels new to the destination start at 0,
    /// dropped labels are discarded. The destination set is registered if
    /// unseen. Pure over stored state; no classifier or embedder calls.
    pub async fn migrate(
        &self,
        user_id: &str,
        from_hash: Option<&str>,
        to_labels: &[String],
    ) -> Result<(String, ProfileVector)> {
        let to_hash = LabelRegistry::fingerprint(to_labels)?;
        self.storage.insert_label_set(&to_hash, to_labels).await?;

        let old = match from_hash {
            Some(hash) => self
                .storage
                .get_profile(user_id, hash)
                .await?
                .unwrap_or_default(),
            None => ProfileVector::default(),
        };

        let vector: ProfileVector = to_labels
            .iter()
            .map(|label| (label.clone(), old.get(label).copied().unwrap_or(0.0)))
            .collect();

        self.storage.put_profile(user_id, &to_hash, &vector).await?;

        info!(
            user_id = %user_id,
            to_label_set_hash = %to_hash,
            carried = vector.values().filter(|w| **w != 0.0).count(),
            "Profile migrated"
        );

        Ok((to_hash, vector))
    }

    /// Seed (overwrite) a profile from weighted interaction score vectors,
    /// an alternative cold-start path independent of the gated learner
    pub async fn seed_from_interactions(
        &self,
        user_id: &str,
        label_set_hash: &str,
        interactions: &[Interaction],
        method: AggregationMethod,
    ) -> Result<ProfileVector> {
        let vector = aggregate_interactions(interactions, method);
        self.storage
            .put_profile(user_id, label_set_hash, &vector)
            .await?;
        Ok(vector)
    }

    /// The user's feedback history, newest first, joined with article
    /// metadata. Records whose article has vanished are skipped.
    pub async fn read_list(&self, user_id: &str) -> Result<Vec<ReadListItem>> {
        let records = self.storage.list_reads(user_id).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            if let Some(article) = self.storage.get_article(&record.article_id).await? {
                items.push(ReadListItem {
                    id: article.id,
                    title: article.title,
                    description: article.description,
                    link: article.link,
                    feedback: record.feedback,
                    ts: record.ts,
                });
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;
    use crate::models::{ArticleEmbedding, LabelScores, ReadRecord};
    use crate::storage::{EmbeddingStore, LabelSetStore, ProfileStore, ReadHistoryStore};
    use std::collections::HashMap;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_migrate_keeps_intersection_drops_rest() {
        let storage = Arc::new(MemoryStorage::new());
        let from_labels = labels(&["Sport", "War"]);
        let from_hash = LabelRegistry::fingerprint(&from_labels).unwrap();
        storage
            .insert_label_set(&from_hash, &from_labels)
            .await
            .unwrap();

        let profile: ProfileVector =
            HashMap::from([("Sport".to_string(), 0.4), ("War".to_string(), -0.2)]);
        storage
            .put_profile("u1", &from_hash, &profile)
            .await
            .unwrap();

        let service = ProfileService::new(storage.clone());
        let to_labels = labels(&["Sport", "Tech"]);
        let (to_hash, vector) = service
            .migrate("u1", Some(&from_hash), &to_labels)
            .await
            .unwrap();

        assert_eq!(vector.len(), 2);
        assert_eq!(vector["Sport"], 0.4);
        assert_eq!(vector["Tech"], 0.0);
        assert!(!vector.contains_key("War"));

        // Destination set registered, profile persisted
        assert_eq!(
            storage.get_label_set(&to_hash).await.unwrap().unwrap(),
            to_labels
        );
        assert_eq!(
            storage.get_profile("u1", &to_hash).await.unwrap().unwrap(),
            vector
        );
    }

    #[tokio::test]
    async fn test_migrate_without_source_starts_at_zero() {
        let storage = Arc::new(MemoryStorage::new());
        let service = ProfileService::new(storage);

        let (_, vector) = service
            .migrate("u1", None, &labels(&["Sport", "Tech"]))
            .await
            .unwrap();

        assert!(vector.values().all(|w| *w == 0.0));
    }

    #[tokio::test]
    async fn test_seed_overwrites_profile() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put_profile(
                "u1",
                "hash",
                &HashMap::from([("Old".to_string(), 0.9)]),
            )
            .await
            .unwrap();

        let service = ProfileService::new(storage.clone());
        let interactions = vec![Interaction {
            scores: LabelScores::from([("Sport".to_string(), 0.5)]),
            weight: 2.0,
        }];

        let vector = service
            .seed_from_interactions("u1", "hash", &interactions, AggregationMethod::Sum)
            .await
            .unwrap();

        assert_eq!(vector["Sport"], 1.0);
        let stored = storage.get_profile("u1", "hash").await.unwrap().unwrap();
        assert!(!stored.contains_key("Old"));
    }

    #[tokio::test]
    async fn test_read_list_newest_first_skips_vanished() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .upsert_article(&ArticleEmbedding {
                id: "a1".to_string(),
                title: "first".to_string(),
                description: String::new(),
                link: String::new(),
                vector: vec![1.0],
                updated_at: 0,
            })
            .await
            .unwrap();
        storage
            .upsert_article(&ArticleEmbedding {
                id: "a2".to_string(),
                title: "second".to_string(),
                description: String::new(),
                link: String::new(),
                vector: vec![1.0],
                updated_at: 0,
            })
            .await
            .unwrap();

        for (article_id, ts) in [("a1", 100), ("a2", 200), ("ghost", 300)] {
            storage
                .record_read(&ReadRecord {
                    user_id: "u1".to_string(),
                    label_set_hash: "hash".to_string(),
                    article_id: article_id.to_string(),
                    feedback: Feedback::Like,
                    ts,
                })
                .await
                .unwrap();
        }

        let service = ProfileService::new(storage);
        let items = service.read_list("u1").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a2");
        assert_eq!(items[1].id, "a1");
    }
}
