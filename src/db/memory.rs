/// In-memory storage backend
///
/// Implements every `storage` trait over concurrent maps. Used by tests and
/// by local development without a database.
use crate::error::Result;
use crate::models::{ArticleEmbedding, LabelScores, ProfileVector, ReadRecord};
use crate::storage::{
    EmbeddingStore, LabelSetStore, ProfileStore, ReadHistoryStore, ScoreStore,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Default)]
pub struct MemoryStorage {
    label_sets: DashMap<String, Vec<String>>,
    scores: DashMap<(String, String), LabelScores>,
    profiles: DashMap<(String, String), ProfileVector>,
    read_history: DashMap<(String, String, String), ReadRecord>,
    articles: DashMap<String, ArticleEmbedding>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LabelSetStore for MemoryStorage {
    async fn insert_label_set(&self, hash: &str, labels: &[String]) -> Result<()> {
        self.label_sets
            .entry(hash.to_string())
            .or_insert_with(|| labels.to_vec());
        Ok(())
    }

    async fn get_label_set(&self, hash: &str) -> Result<Option<Vec<String>>> {
        Ok(self.label_sets.get(hash).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl ScoreStore for MemoryStorage {
    async fn get_scores(&self, hash: &str, article_key: &str) -> Result<Option<LabelScores>> {
        Ok(self
            .scores
            .get(&(hash.to_string(), article_key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn put_scores(
        &self,
        hash: &str,
        article_key: &str,
        scores: &LabelScores,
    ) -> Result<()> {
        self.scores
            .insert((hash.to_string(), article_key.to_string()), scores.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStorage {
    async fn get_profile(&self, user_id: &str, hash: &str) -> Result<Option<ProfileVector>> {
        Ok(self
            .profiles
            .get(&(user_id.to_string(), hash.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn put_profile(&self, user_id: &str, hash: &str, vector: &ProfileVector) -> Result<()> {
        self.profiles
            .insert((user_id.to_string(), hash.to_string()), vector.clone());
        Ok(())
    }
}

#[async_trait]
impl ReadHistoryStore for MemoryStorage {
    async fn record_read(&self, record: &ReadRecord) -> Result<()> {
        let key = (
            record.user_id.clone(),
            record.label_set_hash.clone(),
            record.article_id.clone(),
        );
        self.read_history.insert(key, record.clone());
        Ok(())
    }

    async fn read_article_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .read_history
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().article_id.clone())
            .collect())
    }

    async fn list_reads(&self, user_id: &str) -> Result<Vec<ReadRecord>> {
        let mut records: Vec<ReadRecord> = self
            .read_history
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(records)
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStorage {
    async fn get_article(&self, article_id: &str) -> Result<Option<ArticleEmbedding>> {
        Ok(self.articles.get(article_id).map(|entry| entry.value().clone()))
    }

    async fn all_articles(&self) -> Result<Vec<ArticleEmbedding>> {
        let mut articles: Vec<ArticleEmbedding> =
            self.articles.iter().map(|entry| entry.value().clone()).collect();

        // Stable scan order keeps ranking deterministic in tests
        articles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(articles)
    }

    async fn upsert_article(&self, article: &ArticleEmbedding) -> Result<()> {
        self.articles.insert(article.id.clone(), article.clone());
        Ok(())
    }
}
