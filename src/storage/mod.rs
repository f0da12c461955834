// ============================================
// Storage Interfaces
// ============================================
//
// Narrow interfaces over the persistent relational store. The persistent
// store is the source of truth; the in-process caches in `services` sit in
// front of it. Every table is queried by exact key.

use crate::error::Result;
use crate::models::{ArticleEmbedding, LabelScores, ProfileVector, ReadRecord};
use async_trait::async_trait;
use std::collections::HashSet;

/// Persisted fingerprint -> labels mapping
#[async_trait]
pub trait LabelSetStore: Send + Sync {
    /// Idempotent insert-if-missing
    async fn insert_label_set(&self, hash: &str, labels: &[String]) -> Result<()>;
    async fn get_label_set(&self, hash: &str) -> Result<Option<Vec<String>>>;
}

/// Persistent tier of the classification-score cache.
/// Writes are upserts; concurrent writers race with last-writer-wins.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get_scores(&self, hash: &str, article_key: &str) -> Result<Option<LabelScores>>;
    async fn put_scores(&self, hash: &str, article_key: &str, scores: &LabelScores)
        -> Result<()>;
}

/// Persisted per-(user, label set) preference vectors
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str, hash: &str) -> Result<Option<ProfileVector>>;
    async fn put_profile(&self, user_id: &str, hash: &str, vector: &ProfileVector)
        -> Result<()>;
}

/// Append/overwrite feedback log, doubling as the ranking exclusion set
#[async_trait]
pub trait ReadHistoryStore: Send + Sync {
    /// Upsert by (user_id, label_set_hash, article_id); re-submitting the
    /// same feedback overwrites rather than duplicates
    async fn record_read(&self, record: &ReadRecord) -> Result<()>;
    /// All article ids the user has given feedback on, across label sets
    async fn read_article_ids(&self, user_id: &str) -> Result<HashSet<String>>;
    /// Full history for a user, newest first
    async fn list_reads(&self, user_id: &str) -> Result<Vec<ReadRecord>>;
}

/// Read access to persisted article embeddings. The write path belongs to
/// ingestion; `upsert_article` is the seam it (and test fixtures) use.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn get_article(&self, article_id: &str) -> Result<Option<ArticleEmbedding>>;
    /// Full corpus scan, used by embedding ranking
    async fn all_articles(&self) -> Result<Vec<ArticleEmbedding>>;
    async fn upsert_article(&self, article: &ArticleEmbedding) -> Result<()>;
}

/// Everything the personalization core needs from the relational store
pub trait Storage:
    LabelSetStore + ScoreStore + ProfileStore + ReadHistoryStore + EmbeddingStore
{
}

impl<T> Storage for T where
    T: LabelSetStore + ScoreStore + ProfileStore + ReadHistoryStore + EmbeddingStore
{
}
