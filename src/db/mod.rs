/// Database access layer
///
/// Postgres repositories implementing the `storage` traits, plus lazy table
/// bootstrap at service startup to unblock environments where migrations
/// have not been applied yet (fresh developer machines or CI spins).
pub mod memory;

use crate::error::Result;
use crate::models::{
    decode_vector, encode_vector, ArticleEmbedding, Feedback, LabelScores, ProfileVector,
    ReadRecord,
};
use crate::storage::{
    EmbeddingStore, LabelSetStore, ProfileStore, ReadHistoryStore, ScoreStore,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::info;

pub use memory::MemoryStorage;

/// Ensure the personalization tables exist
pub async fn ensure_tables(pool: &PgPool) -> Result<()> {
    info!("Ensuring personalization tables exist");

    sqlx::query(LABEL_SETS_TABLE).execute(pool).await?;
    sqlx::query(LABEL_SCORE_CACHE_TABLE).execute(pool).await?;
    sqlx::query(PROFILES_TABLE).execute(pool).await?;
    sqlx::query(READ_HISTORY_TABLE).execute(pool).await?;
    sqlx::query(ARTICLE_EMBEDDINGS_TABLE).execute(pool).await?;

    Ok(())
}

const LABEL_SETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS label_sets (
    label_set_hash TEXT PRIMARY KEY,
    labels_json TEXT NOT NULL
)
"#;

const LABEL_SCORE_CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS label_score_cache (
    label_set_hash TEXT NOT NULL,
    article_key TEXT NOT NULL,
    scores_json TEXT NOT NULL,
    PRIMARY KEY (label_set_hash, article_key)
)
"#;

const PROFILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT NOT NULL,
    label_set_hash TEXT NOT NULL,
    vector_json TEXT NOT NULL,
    PRIMARY KEY (user_id, label_set_hash)
)
"#;

const READ_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS read_history (
    user_id TEXT NOT NULL,
    label_set_hash TEXT NOT NULL,
    article_id TEXT NOT NULL,
    feedback TEXT NOT NULL,
    ts BIGINT NOT NULL,
    PRIMARY KEY (user_id, label_set_hash, article_id)
)
"#;

const ARTICLE_EMBEDDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article_embeddings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    dim INT NOT NULL,
    vector BYTEA NOT NULL,
    updated_at BIGINT NOT NULL
)
"#;

/// Postgres-backed storage
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LabelSetStore for PgStorage {
    async fn insert_label_set(&self, hash: &str, labels: &[String]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO label_sets (label_set_hash, labels_json)
            VALUES ($1, $2)
            ON CONFLICT (label_set_hash) DO NOTHING
            "#,
        )
        .bind(hash)
        .bind(serde_json::to_string(labels)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_label_set(&self, hash: &str) -> Result<Option<Vec<String>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT labels_json FROM label_sets WHERE label_set_hash = $1")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ScoreStore for PgStorage {
    async fn get_scores(&self, hash: &str, article_key: &str) -> Result<Option<LabelScores>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT scores_json FROM label_score_cache
            WHERE label_set_hash = $1 AND article_key = $2
            "#,
        )
        .bind(hash)
        .bind(article_key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_scores(
        &self,
        hash: &str,
        article_key: &str,
        scores: &LabelScores,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO label_score_cache (label_set_hash, article_key, scores_json)
            VALUES ($1, $2, $3)
            ON CONFLICT (label_set_hash, article_key)
            DO UPDATE SET scores_json = EXCLUDED.scores_json
            "#,
        )
        .bind(hash)
        .bind(article_key)
        .bind(serde_json::to_string(scores)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgStorage {
    async fn get_profile(&self, user_id: &str, hash: &str) -> Result<Option<ProfileVector>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT vector_json FROM profiles WHERE user_id = $1 AND label_set_hash = $2",
        )
        .bind(user_id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_profile(&self, user_id: &str, hash: &str, vector: &ProfileVector) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, label_set_hash, vector_json)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, label_set_hash)
            DO UPDATE SET vector_json = EXCLUDED.vector_json
            "#,
        )
        .bind(user_id)
        .bind(hash)
        .bind(serde_json::to_string(vector)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ReadHistoryStore for PgStorage {
    async fn record_read(&self, record: &ReadRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO read_history (user_id, label_set_hash, article_id, feedback, ts)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, label_set_hash, article_id)
            DO UPDATE SET feedback = EXCLUDED.feedback, ts = EXCLUDED.ts
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.label_set_hash)
        .bind(&record.article_id)
        .bind(record.feedback.as_str())
        .bind(record.ts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_article_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT article_id FROM read_history WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_reads(&self, user_id: &str) -> Result<Vec<ReadRecord>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT label_set_hash, article_id, feedback, ts FROM read_history
            WHERE user_id = $1
            ORDER BY ts DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(label_set_hash, article_id, feedback, ts)| {
                Feedback::parse(&feedback).map(|feedback| ReadRecord {
                    user_id: user_id.to_string(),
                    label_set_hash,
                    article_id,
                    feedback,
                    ts,
                })
            })
            .collect())
    }
}

#[async_trait]
impl EmbeddingStore for PgStorage {
    async fn get_article(&self, article_id: &str) -> Result<Option<ArticleEmbedding>> {
        let row: Option<(String, String, String, String, Vec<u8>, i64)> = sqlx::query_as(
            r#"
            SELECT id, title, description, link, vector, updated_at
            FROM article_embeddings WHERE id = $1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, title, description, link, vector, updated_at)| ArticleEmbedding {
            id,
            title,
            description,
            link,
            vector: decode_vector(&vector),
            updated_at,
        }))
    }

    async fn all_articles(&self) -> Result<Vec<ArticleEmbedding>> {
        let rows: Vec<(String, String, String, String, Vec<u8>, i64)> = sqlx::query_as(
            "SELECT id, title, description, link, vector, updated_at FROM article_embeddings",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, description, link, vector, updated_at)| ArticleEmbedding {
                id,
                title,
                description,
                link,
                vector: decode_vector(&vector),
                updated_at,
            })
            .collect())
    }

    async fn upsert_article(&self, article: &ArticleEmbedding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO article_embeddings (id, title, description, link, dim, vector, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                link = EXCLUDED.link,
                dim = EXCLUDED.dim,
                vector = EXCLUDED.vector,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.link)
        .bind(article.vector.len() as i32)
        .bind(encode_vector(&article.vector))
        .bind(article.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
