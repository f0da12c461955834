/// Ranking endpoints
use super::PersonalizationState;
use crate::error::{AppError, Result};
use crate::models::LabelScores;
use crate::services::{Similarity, SparseCandidate};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RankSparseRequest {
    pub user_id: String,
    #[serde(rename = "labelSetHash")]
    pub label_set_hash: String,
    pub candidates: Vec<CandidateBody>,
    pub topk: Option<usize>,
    #[serde(default = "default_similarity")]
    pub similarity: Similarity,
}

#[derive(Debug, Deserialize)]
pub struct CandidateBody {
    pub index: i64,
    #[serde(default)]
    pub scores: LabelScores,
}

fn default_similarity() -> Similarity {
    Similarity::Dot
}

/// Rank caller-supplied candidates against the user's profile
pub async fn rank_sparse(
    state: web::Data<PersonalizationState>,
    req: web::Json<RankSparseRequest>,
) -> Result<HttpResponse> {
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }
    if req.label_set_hash.is_empty() {
        return Err(AppError::BadRequest("labelSetHash required".to_string()));
    }

    let candidates: Vec<SparseCandidate> = req
        .candidates
        .iter()
        .map(|body| SparseCandidate {
            index: body.index,
            scores: body.scores.clone(),
        })
        .collect();

    let items = state
        .sparse_ranker
        .rank(
            &req.user_id,
            &req.label_set_hash,
            &candidates,
            req.topk.unwrap_or(state.default_topk),
            req.similarity,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "items": items })))
}

#[derive(Debug, Deserialize)]
pub struct RankEmbeddingsRequest {
    pub user_id: String,
    #[serde(rename = "labelSetHash")]
    pub label_set_hash: String,
    pub topk: Option<usize>,
}

/// Rank the full stored article corpus via embeddings
pub async fn rank_embeddings(
    state: web::Data<PersonalizationState>,
    req: web::Json<RankEmbeddingsRequest>,
) -> Result<HttpResponse> {
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }

    let labels = state.registry.resolve(&req.label_set_hash).await?;

    let items = state
        .embedding_ranker
        .rank(
            &req.user_id,
            &req.label_set_hash,
            &labels,
            req.topk.unwrap_or(state.default_topk),
            state.embedder.as_ref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "items": items })))
}
