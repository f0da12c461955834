/// Topic scoring endpoints: batch classification and label-set registration
use super::PersonalizationState;
use crate::error::{AppError, Result};
use crate::models::LabelScores;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ScoreBatchRequest {
    pub labels: Vec<String>,
    pub articles: Vec<ScoreBatchArticle>,
    #[serde(default = "default_multi_label")]
    pub multi_label: bool,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct ScoreBatchArticle {
    pub index: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

fn default_multi_label() -> bool {
    true
}

fn default_min_score() -> f64 {
    0.05
}

#[derive(Debug, Serialize)]
pub struct ScoreBatchResponse {
    #[serde(rename = "labelSetHash")]
    pub label_set_hash: String,
    pub results: Vec<ScoredArticle>,
}

#[derive(Debug, Serialize)]
pub struct ScoredArticle {
    pub index: i64,
    pub scores: LabelScores,
}

/// Classify a batch of articles against a label set, memoized per
/// (label set, article index)
pub async fn score_batch(
    state: web::Data<PersonalizationState>,
    req: web::Json<ScoreBatchRequest>,
) -> Result<HttpResponse> {
    if req.labels.is_empty() {
        return Err(AppError::BadRequest("labels required".to_string()));
    }
    if req.articles.is_empty() {
        return Err(AppError::BadRequest("articles required".to_string()));
    }

    let label_set_hash = state.registry.register(&req.labels).await?;

    let mut results = Vec::with_capacity(req.articles.len());
    for article in &req.articles {
        let text = join_text(&article.title, &article.description);
        let scores = state
            .score_cache
            .get_or_classify(
                &label_set_hash,
                &article.index.to_string(),
                &text,
                &req.labels,
                req.multi_label,
                req.min_score,
                state.classifier.as_ref(),
            )
            .await?;

        results.push(ScoredArticle {
            index: article.index,
            scores,
        });
    }

    Ok(HttpResponse::Ok().json(ScoreBatchResponse {
        label_set_hash,
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterLabelsRequest {
    pub labels: Vec<String>,
}

/// Store a label set and return its fingerprint
pub async fn register_labels(
    state: web::Data<PersonalizationState>,
    req: web::Json<RegisterLabelsRequest>,
) -> Result<HttpResponse> {
    if req.labels.is_empty() {
        return Err(AppError::BadRequest("labels required".to_string()));
    }

    let label_set_hash = state.registry.register(&req.labels).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "labelSetHash": label_set_hash })))
}

fn join_text(title: &str, description: &str) -> String {
    match (title.is_empty(), description.is_empty()) {
        (false, false) => format!("{} — {}", title, description),
        (false, true) => title.to_string(),
        _ => description.to_string(),
    }
}
