/// Profile endpoints: feedback, interaction seeding, and migration
use super::PersonalizationState;
use crate::error::{AppError, Result};
use crate::models::{Feedback, LabelScores};
use crate::services::{AggregationMethod, Interaction};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    #[serde(rename = "labelSetHash")]
    pub label_set_hash: String,
    pub article_id: String,
    pub feedback: Feedback,
    pub alpha: Option<f64>,
}

/// Apply a like/dislike to the user's preference vector
pub async fn feedback(
    state: web::Data<PersonalizationState>,
    req: web::Json<FeedbackRequest>,
) -> Result<HttpResponse> {
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }
    if req.article_id.is_empty() {
        return Err(AppError::BadRequest("article_id required".to_string()));
    }

    let vector = state
        .feedback
        .apply(
            &req.user_id,
            &req.label_set_hash,
            &req.article_id,
            req.feedback,
            req.alpha,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": req.user_id,
        "labelSetHash": req.label_set_hash,
        "vector": vector,
    })))
}

#[derive(Debug, Deserialize)]
pub struct FromInteractionsRequest {
    pub user_id: String,
    #[serde(rename = "labelSetHash")]
    pub label_set_hash: String,
    pub interactions: Vec<InteractionBody>,
    #[serde(default = "default_method")]
    pub method: AggregationMethod,
}

#[derive(Debug, Deserialize)]
pub struct InteractionBody {
    #[serde(default)]
    pub scores: LabelScores,
    pub weight: Option<f64>,
}

fn default_method() -> AggregationMethod {
    AggregationMethod::Sum
}

/// Seed a profile from historical interaction score vectors
pub async fn from_interactions(
    state: web::Data<PersonalizationState>,
    req: web::Json<FromInteractionsRequest>,
) -> Result<HttpResponse> {
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }
    if req.label_set_hash.is_empty() {
        return Err(AppError::BadRequest("labelSetHash required".to_string()));
    }

    let interactions: Vec<Interaction> = req
        .interactions
        .iter()
        .map(|body| Interaction {
            scores: body.scores.clone(),
            weight: body.weight.unwrap_or(1.0),
        })
        .collect();

    let vector = state
        .profiles
        .seed_from_interactions(&req.user_id, &req.label_set_hash, &interactions, req.method)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "vector": vector })))
}

#[derive(Debug, Deserialize)]
pub struct MigrateRequest {
    pub user_id: String,
    #[serde(rename = "fromLabelSetHash")]
    pub from_label_set_hash: Option<String>,
    #[serde(rename = "toLabels")]
    pub to_labels: Vec<String>,
}

/// Carry a profile forward onto a new label set
pub async fn migrate(
    state: web::Data<PersonalizationState>,
    req: web::Json<MigrateRequest>,
) -> Result<HttpResponse> {
    if req.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }
    if req.to_labels.is_empty() {
        return Err(AppError::BadRequest("toLabels required".to_string()));
    }

    let (to_hash, vector) = state
        .profiles
        .migrate(
            &req.user_id,
            req.from_label_set_hash.as_deref(),
            &req.to_labels,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": req.user_id,
        "toLabelSetHash": to_hash,
        "vector": vector,
    })))
}
