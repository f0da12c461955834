/// Read-history endpoint
use super::PersonalizationState;
use crate::error::{AppError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReadListQuery {
    pub user_id: String,
}

/// The user's feedback history, newest first
pub async fn read_list(
    state: web::Data<PersonalizationState>,
    query: web::Query<ReadListQuery>,
) -> Result<HttpResponse> {
    if query.user_id.is_empty() {
        return Err(AppError::BadRequest("user_id required".to_string()));
    }

    let items = state.profiles.read_list(&query.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "items": items })))
}
