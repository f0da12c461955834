// ============================================
// Inference Clients
// ============================================
//
// The zero-shot topic classifier and the sentence embedder run out of
// process. This module defines the narrow interfaces the core consumes
// and their HTTP implementations. Failures surface as `Upstream` errors;
// calls are trusted to be bounded-latency and are not retried.

use crate::config::InferenceConfig;
use crate::error::{AppError, Result};
use crate::models::LabelScores;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Zero-shot topic classifier: text + label set -> per-label probability
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<LabelScores>;
}

/// Sentence embedder: text -> fixed-length unit-normalized vector
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// HTTP client for the zero-shot classification sidecar
pub struct HttpTopicClassifier {
    client: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    labels: &'a [String],
    multi_label: bool,
}

/// Sidecar response, HF zero-shot pipeline shape: parallel label/score arrays
#[derive(Deserialize)]
struct ClassifyResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl HttpTopicClassifier {
    pub fn new(config: &InferenceConfig) -> Self {
        let client = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.classifier_url.clone(),
        }
    }
}

#[async_trait]
impl TopicClassifier for HttpTopicClassifier {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<LabelScores> {
        let request = ClassifyRequest {
            text,
            labels,
            multi_label,
        };

        let response = self
            .client
            .post(format!("{}/classify", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("classifier call failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "classifier returned error: {}",
                error_text
            )));
        }

        let result: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("classifier parse error: {}", e)))?;

        Ok(result
            .labels
            .into_iter()
            .zip(result.scores)
            .collect::<LabelScores>())
    }
}

/// HTTP client for the sentence-embedding sidecar
pub struct HttpTextEmbedder {
    client: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl HttpTextEmbedder {
    pub fn new(config: &InferenceConfig) -> Self {
        let client = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.embedder_url.clone(),
        }
    }
}

#[async_trait]
impl TextEmbedder for HttpTextEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest { text };

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("embedder call failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "embedder returned error: {}",
                error_text
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("embedder parse error: {}", e)))?;

        Ok(result.embedding)
    }
}
