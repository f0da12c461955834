/// Configuration management
///
/// All settings come from environment variables with development defaults.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Classifier / embedder sidecar endpoints
    pub inference: InferenceConfig,
    /// Gated-learning hyperparameters
    pub gated: GatedConfig,
    /// Ranking configuration
    pub ranking: RankingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Inference sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the zero-shot classifier endpoint
    pub classifier_url: String,
    /// Base URL of the sentence-embedding endpoint
    pub embedder_url: String,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

/// Gated-learning hyperparameters (see `services::learner`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatedConfig {
    /// Learning rate for above-threshold labels
    pub alpha: f64,
    /// Gating threshold; below it a score is treated as noise
    pub tau: f64,
    /// Per-update decay applied to below-threshold labels
    pub decay: f64,
    /// Confidence-sharpening exponent on the score
    pub gamma: f64,
    /// Top-K pruning for sparsification (0 = disabled)
    pub top_k: usize,
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Probability of splicing a random unseen candidate into the result
    pub exploration_probability: f64,
    /// Default result size when the caller omits `topk`
    pub default_topk: usize,
    /// Entry cap for the in-process score cache
    pub score_cache_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("PERSONALIZATION_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("PERSONALIZATION_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8014),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/personalization".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            inference: InferenceConfig {
                classifier_url: std::env::var("CLASSIFIER_URL")
                    .unwrap_or_else(|_| "http://localhost:8501".to_string()),
                embedder_url: std::env::var("EMBEDDER_URL")
                    .unwrap_or_else(|_| "http://localhost:8502".to_string()),
                timeout_ms: std::env::var("INFERENCE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30_000),
            },
            gated: GatedConfig {
                alpha: parse_env_or_default("GATED_ALPHA", 0.1)?,
                tau: parse_env_or_default("GATED_TAU", 0.1)?,
                decay: parse_env_or_default("GATED_DECAY", 0.01)?,
                gamma: parse_env_or_default("GATED_GAMMA", 2.0)?,
                top_k: std::env::var("GATED_TOPK")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            },
            ranking: RankingConfig {
                exploration_probability: parse_env_or_default("EXPLORATION_PROBABILITY", 0.05)?,
                default_topk: std::env::var("RANKING_DEFAULT_TOPK")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                score_cache_capacity: std::env::var("SCORE_CACHE_CAPACITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100_000),
            },
        })
    }
}

fn parse_env_or_default(key: &str, default: f64) -> Result<f64, String> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.gated.alpha, 0.1);
        assert_eq!(config.gated.tau, 0.1);
        assert_eq!(config.gated.decay, 0.01);
        assert_eq!(config.gated.gamma, 2.0);
        assert_eq!(config.gated.top_k, 0);
        assert_eq!(config.ranking.exploration_probability, 0.05);
    }
}
