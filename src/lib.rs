/// Personalization Service Library
///
/// Personalizes a stream of news articles per user by combining zero-shot
/// topic-label scores and sentence embeddings (computed by out-of-process
/// models) with an online-learned preference vector.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers for scoring, feedback, and ranking
/// - `models`: Data structures for label sets, score vectors, and profiles
/// - `services`: Business logic layer (registry, caches, learner, rankers)
/// - `clients`: Classifier / embedder sidecar clients
/// - `storage`: Narrow storage interfaces over the relational store
/// - `db`: Postgres repositories and table bootstrap
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
