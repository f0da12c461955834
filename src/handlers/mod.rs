/// HTTP handlers for the personalization API
pub mod profiles;
pub mod read;
pub mod reco;
pub mod topics;

use crate::clients::{TextEmbedder, TopicClassifier};
use crate::config::Config;
use crate::services::{
    EmbeddingRanker, ExplorationPolicy, FeedbackService, GatedParams, LabelEmbeddingCache,
    LabelRegistry, ProfileService, RandomSource, ScoreCache, SparseRanker,
};
use crate::storage::Storage;
use actix_web::web;
use std::sync::Arc;

/// Shared state handed to every handler
pub struct PersonalizationState {
    pub registry: LabelRegistry,
    pub classifier: Arc<dyn TopicClassifier>,
    pub embedder: Arc<dyn TextEmbedder>,
    pub score_cache: Arc<ScoreCache>,
    pub feedback: FeedbackService,
    pub profiles: ProfileService,
    pub sparse_ranker: SparseRanker,
    pub embedding_ranker: EmbeddingRanker,
    pub default_topk: usize,
}

impl PersonalizationState {
    pub fn new(
        storage: Arc<dyn Storage>,
        classifier: Arc<dyn TopicClassifier>,
        embedder: Arc<dyn TextEmbedder>,
        rng: Arc<dyn RandomSource>,
        config: &Config,
    ) -> Self {
        let params = GatedParams {
            alpha: config.gated.alpha,
            tau: config.gated.tau,
            decay: config.gated.decay,
            gamma: config.gated.gamma,
        };
        let score_cache = Arc::new(ScoreCache::new(
            storage.clone(),
            config.ranking.score_cache_capacity,
        ));
        let label_embeddings = Arc::new(LabelEmbeddingCache::new());
        let exploration = ExplorationPolicy::new(config.ranking.exploration_probability, rng);

        Self {
            registry: LabelRegistry::new(storage.clone()),
            classifier: classifier.clone(),
            embedder: embedder.clone(),
            score_cache: score_cache.clone(),
            feedback: FeedbackService::new(
                storage.clone(),
                classifier,
                embedder,
                score_cache,
                label_embeddings.clone(),
                params,
                config.gated.top_k,
            ),
            profiles: ProfileService::new(storage.clone()),
            sparse_ranker: SparseRanker::new(
                storage.clone(),
                params.tau,
                config.gated.top_k,
                exploration.clone(),
            ),
            embedding_ranker: EmbeddingRanker::new(
                storage,
                label_embeddings,
                params.tau,
                exploration,
            ),
            default_topk: config.ranking.default_topk,
        }
    }
}

/// Register every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/topics/score_batch", web::post().to(topics::score_batch))
        .route("/labels/register", web::post().to(topics::register_labels))
        .route("/profiles/feedback", web::post().to(profiles::feedback))
        .route(
            "/profiles/from_interactions",
            web::post().to(profiles::from_interactions),
        )
        .route("/profiles/migrate", web::post().to(profiles::migrate))
        .route("/reco/rank", web::post().to(reco::rank_sparse))
        .route(
            "/reco/rank_embeddings",
            web::post().to(reco::rank_embeddings),
        )
        .route("/read/list", web::get().to(read::read_list));
}
