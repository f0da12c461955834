pub mod embedding_cache;
pub mod feedback;
pub mod label_registry;
pub mod learner;
pub mod profiles;
pub mod ranking;
pub mod score_cache;

pub use embedding_cache::{LabelEmbeddingCache, LabelEmbeddings};
pub use feedback::FeedbackService;
pub use label_registry::LabelRegistry;
pub use learner::{AggregationMethod, GatedParams, Interaction};
pub use profiles::{ProfileService, ReadListItem};
pub use ranking::{
    EmbeddingRanker, ExplorationPolicy, RandomSource, Similarity, SparseCandidate, SparseRanker,
    ThreadRngSource,
};
pub use score_cache::{sparsify, ScoreCache};
