use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-label classification scores for one article, values in [0,1]
pub type LabelScores = HashMap<String, f64>;

/// A user's preference vector over a label set, weights in [-1,1].
/// Labels absent from the map are implicitly 0.
pub type ProfileVector = HashMap<String, f64>;

/// Explicit user feedback on an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    /// Update direction for the gated learner
    pub fn sign(&self) -> f64 {
        match self {
            Feedback::Like => 1.0,
            Feedback::Dislike => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Feedback::Like),
            "dislike" => Some(Feedback::Dislike),
            _ => None,
        }
    }
}

/// One read-history row: audit log entry and ranking exclusion key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRecord {
    pub user_id: String,
    pub label_set_hash: String,
    pub article_id: String,
    pub feedback: Feedback,
    /// Unix timestamp in milliseconds
    pub ts: i64,
}

/// Stored article with its precomputed sentence embedding.
/// Owned by ingestion; this service only reads it.
#[derive(Debug, Clone)]
pub struct ArticleEmbedding {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Unit-normalized embedding vector
    pub vector: Vec<f32>,
    pub updated_at: i64,
}

impl ArticleEmbedding {
    /// Classifier input text, title and description joined
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.description.is_empty()) {
            (false, false) => format!("{} — {}", self.title, self.description),
            (false, true) => self.title.clone(),
            _ => self.description.clone(),
        }
    }
}

/// Per-label breakdown of a ranking score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelContribution {
    pub label: String,
    /// Contribution to the final score
    pub weight: f64,
    /// The user's stored preference for this label (0 at cold start)
    pub pref: f64,
    /// Raw label/article embedding similarity (embedding mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim: Option<f64>,
}

/// One ranked candidate from sparse label-score ranking
#[derive(Debug, Clone, Serialize)]
pub struct SparseRankedItem {
    /// Caller-supplied candidate index
    pub index: i64,
    pub score: f64,
    pub explanation: Vec<LabelContribution>,
    #[serde(skip_serializing_if = "is_false")]
    pub cold_start: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exploration: bool,
}

/// One ranked article from full-corpus embedding ranking
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRankedItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub score: f64,
    pub explanation: Vec<LabelContribution>,
    #[serde(skip_serializing_if = "is_false")]
    pub exploration: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Encode an embedding as fixed-width little-endian f32 bytes
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Decode little-endian f32 bytes back into an embedding.
/// Trailing bytes that do not fill a whole f32 are ignored.
pub fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_codec() {
        let vector = vec![0.5f32, -1.25, 3.0];
        let bytes = encode_vector(&vector);
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_vector(&bytes), vector);
    }

    #[test]
    fn test_feedback_parse() {
        assert_eq!(Feedback::parse("like"), Some(Feedback::Like));
        assert_eq!(Feedback::parse("dislike"), Some(Feedback::Dislike));
        assert_eq!(Feedback::parse("meh"), None);
        assert_eq!(Feedback::Dislike.sign(), -1.0);
    }
}
