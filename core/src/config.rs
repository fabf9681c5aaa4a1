//! Tunables and default locations.

use serde::{Deserialize, Serialize};

/// Term-frequency saturation.
pub const BM25_K1: f64 = 1.5;
/// Length-normalization strength.
pub const BM25_B: f64 = 0.75;

/// Number of ranked results returned when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Maximum number of candidates collected by the boolean recall path.
pub const BOOLEAN_CANDIDATE_CAP: usize = 5;

pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_DOCUMENTS_PATH: &str = "data/movies.json";
pub const DEFAULT_STOPWORDS_PATH: &str = "data/stopwords.txt";

/// Hub id of the sentence encoder used when pretrained embeddings are enabled.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: BM25_K1, b: BM25_B }
    }
}

impl Bm25Params {
    pub fn new(k1: f64, b: f64) -> Self { Self { k1, b } }

    /// Override either tunable, keeping the default for the one not given.
    pub fn with_overrides(k1: Option<f64>, b: Option<f64>) -> Self {
        let defaults = Self::default();
        Self { k1: k1.unwrap_or(defaults.k1), b: b.unwrap_or(defaults.b) }
    }
}
