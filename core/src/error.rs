use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// One of the persisted artifacts is missing.
    #[error("index not found at {path}; run the build command first")]
    NotBuilt { path: PathBuf },

    #[error("document {0} not found")]
    UnknownDocument(DocId),

    #[error("expected a single term but {input:?} produced {count} tokens")]
    MultiTokenTerm { input: String, count: usize },

    /// The document collection or stopword list could not be read or parsed.
    #[error("cannot load {path}: {reason}")]
    SourceData { path: PathBuf, reason: String },

    #[error("index artifact {artifact} is corrupt: {reason}")]
    Corrupt { artifact: String, reason: String },

    /// Query-time tokenizer settings differ from the ones the index was built with.
    #[error("tokenizer does not match the built index ({reason}); rebuild or drop --stopwords")]
    TokenizerMismatch { reason: String },

    #[error("index directory is locked by another build ({path})")]
    Locked { path: PathBuf },

    #[error("text to embed must not be empty")]
    EmptyText,

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corrupt(artifact: &str, reason: impl ToString) -> Self {
        Error::Corrupt { artifact: artifact.to_string(), reason: reason.to_string() }
    }

    pub(crate) fn source_data(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::SourceData { path: path.into(), reason: reason.to_string() }
    }
}
