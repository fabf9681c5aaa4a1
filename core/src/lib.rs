pub mod builder;
pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod scoring;
pub mod search;
pub mod semantic;
pub mod source;
pub mod tokenizer;

pub use builder::IndexBuilder;
pub use config::Bm25Params;
pub use error::{Error, Result};
pub use index::{DocId, Document, IndexStore, ScoredDocument};
pub use scoring::Scorer;
pub use tokenizer::{Tokenizer, TokenizerConfig};
