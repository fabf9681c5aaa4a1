//! Reading the raw document collection and stopword list.

use crate::error::{Error, Result};
use crate::index::Document;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum Collection {
    Wrapped { movies: Vec<Document> },
    Bare(Vec<Document>),
}

/// Load documents from `{"movies": [...]}` or a bare JSON array.
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| Error::source_data(path, e))?;
    let collection: Collection =
        serde_json::from_reader(BufReader::new(f)).map_err(|e| Error::source_data(path, e))?;
    let docs = match collection {
        Collection::Wrapped { movies } => movies,
        Collection::Bare(docs) => docs,
    };
    tracing::debug!(path = %path.display(), num_docs = docs.len(), "loaded documents");
    Ok(docs)
}

/// One stopword per line; blank lines are skipped.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| Error::source_data(path, e))?;
    let mut words = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line.map_err(|e| Error::source_data(path, e))?;
        let word = line.trim();
        if word.is_empty() { continue; }
        words.push(word.to_string());
    }
    Ok(words)
}
