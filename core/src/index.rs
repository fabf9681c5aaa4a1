use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type DocId = u32;

/// Postings: term -> ids of the documents containing it.
pub type Postings = HashMap<String, HashSet<DocId>>;
/// Per-document term counts.
pub type TermFrequencies = HashMap<DocId, HashMap<String, u32>>;
pub type DocLengths = HashMap<DocId, u32>;
pub type DocMap = HashMap<DocId, Document>;

/// A record from the source collection. Fields other than `id`, `title` and
/// `description` are carried through untouched for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Text fed to the tokenizer at build time.
    pub fn indexed_text(&self) -> String { format!("{} {}", self.title, self.description) }
}

/// A document returned by ranked search with its accumulated score attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexStore {
    pub postings: Postings,
    pub term_frequencies: TermFrequencies,
    pub doc_lengths: DocLengths,
    pub docmap: DocMap,
}

impl IndexStore {
    pub fn new() -> Self { Self::default() }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.term_frequencies.clear();
        self.doc_lengths.clear();
        self.docmap.clear();
    }

    pub fn is_empty(&self) -> bool { self.docmap.is_empty() }

    /// Record one document's tokens. Re-adding an id replaces its previous entry.
    pub fn add_document(&mut self, doc: Document, tokens: &[String]) {
        let doc_id = doc.id;
        if self.docmap.contains_key(&doc_id) {
            self.forget(doc_id);
        }
        self.doc_lengths.insert(doc_id, tokens.len() as u32);
        let counts = self.term_frequencies.entry(doc_id).or_default();
        for token in tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
            self.postings.entry(token.clone()).or_default().insert(doc_id);
        }
        self.docmap.insert(doc_id, doc);
    }

    fn forget(&mut self, doc_id: DocId) {
        if let Some(counts) = self.term_frequencies.remove(&doc_id) {
            for term in counts.keys() {
                if let Some(ids) = self.postings.get_mut(term) {
                    ids.remove(&doc_id);
                    if ids.is_empty() {
                        self.postings.remove(term);
                    }
                }
            }
        }
        self.doc_lengths.remove(&doc_id);
        self.docmap.remove(&doc_id);
    }

    /// Ids of documents containing `term`, ascending.
    pub fn documents_for(&self, term: &str) -> Vec<DocId> {
        let mut ids: Vec<DocId> =
            self.postings.get(term).map(|s| s.iter().copied().collect()).unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Document frequency: size of the term's postings set.
    pub fn df(&self, term: &str) -> usize { self.postings.get(term).map_or(0, HashSet::len) }

    /// Corpus size as seen by IDF: the number of entries in the document map.
    pub fn num_docs(&self) -> usize { self.docmap.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lengths.get(&doc_id).copied()
    }

    pub fn avg_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        total as f64 / self.doc_lengths.len() as f64
    }

    pub fn term_counts(&self, doc_id: DocId) -> Option<&HashMap<String, u32>> {
        self.term_frequencies.get(&doc_id)
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.docmap.get(&doc_id) }
}
