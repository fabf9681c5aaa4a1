use crate::error::Result;
use crate::index::{Document, IndexStore};
use crate::source::load_documents;
use crate::tokenizer::Tokenizer;
use std::path::Path;

/// Drives the tokenizer over a collection and fills an [`IndexStore`].
pub struct IndexBuilder<'a> {
    tokenizer: &'a Tokenizer,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self { Self { tokenizer } }

    pub fn build<I>(&self, documents: I) -> IndexStore
    where
        I: IntoIterator<Item = Document>,
    {
        let mut store = IndexStore::new();
        self.rebuild(&mut store, documents);
        store
    }

    /// Clear `store` and repopulate it from `documents`.
    pub fn rebuild<I>(&self, store: &mut IndexStore, documents: I)
    where
        I: IntoIterator<Item = Document>,
    {
        store.clear();
        for doc in documents {
            let tokens = self.tokenizer.tokenize(&doc.indexed_text());
            store.add_document(doc, &tokens);
        }
        tracing::info!(
            num_docs = store.num_docs(),
            num_terms = store.num_terms(),
            "ingested documents"
        );
    }

    /// Read the collection at `path` and rebuild `store` from it.
    ///
    /// On a read or parse failure `store` is left empty and the error returned.
    pub fn rebuild_from_path<P: AsRef<Path>>(&self, store: &mut IndexStore, path: P) -> Result<()> {
        store.clear();
        let documents = load_documents(path)?;
        self.rebuild(store, documents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerConfig;

    fn movies() -> Vec<Document> {
        vec![
            Document::new(1, "The Great Escape", ""),
            Document::new(2, "Escape Room", ""),
            Document::new(3, "The Matrix", ""),
        ]
    }

    #[test]
    fn order_of_documents_does_not_matter() {
        let tok = Tokenizer::new(TokenizerConfig::with_stopwords(["the"]));
        let builder = IndexBuilder::new(&tok);
        let mut reversed = movies();
        reversed.reverse();
        assert_eq!(builder.build(movies()), builder.build(reversed));
    }

    #[test]
    fn rebuild_clears_previous_state() {
        let tok = Tokenizer::new(TokenizerConfig::with_stopwords(["the"]));
        let builder = IndexBuilder::new(&tok);
        let mut store = builder.build(movies());
        builder.rebuild(&mut store, vec![Document::new(9, "Alien", "")]);
        assert_eq!(store.num_docs(), 1);
        assert_eq!(store.df("escap"), 0);
    }

    #[test]
    fn failed_source_leaves_store_empty() {
        let tok = Tokenizer::default();
        let builder = IndexBuilder::new(&tok);
        let mut store = builder.build(movies());
        let dir = tempfile::tempdir().unwrap();
        assert!(builder.rebuild_from_path(&mut store, dir.path().join("missing.json")).is_err());
        assert!(store.is_empty());
        assert!(store.postings.is_empty());
    }

    #[test]
    fn empty_collection_builds_empty_store() {
        let tok = Tokenizer::default();
        let store = IndexBuilder::new(&tok).build(Vec::new());
        assert!(store.is_empty());
        assert_eq!(store.avg_doc_length(), 0.0);
    }
}
