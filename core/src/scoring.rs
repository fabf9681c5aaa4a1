//! TF, IDF, TF-IDF and BM25.
//!
//! The free functions are the bare formulas. [`Scorer`] binds them to a loaded
//! [`IndexStore`] and normalizes caller input through the same [`Tokenizer`]
//! used at build time, so `"Running"` and `"run"` score the same term.
//!
//! The two IDF variants are intentionally distinct:
//!
//! ```text
//! classic  ln((N + 1) / (df + 1))
//! bm25     ln((N - df + 0.5) / (df + 0.5) + 1)
//! ```

use crate::config::Bm25Params;
use crate::error::{Error, Result};
use crate::index::{DocId, IndexStore};
use crate::tokenizer::Tokenizer;

pub fn classic_idf(num_docs: usize, df: usize) -> f64 {
    ((num_docs as f64 + 1.0) / (df as f64 + 1.0)).ln()
}

pub fn bm25_idf(num_docs: usize, df: usize) -> f64 {
    let n = num_docs as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Saturating term frequency with length normalization.
///
/// An empty corpus has `avg_len == 0.0`; the length ratio is then taken as zero.
pub fn bm25_tf(tf: u32, doc_len: u32, avg_len: f64, params: Bm25Params) -> f64 {
    let tf = tf as f64;
    let ratio = if avg_len > 0.0 { doc_len as f64 / avg_len } else { 0.0 };
    let length_norm = 1.0 - params.b + params.b * ratio;
    let denom = tf + params.k1 * length_norm;
    if denom == 0.0 {
        return 0.0;
    }
    (tf * (params.k1 + 1.0)) / denom
}

pub struct Scorer<'a> {
    store: &'a IndexStore,
    tokenizer: &'a Tokenizer,
}

impl<'a> Scorer<'a> {
    pub fn new(store: &'a IndexStore, tokenizer: &'a Tokenizer) -> Self {
        Self { store, tokenizer }
    }

    pub fn store(&self) -> &'a IndexStore { self.store }

    pub fn tokenizer(&self) -> &'a Tokenizer { self.tokenizer }

    /// Raw count of `term` in `doc_id`. Zero for an absent term, an error for an absent document.
    pub fn tf(&self, doc_id: DocId, term: &str) -> Result<u32> {
        // Unknown documents are reported even when the term tokenizes away.
        self.store.term_counts(doc_id).ok_or(Error::UnknownDocument(doc_id))?;
        match self.tokenizer.single_term(term)? {
            Some(t) => self.tf_term(doc_id, &t),
            None => Ok(0),
        }
    }

    pub fn idf(&self, term: &str) -> Result<f64> {
        let df = self.df(term)?;
        Ok(classic_idf(self.store.num_docs(), df))
    }

    pub fn tf_idf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let tf = self.tf(doc_id, term)?;
        Ok(tf as f64 * self.idf(term)?)
    }

    pub fn bm25_idf(&self, term: &str) -> Result<f64> {
        let df = self.df(term)?;
        Ok(bm25_idf(self.store.num_docs(), df))
    }

    pub fn bm25_tf(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        self.store.doc_length(doc_id).ok_or(Error::UnknownDocument(doc_id))?;
        match self.tokenizer.single_term(term)? {
            Some(t) => self.bm25_tf_term(doc_id, &t, params),
            None => Ok(0.0),
        }
    }

    /// BM25 with the default tunables.
    pub fn bm25(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let tf = self.bm25_tf(doc_id, term, Bm25Params::default())?;
        Ok(tf * self.bm25_idf(term)?)
    }

    /// Document frequency of the single term `input` normalizes to.
    pub fn df(&self, input: &str) -> Result<usize> {
        Ok(self.tokenizer.single_term(input)?.map_or(0, |t| self.store.df(&t)))
    }

    // Term-level variants below take an already normalized term.

    pub(crate) fn tf_term(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let counts = self.store.term_counts(doc_id).ok_or(Error::UnknownDocument(doc_id))?;
        Ok(counts.get(term).copied().unwrap_or(0))
    }

    pub(crate) fn bm25_tf_term(
        &self,
        doc_id: DocId,
        term: &str,
        params: Bm25Params,
    ) -> Result<f64> {
        let doc_len = self.store.doc_length(doc_id).ok_or(Error::UnknownDocument(doc_id))?;
        let tf = self.tf_term(doc_id, term)?;
        Ok(bm25_tf(tf, doc_len, self.store.avg_doc_length(), params))
    }

    pub(crate) fn bm25_term(&self, doc_id: DocId, term: &str, params: Bm25Params) -> Result<f64> {
        let idf = bm25_idf(self.store.num_docs(), self.store.df(term));
        Ok(self.bm25_tf_term(doc_id, term, params)? * idf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::index::Document;
    use crate::tokenizer::TokenizerConfig;

    const EPS: f64 = 1e-9;

    fn fixture() -> (IndexStore, Tokenizer) {
        let tok = Tokenizer::new(TokenizerConfig::with_stopwords(["the"]).without_stemming());
        let store = IndexBuilder::new(&tok).build(vec![
            Document::new(1, "The Great Escape", ""),
            Document::new(2, "Escape Room", ""),
            Document::new(3, "The Matrix", ""),
        ]);
        (store, tok)
    }

    #[test]
    fn tf_counts_and_zero_for_absent_term() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        assert_eq!(s.tf(1, "escape").unwrap(), 1);
        assert_eq!(s.tf(1, "Escape!").unwrap(), 1);
        assert_eq!(s.tf(3, "escape").unwrap(), 0);
        assert_eq!(s.tf(3, "the").unwrap(), 0);
    }

    #[test]
    fn tf_unknown_document_is_an_error() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        assert!(matches!(s.tf(42, "escape"), Err(Error::UnknownDocument(42))));
        let p = Bm25Params::default();
        assert!(matches!(s.bm25_tf(42, "escape", p), Err(Error::UnknownDocument(42))));
    }

    #[test]
    fn classic_idf_matches_formula() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        assert!((s.idf("escape").unwrap() - (4.0f64 / 3.0).ln()).abs() < EPS);
        assert!((s.idf("unseen").unwrap() - 4.0f64.ln()).abs() < EPS);
    }

    #[test]
    fn tf_idf_is_product() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        let expected = 1.0 * (4.0f64 / 2.0).ln();
        assert!((s.tf_idf(2, "room").unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn bm25_idf_for_unseen_term_does_not_raise() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        let expected = ((3.0 + 0.5) / 0.5 + 1.0f64).ln();
        assert!((s.bm25_idf("zebra").unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn every_term_operation_rejects_phrases() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        let p = Bm25Params::default();
        let phrase = "great escape";
        assert!(matches!(s.tf(1, phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.idf(phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.tf_idf(1, phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.bm25_idf(phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.bm25_tf(1, phrase, p), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.bm25(1, phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
        assert!(matches!(s.df(phrase), Err(Error::MultiTokenTerm { count: 2, .. })));
    }

    #[test]
    fn unknown_document_wins_over_a_vanishing_term() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        assert!(matches!(s.tf(42, "the"), Err(Error::UnknownDocument(42))));
        assert!(matches!(s.tf(42, "!!"), Err(Error::UnknownDocument(42))));
        assert!(matches!(s.tf_idf(42, "the"), Err(Error::UnknownDocument(42))));
        let p = Bm25Params::default();
        assert!(matches!(s.bm25_tf(42, "the", p), Err(Error::UnknownDocument(42))));
        assert!(matches!(s.bm25(42, "the"), Err(Error::UnknownDocument(42))));
    }

    #[test]
    fn bm25_tf_matches_formula() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        // lengths: 2, 2, 1 -> avg 5/3
        let avg = 5.0 / 3.0;
        let norm = 1.0 - 0.75 + 0.75 * (2.0 / avg);
        let expected = (1.0 * 2.5) / (1.0 + 1.5 * norm);
        assert!((s.bm25_tf(1, "escape", Bm25Params::default()).unwrap() - expected).abs() < EPS);

        let custom = Bm25Params::new(2.0, 0.0);
        let expected = (1.0 * 3.0) / (1.0 + 2.0);
        assert!((s.bm25_tf(1, "escape", custom).unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn bm25_is_tf_times_idf() {
        let (store, tok) = fixture();
        let s = Scorer::new(&store, &tok);
        let tf = s.bm25_tf(2, "room", Bm25Params::default()).unwrap();
        let expected = tf * s.bm25_idf("room").unwrap();
        assert!((s.bm25(2, "room").unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn idf_is_non_increasing_in_df() {
        for df in 0..10 {
            assert!(classic_idf(10, df + 1) <= classic_idf(10, df));
            assert!(bm25_idf(10, df + 1) <= bm25_idf(10, df));
        }
    }

    #[test]
    fn bm25_tf_increases_and_saturates() {
        let p = Bm25Params::default();
        let mut prev = 0.0;
        for tf in 1..200 {
            let v = bm25_tf(tf, 10, 8.0, p);
            assert!(v > prev);
            assert!(v < p.k1 + 1.0);
            prev = v;
        }
        assert!((p.k1 + 1.0) - bm25_tf(1_000_000, 10, 8.0, p) < 1e-3);
    }

    #[test]
    fn bm25_tf_with_zero_average_is_finite() {
        let v = bm25_tf(0, 0, 0.0, Bm25Params::new(1.5, 1.0));
        assert_eq!(v, 0.0);
        assert!(bm25_tf(2, 0, 0.0, Bm25Params::default()).is_finite());
    }
}
