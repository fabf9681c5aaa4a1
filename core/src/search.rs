use crate::config::{Bm25Params, BOOLEAN_CANDIDATE_CAP};
use crate::error::Result;
use crate::index::{DocId, Document, IndexStore, ScoredDocument};
use crate::scoring::Scorer;
use crate::tokenizer::Tokenizer;
use std::collections::{HashMap, HashSet};

/// Unranked recall: union the postings of every query term, stop once
/// [`BOOLEAN_CANDIDATE_CAP`] documents are collected, and return them by id.
pub fn boolean_search(store: &IndexStore, tokenizer: &Tokenizer, query: &str) -> Vec<Document> {
    let mut doc_ids: HashSet<DocId> = HashSet::new();
    'terms: for term in tokenizer.tokenize(query) {
        for doc_id in store.documents_for(&term) {
            doc_ids.insert(doc_id);
            if doc_ids.len() >= BOOLEAN_CANDIDATE_CAP {
                break 'terms;
            }
        }
    }
    let mut results: Vec<Document> =
        doc_ids.into_iter().filter_map(|id| store.document(id).cloned()).collect();
    results.sort_by_key(|d| d.id);
    results
}

/// Ranked OR-search with the default tunables.
pub fn bm25_search(scorer: &Scorer<'_>, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
    bm25_search_with(scorer, query, limit, Bm25Params::default())
}

/// Sum the BM25 contribution of every query term per document and return the
/// best `limit`. Equal scores keep the order in which documents were first reached.
pub fn bm25_search_with(
    scorer: &Scorer<'_>,
    query: &str,
    limit: usize,
    params: Bm25Params,
) -> Result<Vec<ScoredDocument>> {
    let store = scorer.store();
    let mut scored: Vec<(DocId, f64)> = Vec::new();
    let mut slot: HashMap<DocId, usize> = HashMap::new();

    for term in scorer.tokenizer().tokenize(query) {
        for doc_id in store.documents_for(&term) {
            let contribution = scorer.bm25_term(doc_id, &term, params)?;
            match slot.get(&doc_id) {
                Some(&i) => scored[i].1 += contribution,
                None => {
                    slot.insert(doc_id, scored.len());
                    scored.push((doc_id, contribution));
                }
            }
        }
    }

    // Stable sort keeps first-reached order among ties.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let results = scored
        .into_iter()
        .take(limit)
        .filter_map(|(doc_id, score)| {
            store.document(doc_id).map(|d| ScoredDocument { document: d.clone(), score })
        })
        .collect();
    Ok(results)
}
