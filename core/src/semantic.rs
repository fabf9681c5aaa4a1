//! Dense-vector search over the same document collection.
//!
//! Independent of the inverted index: documents are embedded as
//! `"{title}: {description}"` and ranked by cosine similarity to the query.
//! The encoder sits behind [`Embedder`]. With the `embeddings-candle` feature,
//! [`candle::CandleEmbedder`] runs a pretrained sentence-transformers model;
//! [`HashingEmbedder`] is the deterministic offline fallback.

#[cfg(feature = "embeddings-candle")]
pub mod candle;

use crate::error::{Error, Result};
use crate::index::{Document, ScoredDocument};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub trait Embedder {
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Token window of the underlying model, if it has one.
    fn max_sequence_length(&self) -> Option<usize> { None }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn name(&self) -> &str { (**self).name() }

    fn dimension(&self) -> usize { (**self).dimension() }

    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }

    fn max_sequence_length(&self) -> Option<usize> { (**self).max_sequence_length() }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Signed feature hashing of lowercase word unigrams, L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self { Self { dimension: dimension.max(1) } }
}

impl Default for HashingEmbedder {
    fn default() -> Self { Self::new(Self::DEFAULT_DIMENSION) }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str { "fnv1a-hashing" }

    fn dimension(&self) -> usize { self.dimension }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        let mut v = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let h = fnv1a(word.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for i in 0..len {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingCache {
    model: String,
    dimension: usize,
    /// CRC32 over the embedded texts, in collection order.
    fingerprint: u32,
    vectors: Vec<Vec<f32>>,
}

fn fingerprint(documents: &[Document]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for doc in documents {
        hasher.update(document_text(doc).as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

fn document_text(doc: &Document) -> String { format!("{}: {}", doc.title, doc.description) }

pub struct SemanticIndex<E: Embedder> {
    embedder: E,
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
}

impl<E: Embedder> SemanticIndex<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder, documents: Vec::new(), embeddings: Vec::new() }
    }

    pub fn embedder(&self) -> &E { &self.embedder }

    pub fn embeddings(&self) -> &[Vec<f32>] { &self.embeddings }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let v = self.embedder.embed(text)?;
        if v.len() != self.embedder.dimension() {
            let expected = self.embedder.dimension();
            return Err(Error::DimensionMismatch { expected, found: v.len() });
        }
        Ok(v)
    }

    /// Embed every document and write the vectors to `cache`.
    pub fn build_embeddings<P: AsRef<Path>>(
        &mut self,
        documents: Vec<Document>,
        cache: P,
    ) -> Result<()> {
        let mut embeddings = Vec::with_capacity(documents.len());
        for doc in &documents {
            embeddings.push(self.embed(&document_text(doc))?);
        }
        let payload = EmbeddingCache {
            model: self.embedder.name().to_string(),
            dimension: self.embedder.dimension(),
            fingerprint: fingerprint(&documents),
            vectors: embeddings,
        };
        let cache = cache.as_ref();
        if let Some(dir) = cache.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(cache, bincode::serialize(&payload)?)?;
        tracing::info!(num_docs = documents.len(), path = %cache.display(), "embeddings saved");
        self.documents = documents;
        self.embeddings = payload.vectors;
        Ok(())
    }

    /// Reuse `cache` when it was built from these exact texts by this embedder,
    /// otherwise rebuild it.
    pub fn load_or_create<P: AsRef<Path>>(
        &mut self,
        documents: Vec<Document>,
        cache: P,
    ) -> Result<()> {
        let cache = cache.as_ref();
        if let Ok(bytes) = fs::read(cache) {
            match bincode::deserialize::<EmbeddingCache>(&bytes) {
                Ok(c) if self.is_current(&c, &documents) => {
                    tracing::debug!(path = %cache.display(), "reusing cached embeddings");
                    self.documents = documents;
                    self.embeddings = c.vectors;
                    return Ok(());
                }
                Ok(_) => {
                    tracing::warn!(path = %cache.display(), "embedding cache is stale, rebuilding")
                }
                Err(e) => tracing::warn!(
                    path = %cache.display(),
                    error = %e,
                    "embedding cache unreadable, rebuilding"
                ),
            }
        }
        self.build_embeddings(documents, cache)
    }

    fn is_current(&self, cache: &EmbeddingCache, documents: &[Document]) -> bool {
        cache.vectors.len() == documents.len()
            && cache.model == self.embedder.name()
            && cache.dimension == self.embedder.dimension()
            && cache.fingerprint == fingerprint(documents)
    }

    /// Documents ranked by cosine similarity to `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        let q = self.embed(query)?;
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(&q, e)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(i, s)| ScoredDocument {
                document: self.documents[i].clone(),
                score: s as f64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(1, "Shark Attack", "a great white shark stalks a beach town"),
            Document::new(2, "Space Station", "astronauts stranded in orbit"),
            Document::new(3, "Deep Sea", "a shark hunts divers in the deep sea"),
        ]
    }

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("Great White Shark").unwrap();
        assert_eq!(a, e.embed("great white shark").unwrap());
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(HashingEmbedder::default().embed("   "), Err(Error::EmptyText)));
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) < 0.0);
    }

    #[test]
    fn search_prefers_overlapping_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SemanticIndex::new(HashingEmbedder::default());
        index.build_embeddings(docs(), dir.path().join("embeddings.bin")).unwrap();
        let results = index.search("astronauts in orbit", 3).unwrap();
        assert_eq!(results[0].document.id, 2);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn cache_is_reused_or_rebuilt_on_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("embeddings.bin");
        let mut index = SemanticIndex::new(HashingEmbedder::new(32));
        index.load_or_create(docs(), &cache).unwrap();
        assert_eq!(index.embeddings().len(), 3);

        let mut fewer = SemanticIndex::new(HashingEmbedder::new(32));
        fewer.load_or_create(docs()[..2].to_vec(), &cache).unwrap();
        assert_eq!(fewer.embeddings().len(), 2);

        let mut wider = SemanticIndex::new(HashingEmbedder::new(48));
        wider.load_or_create(docs()[..2].to_vec(), &cache).unwrap();
        assert_eq!(wider.embeddings()[0].len(), 48);
    }

    #[test]
    fn edited_text_invalidates_cache_of_same_size() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("embeddings.bin");
        let mut index = SemanticIndex::new(HashingEmbedder::new(32));
        index.load_or_create(docs(), &cache).unwrap();
        let before = index.embeddings()[1].clone();

        let mut edited = docs();
        edited[1].description = "a whale sings beneath the ice".to_string();
        let mut reloaded = SemanticIndex::new(HashingEmbedder::new(32));
        reloaded.load_or_create(edited.clone(), &cache).unwrap();
        let expected = HashingEmbedder::new(32).embed(&document_text(&edited[1])).unwrap();
        assert_ne!(reloaded.embeddings()[1], before);
        assert_eq!(reloaded.embeddings()[1], expected);
    }

    #[test]
    fn boxed_embedder_delegates() {
        let boxed: Box<dyn Embedder> = Box::new(HashingEmbedder::new(16));
        assert_eq!(boxed.dimension(), 16);
        assert_eq!(boxed.max_sequence_length(), None);
        let index = SemanticIndex::new(boxed);
        assert_eq!(index.embed("shark").unwrap().len(), 16);
    }
}
