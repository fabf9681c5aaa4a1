//! On-disk layout of a built index.
//!
//! Four artifacts hold the store: postings, term frequencies and document
//! lengths are bincode; the document map is JSON so arbitrary display fields
//! survive. `meta.json` is written last and records a CRC32 per artifact, so a
//! half-written or tampered directory is reported instead of silently loaded.

use crate::config::FORMAT_VERSION;
use crate::error::{Error, Result};
use crate::index::{DocLengths, DocMap, IndexStore, Postings, TermFrequencies};
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const POSTINGS: &str = "index.bin";
const DOCMAP: &str = "docmap.json";
const TERM_FREQUENCIES: &str = "term_frequencies.bin";
const DOC_LENGTHS: &str = "doc_lengths.bin";

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    /// Folded stopwords and stemming flag the postings were built with.
    pub tokenizer: TokenizerConfig,
    /// artifact file name -> CRC32 of its bytes
    pub checksums: BTreeMap<String, u32>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn artifact(&self, name: &str) -> PathBuf { self.root.join(name) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn lock(&self) -> PathBuf { self.root.join("build.lock") }
    pub fn embeddings(&self) -> PathBuf { self.root.join("embeddings.bin") }
}

/// Exclusive build lock, held for the duration of build-then-save.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
    _file: File,
}

impl BuildLock {
    pub fn acquire(paths: &IndexPaths) -> Result<Self> {
        create_dir_all(&paths.root)?;
        let path = paths.lock();
        let file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                Error::Locked { path: path.clone() }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self { path, _file: file })
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release build lock");
        }
    }
}

/// Write bytes via a temp file and rename, returning their CRC32.
fn write_artifact(paths: &IndexPaths, name: &str, bytes: &[u8]) -> Result<u32> {
    let path = paths.artifact(name);
    let tmp = paths.artifact(&format!("{name}.tmp"));
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, &path)?;
    Ok(crc32fast::hash(bytes))
}

fn read_artifact(paths: &IndexPaths, name: &str) -> Result<Vec<u8>> {
    let path = paths.artifact(name);
    fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotBuilt { path },
        _ => Error::Io(e),
    })
}

fn verify(meta: &MetaFile, name: &str, bytes: &[u8]) -> Result<()> {
    let expected = meta
        .checksums
        .get(name)
        .ok_or_else(|| Error::corrupt(name, "no checksum recorded"))?;
    let actual = crc32fast::hash(bytes);
    if actual != *expected {
        return Err(Error::corrupt(
            name,
            format!("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}"),
        ));
    }
    tracing::debug!(artifact = name, crc = %format!("{actual:#010x}"), "checksum verified");
    Ok(())
}

fn load_bincode<T: DeserializeOwned>(paths: &IndexPaths, meta: &MetaFile, name: &str) -> Result<T> {
    let bytes = read_artifact(paths, name)?;
    verify(meta, name, &bytes)?;
    bincode::deserialize(&bytes).map_err(|e| Error::corrupt(name, e))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    let tmp = paths.artifact("meta.json.tmp");
    fs::write(&tmp, json.as_bytes())?;
    fs::rename(&tmp, paths.meta())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let buf = fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotBuilt { path: path.clone() },
        _ => Error::Io(e),
    })?;
    let meta: MetaFile = serde_json::from_str(&buf).map_err(|e| Error::corrupt("meta.json", e))?;
    if meta.version != FORMAT_VERSION {
        let reason = format!("unsupported format version {}", meta.version);
        return Err(Error::corrupt("meta.json", reason));
    }
    Ok(meta)
}

/// Persist all four artifacts, then the manifest recording `tokenizer`.
pub fn save(paths: &IndexPaths, store: &IndexStore, tokenizer: &Tokenizer) -> Result<()> {
    create_dir_all(&paths.root)?;
    let artifacts: [(&str, Vec<u8>); 4] = [
        (POSTINGS, bincode::serialize(&store.postings)?),
        (DOCMAP, serde_json::to_vec(&store.docmap)?),
        (TERM_FREQUENCIES, bincode::serialize(&store.term_frequencies)?),
        (DOC_LENGTHS, bincode::serialize(&store.doc_lengths)?),
    ];
    let mut checksums = BTreeMap::new();
    for (name, bytes) in &artifacts {
        checksums.insert(name.to_string(), write_artifact(paths, name, bytes)?);
    }

    let meta = MetaFile {
        num_docs: store.num_docs() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        tokenizer: tokenizer.config(),
        checksums,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "index saved");
    Ok(())
}

/// The tokenizer the saved index was built with.
pub fn load_tokenizer(paths: &IndexPaths) -> Result<Tokenizer> {
    Ok(Tokenizer::new(load_meta(paths)?.tokenizer))
}

/// Load a complete store. Any missing artifact is [`Error::NotBuilt`].
pub fn load(paths: &IndexPaths) -> Result<IndexStore> {
    let meta = load_meta(paths)?;
    let postings: Postings = load_bincode(paths, &meta, POSTINGS)?;
    let term_frequencies: TermFrequencies = load_bincode(paths, &meta, TERM_FREQUENCIES)?;
    let doc_lengths: DocLengths = load_bincode(paths, &meta, DOC_LENGTHS)?;
    let docmap_bytes = read_artifact(paths, DOCMAP)?;
    verify(&meta, DOCMAP, &docmap_bytes)?;
    let docmap: DocMap =
        serde_json::from_slice(&docmap_bytes).map_err(|e| Error::corrupt(DOCMAP, e))?;

    let store = IndexStore { postings, term_frequencies, doc_lengths, docmap };
    validate(&store)?;
    tracing::info!(num_docs = store.num_docs(), num_terms = store.num_terms(), "index loaded");
    Ok(store)
}

fn validate(store: &IndexStore) -> Result<()> {
    for (doc_id, length) in &store.doc_lengths {
        let counted: u32 = store.term_counts(*doc_id).map_or(0, |c| c.values().sum());
        if counted != *length {
            return Err(Error::corrupt(
                DOC_LENGTHS,
                format!("document {doc_id} has length {length} but {counted} counted terms"),
            ));
        }
    }
    Ok(())
}
