use anyhow::Result;
use clap::{Parser, Subcommand};
use rankdex_core::config::{
    DEFAULT_CACHE_DIR, DEFAULT_DOCUMENTS_PATH, DEFAULT_EMBEDDING_MODEL, DEFAULT_SEARCH_LIMIT,
    DEFAULT_STOPWORDS_PATH,
};
use rankdex_core::persist::{self, BuildLock, IndexPaths};
use rankdex_core::search::{bm25_search, boolean_search};
#[cfg(not(feature = "embeddings-candle"))]
use rankdex_core::semantic::HashingEmbedder;
use rankdex_core::semantic::{Embedder, SemanticIndex};
use rankdex_core::source::{load_documents, load_stopwords};
use rankdex_core::{Bm25Params, DocId, IndexBuilder, IndexStore, Scorer, Tokenizer, TokenizerConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "rankdex")]
#[command(about = "Keyword and semantic search over a movie collection", long_about = None)]
struct Cli {
    /// Document collection (JSON)
    #[arg(long, global = true, env = "RANKDEX_DOCUMENTS", default_value = DEFAULT_DOCUMENTS_PATH)]
    documents: PathBuf,
    /// Stopword list, one per line. Falls back to data/stopwords.txt, then a built-in English list.
    /// Queries always use the list recorded at build time
    #[arg(long, global = true, env = "RANKDEX_STOPWORDS")]
    stopwords: Option<PathBuf>,
    /// Sentence encoder for the semantic commands (needs the embeddings-candle build)
    #[arg(
        long,
        global = true,
        env = "RANKDEX_EMBEDDING_MODEL",
        default_value = DEFAULT_EMBEDDING_MODEL
    )]
    model: String,
    /// Directory holding the built index
    #[arg(long, global = true, env = "RANKDEX_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index and save it to the cache directory
    Build,
    /// Boolean keyword search (unranked, sorted by id)
    Search { query: String },
    /// Raw term frequency of a term in a document
    Tf { document_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF score of a term in a document
    Tfidf { document_id: DocId, term: String },
    /// BM25 IDF score of a single term
    Bm25idf { term: String },
    /// BM25 saturated term frequency
    Bm25tf {
        doc_id: DocId,
        term: String,
        /// Term-frequency saturation (default 1.5)
        k1: Option<f64>,
        /// Length normalization strength (default 0.75)
        b: Option<f64>,
    },
    /// Ranked BM25 search
    Bm25search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Show the embedding model in use
    Verify,
    /// Embed a piece of text
    EmbedText { text: String },
    /// Embed every document and report the embedding matrix shape
    VerifyEmbeddings,
    /// Embed a search query
    EmbedQuery { query: String },
    /// Rank documents by cosine similarity to the query
    SemanticSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.cache_dir);
    let stopwords = cli.stopwords.as_deref();

    match cli.command {
        Commands::Build => {
            let tokenizer = tokenizer(stopwords)?;
            build_index(&paths, &tokenizer, &cli.documents)
        }
        Commands::Search { query } => {
            let store = persist::load(&paths)?;
            let tokenizer = query_tokenizer(&paths, stopwords)?;
            println!("Searching for: {query}");
            for doc in boolean_search(&store, &tokenizer, &query) {
                println!("{}. {}", doc.id, doc.title);
            }
            Ok(())
        }
        Commands::Tf { document_id, term } => with_scorer(&paths, stopwords, |s| {
            let tf = s.tf(document_id, &term)?;
            println!("Term frequency of '{term}' in document '{document_id}': {tf}");
            Ok(())
        }),
        Commands::Idf { term } => with_scorer(&paths, stopwords, |s| {
            let idf = s.idf(&term)?;
            println!("Inverse document frequency of '{term}': {idf:.2}");
            Ok(())
        }),
        Commands::Tfidf { document_id, term } => with_scorer(&paths, stopwords, |s| {
            let tf_idf = s.tf_idf(document_id, &term)?;
            println!("TF-IDF score of '{term}' in document '{document_id}': {tf_idf:.2}");
            Ok(())
        }),
        Commands::Bm25idf { term } => with_scorer(&paths, stopwords, |s| {
            let idf = s.bm25_idf(&term)?;
            println!("BM25 IDF score of '{term}': {idf:.2}");
            Ok(())
        }),
        Commands::Bm25tf { doc_id, term, k1, b } => with_scorer(&paths, stopwords, |s| {
            let tf = s.bm25_tf(doc_id, &term, Bm25Params::with_overrides(k1, b))?;
            println!("BM25 TF score of '{term}' in document '{doc_id}': {tf:.2}");
            Ok(())
        }),
        Commands::Bm25search { query, limit } => with_scorer(&paths, stopwords, |s| {
            for (rank, hit) in bm25_search(s, &query, limit)?.iter().enumerate() {
                let doc = &hit.document;
                println!("{}. ({}) {} - Score: {:.2}", rank + 1, doc.id, doc.title, hit.score);
            }
            Ok(())
        }),
        Commands::Verify => {
            let embedder = embedder(&cli.model)?;
            println!("Model loaded: {}", embedder.name());
            if let Some(max) = embedder.max_sequence_length() {
                println!("Max sequence length: {max}");
            }
            println!("Dimensions: {}", embedder.dimension());
            Ok(())
        }
        Commands::EmbedText { text } => {
            let embedding = embedder(&cli.model)?.embed(&text)?;
            println!("Text: {text}");
            println!("First 3 dimensions: {:?}", &embedding[..embedding.len().min(3)]);
            println!("Dimensions: {}", embedding.len());
            Ok(())
        }
        Commands::VerifyEmbeddings => {
            let docs = load_documents(&cli.documents)?;
            let num_docs = docs.len();
            let mut index = SemanticIndex::new(embedder(&cli.model)?);
            index.load_or_create(docs, paths.embeddings())?;
            println!("Number of docs:   {num_docs}");
            println!(
                "Embeddings shape: {} vectors in {} dimensions",
                index.embeddings().len(),
                index.embedder().dimension()
            );
            Ok(())
        }
        Commands::EmbedQuery { query } => {
            let embedding = embedder(&cli.model)?.embed(&query)?;
            println!("Query: {query}");
            println!("First 5 dimensions: {:?}", &embedding[..embedding.len().min(5)]);
            println!("Shape: ({},)", embedding.len());
            Ok(())
        }
        Commands::SemanticSearch { query, limit } => {
            let docs = load_documents(&cli.documents)?;
            let mut index = SemanticIndex::new(embedder(&cli.model)?);
            index.load_or_create(docs, paths.embeddings())?;
            for (rank, hit) in index.search(&query, limit)?.iter().enumerate() {
                println!("{}. {} (score: {:.4})", rank + 1, hit.document.title, hit.score);
                println!("   {}", hit.document.description);
            }
            Ok(())
        }
    }
}

/// Stopwords for a build: explicit file, then the default file, then the built-in list.
fn tokenizer(stopwords: Option<&Path>) -> Result<Tokenizer> {
    let config = match stopwords {
        Some(path) => TokenizerConfig::with_stopwords(load_stopwords(path)?),
        None if Path::new(DEFAULT_STOPWORDS_PATH).is_file() => {
            TokenizerConfig::with_stopwords(load_stopwords(DEFAULT_STOPWORDS_PATH)?)
        }
        None => {
            tracing::info!("no stopword file found, using the built-in English list");
            TokenizerConfig::default()
        }
    };
    Ok(Tokenizer::new(config))
}

/// The tokenizer recorded with the index. An explicit `--stopwords` must agree with it.
fn query_tokenizer(paths: &IndexPaths, stopwords: Option<&Path>) -> Result<Tokenizer> {
    let built = persist::load_tokenizer(paths)?;
    if let Some(path) = stopwords {
        built.ensure_same(&tokenizer(Some(path))?)?;
    }
    Ok(built)
}

fn with_scorer<F>(paths: &IndexPaths, stopwords: Option<&Path>, f: F) -> Result<()>
where
    F: FnOnce(&Scorer<'_>) -> rankdex_core::Result<()>,
{
    let store = persist::load(paths)?;
    let tokenizer = query_tokenizer(paths, stopwords)?;
    f(&Scorer::new(&store, &tokenizer))?;
    Ok(())
}

#[cfg(feature = "embeddings-candle")]
fn embedder(model: &str) -> Result<Box<dyn Embedder>> {
    let encoder = rankdex_core::semantic::candle::CandleEmbedder::new(model)?;
    Ok(Box::new(encoder))
}

#[cfg(not(feature = "embeddings-candle"))]
fn embedder(model: &str) -> Result<Box<dyn Embedder>> {
    tracing::warn!(model, "built without embeddings-candle, using the hashing embedder instead");
    Ok(Box::new(HashingEmbedder::default()))
}

fn build_index(paths: &IndexPaths, tokenizer: &Tokenizer, documents: &Path) -> Result<()> {
    let _lock = BuildLock::acquire(paths)?;
    let mut store = IndexStore::new();
    // Nothing is written unless the whole collection was ingested.
    IndexBuilder::new(tokenizer).rebuild_from_path(&mut store, documents)?;
    persist::save(paths, &store, tokenizer)?;
    println!("Index built: {} documents, {} terms", store.num_docs(), store.num_terms());
    Ok(())
}
