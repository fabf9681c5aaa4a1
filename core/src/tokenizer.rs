use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Unicode punctuation plus the ASCII set, which also covers symbols like `$` and `+`.
    static ref PUNCT: Regex = Regex::new(r"[\p{P}[:punct:]]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref ENGLISH_STOPWORDS: Vec<&'static str> = vec![
        "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
        "be","because","been","before","being","below","between","both","but","by",
        "can","can't","cannot","could","couldn't",
        "did","didn't","do","does","doesn't","doing","don't","down","during",
        "each","few","for","from","further",
        "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
        "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
        "let's","me","more","most","mustn't","my","myself",
        "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
        "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
        "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
        "under","until","up","very",
        "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
        "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
    ];
}

/// Recorded in the index manifest so queries fold text exactly as the build did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub stopwords: Vec<String>,
    /// Apply the English (Porter2) stemmer. Disabled only for exact-form indexing.
    pub stem: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stopwords: ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            stem: true,
        }
    }
}

impl TokenizerConfig {
    pub fn with_stopwords<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { stopwords: stopwords.into_iter().map(Into::into).collect(), stem: true }
    }

    pub fn without_stemming(mut self) -> Self {
        self.stem = false;
        self
    }
}

/// Turns raw text into index terms: NFC + lowercase, punctuation deleted,
/// split on single spaces, stopwords dropped, then stemmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
    stem: bool,
}

impl Default for Tokenizer {
    fn default() -> Self { Self::new(TokenizerConfig::default()) }
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        // Stopwords go through the same folding as text, so "don't" matches the token "dont".
        let stopwords = config
            .stopwords
            .iter()
            .map(|w| fold(w))
            .filter(|w| !w.is_empty())
            .collect();
        Self { stopwords, stem: config.stem }
    }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// The folded stopword set and stemming flag, stopwords sorted.
    pub fn config(&self) -> TokenizerConfig {
        let mut stopwords: Vec<String> = self.stopwords.iter().cloned().collect();
        stopwords.sort_unstable();
        TokenizerConfig { stopwords, stem: self.stem }
    }

    /// Fails unless `other` folds text into the same terms as `self`.
    pub fn ensure_same(&self, other: &Tokenizer) -> Result<()> {
        if self == other {
            return Ok(());
        }
        let reason = if self.stem != other.stem {
            "stemming differs".to_string()
        } else {
            let missing = self.stopwords.symmetric_difference(&other.stopwords).count();
            format!("{missing} stopwords differ")
        };
        Err(Error::TokenizerMismatch { reason })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let folded = fold(text);
        folded
            .split(' ')
            .filter(|t| !t.is_empty())
            .filter(|t| !self.is_stopword(t))
            .map(|t| if self.stem { STEMMER.stem(t).into_owned() } else { t.to_string() })
            .collect()
    }

    /// Normalize input that must name exactly one indexed term.
    ///
    /// `Ok(None)` means the input vanished during tokenization (a stopword or bare punctuation).
    pub fn single_term(&self, input: &str) -> Result<Option<String>> {
        let mut tokens = self.tokenize(input);
        match tokens.len() {
            0 => Ok(None),
            1 => Ok(tokens.pop()),
            count => Err(Error::MultiTokenTerm { input: input.to_string(), count }),
        }
    }
}

// NFC only: compatibility folding would turn no-break and ideographic spaces into separators.
fn fold(text: &str) -> String {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    PUNCT.replace_all(&lowered, "").into_owned()
}
