use crate::matcher::{FuzzyIndex, MatchAlgorithm, MatchOptions};
use crate::tokenize::is_word_char;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Default distance threshold for suggestions
pub const DEFAULT_SUGGEST_THRESHOLD: f64 = 0.3;

/// A vocabulary word close to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Vocabulary entry
    pub word: String,
    /// Distance from the query, `0.0` = identical
    pub score: f64,
}

/// Spelling suggestions over a static vocabulary
///
/// Build it once at startup and pass it to whoever serves suggestions.
#[derive(Debug)]
pub struct SuggestionIndex {
    index: FuzzyIndex,
}

impl SuggestionIndex {
    /// Indexes `vocabulary`
    pub fn new<I, S>(vocabulary: I, algorithm: MatchAlgorithm, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = MatchOptions {
            threshold,
            min_key_length: 1,
            ..MatchOptions::default()
        };
        Self {
            index: FuzzyIndex::new(vocabulary, algorithm.build(), options),
        }
    }

    /// Loads a JSON array of words from `path`
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a JSON string array
    pub fn from_file(path: &Path, algorithm: MatchAlgorithm, threshold: f64) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary {}", path.display()))?;
        let vocabulary: Vec<String> =
            serde_json::from_str(&contents).context("failed to parse vocabulary JSON")?;

        tracing::info!(
            path = %path.display(),
            words = vocabulary.len(),
            "vocabulary loaded"
        );
        Ok(Self::new(vocabulary, algorithm, threshold))
    }

    /// Number of indexed words
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the vocabulary is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Up to `limit` vocabulary words close to `word`, closest first
    ///
    /// Punctuation is stripped from the query; the query itself is never
    /// suggested back.
    #[must_use]
    pub fn suggest(&self, word: &str, limit: usize) -> Vec<Suggestion> {
        let cleaned = word_chars(word);
        if cleaned.is_empty() {
            return Vec::new();
        }
        let folded = cleaned.to_lowercase();

        self.index
            .search(&cleaned)
            .into_iter()
            .filter(|candidate| word_chars(candidate.item).to_lowercase() != folded)
            .take(limit)
            .map(|candidate| Suggestion {
                word: candidate.item.to_owned(),
                score: candidate.score,
            })
            .collect()
    }
}

fn word_chars(word: &str) -> String {
    word.chars().filter(|&c| is_word_char(c)).collect()
}
