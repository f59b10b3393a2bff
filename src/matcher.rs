use serde::Deserialize;
use std::fmt;

/// Normalised string distance used for vocabulary lookups
///
/// Implementations return a value in `[0, 1]`: `0.0` means identical,
/// `1.0` means nothing in common. Both arguments arrive lowercased.
#[cfg_attr(test, mockall::automock)]
pub trait ApproxMatcher: Send + Sync {
    /// Distance between a query word and an indexed candidate
    fn distance(&self, query: &str, candidate: &str) -> f64;
}

/// Whole-word edit distance: `levenshtein / max(len)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl ApproxMatcher for Levenshtein {
    #[allow(clippy::cast_precision_loss)]
    fn distance(&self, query: &str, candidate: &str) -> f64 {
        let longest = query.chars().count().max(candidate.chars().count());
        if longest == 0 {
            return 0.0;
        }
        strsim::levenshtein(query, candidate) as f64 / longest as f64
    }
}

/// Approximate substring distance
///
/// Minimum number of edits aligning the whole query against any substring
/// of the candidate, divided by the query length. A query contained verbatim
/// in the candidate scores `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Substring;

impl ApproxMatcher for Substring {
    #[allow(clippy::cast_precision_loss)]
    fn distance(&self, query: &str, candidate: &str) -> f64 {
        let query: Vec<char> = query.chars().collect();
        if query.is_empty() {
            return 0.0;
        }

        // Row i holds the cheapest alignment of query[..i] ending at each
        // candidate position. Row 0 is all zeros: the match may start anywhere.
        let candidate: Vec<char> = candidate.chars().collect();
        let mut prev = vec![0_usize; candidate.len() + 1];
        let mut row = vec![0_usize; candidate.len() + 1];
        for (i, q) in query.iter().enumerate() {
            row[0] = i + 1;
            for (j, c) in candidate.iter().enumerate() {
                let substitution = prev[j] + usize::from(q != c);
                row[j + 1] = substitution.min(prev[j + 1] + 1).min(row[j] + 1);
            }
            std::mem::swap(&mut prev, &mut row);
        }

        let edits = prev.iter().copied().min().unwrap_or(query.len());
        (edits as f64 / query.len() as f64).min(1.0)
    }
}

/// Which [`ApproxMatcher`] to build from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchAlgorithm {
    /// [`Levenshtein`]
    #[default]
    Levenshtein,
    /// [`Substring`]
    Substring,
}

impl MatchAlgorithm {
    /// Instantiates the matcher
    #[must_use]
    pub fn build(self) -> Box<dyn ApproxMatcher> {
        match self {
            Self::Levenshtein => Box::new(Levenshtein),
            Self::Substring => Box::new(Substring),
        }
    }
}

/// Thresholds applied to fuzzy lookups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Largest accepted distance (inclusive)
    pub threshold: f64,
    /// Shortest key (in chars) that takes part in fuzzy lookups
    pub min_key_length: usize,
    /// Largest accepted length difference, relative to the longer word
    pub max_length_ratio: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            min_key_length: 2,
            max_length_ratio: 0.2,
        }
    }
}

/// Result of a fuzzy lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    /// Indexed item as it was supplied
    pub item: &'a str,
    /// Distance from the query, `0.0` = identical
    pub score: f64,
}

struct Entry {
    item: String,
    folded: String,
}

/// Approximate search surface over a fixed list of words
///
/// Built once per word list and then queried read-only; share it by
/// reference across threads. Items are compared lowercased.
pub struct FuzzyIndex {
    entries: Vec<Entry>,
    matcher: Box<dyn ApproxMatcher>,
    options: MatchOptions,
}

impl fmt::Debug for FuzzyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuzzyIndex")
            .field("entries", &self.entries.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FuzzyIndex {
    /// Indexes `items`, skipping anything shorter than `options.min_key_length`
    pub fn new<I, S>(items: I, matcher: Box<dyn ApproxMatcher>, options: MatchOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<Entry> = items
            .into_iter()
            .map(Into::into)
            .filter(|item| item.chars().count() >= options.min_key_length)
            .map(|item| Entry {
                folded: item.to_lowercase(),
                item,
            })
            .collect();

        // Lexicographic order doubles as the tie-break between equal scores
        entries.sort_by(|a, b| a.item.cmp(&b.item));
        entries.dedup_by(|a, b| a.item == b.item);

        Self {
            entries,
            matcher,
            options,
        }
    }

    /// Options this index was built with
    #[must_use]
    pub const fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Number of indexed items
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest item within the threshold
    ///
    /// Equal scores resolve to the lexicographically smallest item.
    #[must_use]
    pub fn best_match(&self, query: &str) -> Option<Candidate<'_>> {
        let mut best: Option<Candidate<'_>> = None;
        for candidate in self.scored(query) {
            if best.is_none_or(|b| candidate.score < b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Every item within the threshold, closest first
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Candidate<'_>> {
        let mut found: Vec<Candidate<'_>> = self.scored(query).collect();
        found.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.item.cmp(b.item)));
        found
    }

    fn scored<'a>(&'a self, query: &str) -> impl Iterator<Item = Candidate<'a>> + 'a {
        let query = query.to_lowercase();
        let long_enough = query.chars().count() >= self.options.min_key_length;
        let threshold = self.options.threshold;

        self.entries
            .iter()
            .filter(move |_| long_enough)
            .map(move |entry| Candidate {
                item: &entry.item,
                score: self.matcher.distance(&query, &entry.folded),
            })
            .filter(move |candidate| candidate.score <= threshold)
    }
}
