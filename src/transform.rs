use crate::matcher::{FuzzyIndex, MatchAlgorithm, MatchOptions};
use crate::tokenize::{match_case, segments, Segment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

/// User's word corrections: incorrect word → replacement
pub type CorrectionDictionary = BTreeMap<String, String>;

/// Fuzzy suggestions the user rejected: lowercased original word → matched key
pub type DiscardedFuzzy = BTreeMap<String, String>;

/// Fuzzy substitutions of one run, keyed by the corrected word
pub type FuzzyMatchMap = BTreeMap<String, FuzzyMatch>;

/// A correction entry that can never apply
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The word to correct is blank
    #[error("correction has an empty word")]
    EmptyKey,

    /// The replacement is blank
    #[error("correction for {key:?} has an empty replacement")]
    EmptyReplacement {
        /// Offending key
        key: String,
    },
}

/// Checks that a correction entry is usable
///
/// # Errors
/// Returns error if the word or the replacement is blank
pub fn validate_correction(key: &str, replacement: &str) -> Result<(), TransformError> {
    if key.trim().is_empty() {
        return Err(TransformError::EmptyKey);
    }
    if replacement.trim().is_empty() {
        return Err(TransformError::EmptyReplacement {
            key: key.to_owned(),
        });
    }
    Ok(())
}

/// A substitution made through approximate matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzyMatch {
    /// Token as it appeared in the text
    pub original_word: String,
    /// Case-adjusted replacement written to the output
    pub corrected_word: String,
    /// Dictionary key the token was matched against
    pub matched_key: String,
    /// Match distance, always greater than zero
    pub score: f64,
    /// 1-based index of the token among all word tokens
    pub position: usize,
}

/// Output of a transformation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    /// Rewritten text
    pub transformed_text: String,
    /// Fuzzy substitutions available for review/undo
    pub fuzzy_matches: FuzzyMatchMap,
}

impl Transformation {
    /// Result that leaves `text` as is
    #[must_use]
    pub fn unchanged(text: &str) -> Self {
        Self {
            transformed_text: text.to_owned(),
            fuzzy_matches: FuzzyMatchMap::new(),
        }
    }
}

/// How a single token was resolved
#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Unchanged,
    Exact(String),
    Fuzzy(FuzzyMatch),
}

/// Case-insensitive lookup over a correction dictionary
#[derive(Debug)]
pub struct CorrectionIndex {
    replacements: HashMap<String, String>,
    fuzzy: FuzzyIndex,
}

impl CorrectionIndex {
    /// Normalises `dictionary` and indexes its keys for fuzzy lookup
    ///
    /// Keys that collide after lowercasing keep the value of the key that
    /// sorts last. Blank entries are skipped; the rest still apply.
    #[must_use]
    pub fn build(
        dictionary: &CorrectionDictionary,
        algorithm: MatchAlgorithm,
        options: MatchOptions,
    ) -> Self {
        let mut replacements = HashMap::with_capacity(dictionary.len());
        for (key, value) in dictionary {
            if let Err(e) = validate_correction(key, value) {
                warn!(error = %e, "skipping unusable correction");
                continue;
            }

            if let Some(previous) = replacements.insert(key.to_lowercase(), value.clone()) {
                debug!(
                    key = key.as_str(),
                    replaced = previous.as_str(),
                    "correction keys collide after lowercasing"
                );
            }
        }

        let fuzzy = FuzzyIndex::new(replacements.keys().cloned(), algorithm.build(), options);

        Self {
            replacements,
            fuzzy,
        }
    }

    /// Replacement for an exact (case-insensitive) key
    #[must_use]
    pub fn exact(&self, word: &str) -> Option<&str> {
        self.replacements
            .get(&word.to_lowercase())
            .map(String::as_str)
    }

    #[allow(clippy::cast_precision_loss)]
    fn resolve(&self, word: &str, position: usize, discarded: Option<&DiscardedFuzzy>) -> Resolution {
        let lower = word.to_lowercase();
        if let Some(replacement) = self.replacements.get(&lower) {
            return Resolution::Exact(match_case(replacement, word));
        }

        let Some(candidate) = self.fuzzy.best_match(&lower) else {
            return Resolution::Unchanged;
        };
        if candidate.score <= 0.0 {
            return Resolution::Unchanged;
        }

        let word_len = word.chars().count();
        let key_len = candidate.item.chars().count();
        let allowed = self.fuzzy.options().max_length_ratio * word_len.max(key_len) as f64;
        if word_len.abs_diff(key_len) as f64 > allowed {
            debug!(
                word = word,
                key = candidate.item,
                score = %candidate.score,
                "fuzzy match rejected by length guard"
            );
            return Resolution::Unchanged;
        }

        if discarded.and_then(|d| d.get(&lower)).map(String::as_str) == Some(candidate.item) {
            debug!(word = word, key = candidate.item, "fuzzy match previously discarded");
            return Resolution::Unchanged;
        }

        let Some(replacement) = self.replacements.get(candidate.item) else {
            return Resolution::Unchanged;
        };

        Resolution::Fuzzy(FuzzyMatch {
            original_word: word.to_owned(),
            corrected_word: match_case(replacement, word),
            matched_key: candidate.item.to_owned(),
            score: candidate.score,
            position,
        })
    }
}

/// Word-transformation engine
///
/// Holds only matching settings; every call builds its own
/// [`CorrectionIndex`], so one engine can serve concurrent requests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transformer {
    algorithm: MatchAlgorithm,
    options: MatchOptions,
}

impl Transformer {
    /// Engine with explicit matching settings
    #[must_use]
    pub const fn new(algorithm: MatchAlgorithm, options: MatchOptions) -> Self {
        Self { algorithm, options }
    }

    /// Rewrites `text` using the user's corrections
    ///
    /// An absent or empty dictionary returns the text immediately without
    /// building an index.
    #[must_use]
    pub fn transform(
        &self,
        text: &str,
        transformations: Option<&CorrectionDictionary>,
        discarded: Option<&DiscardedFuzzy>,
    ) -> Transformation {
        let Some(dictionary) = transformations.filter(|d| !d.is_empty()) else {
            return Transformation::unchanged(text);
        };

        let index = CorrectionIndex::build(dictionary, self.algorithm, self.options);

        let mut transformed_text = String::with_capacity(text.len());
        let mut fuzzy_matches = FuzzyMatchMap::new();
        let mut position = 0;

        for segment in segments(text) {
            let word = match segment {
                Segment::Separator(s) => {
                    transformed_text.push_str(s);
                    continue;
                }
                Segment::Word(w) => w,
            };
            position += 1;

            match index.resolve(word, position, discarded) {
                Resolution::Unchanged => transformed_text.push_str(word),
                Resolution::Exact(replacement) => transformed_text.push_str(&replacement),
                Resolution::Fuzzy(fuzzy) => {
                    info!(
                        original = fuzzy.original_word.as_str(),
                        corrected = fuzzy.corrected_word.as_str(),
                        key = fuzzy.matched_key.as_str(),
                        score = %fuzzy.score,
                        position = fuzzy.position,
                        "fuzzy correction applied"
                    );
                    transformed_text.push_str(&fuzzy.corrected_word);
                    fuzzy_matches.insert(fuzzy.corrected_word.clone(), fuzzy);
                }
            }
        }

        Transformation {
            transformed_text,
            fuzzy_matches,
        }
    }
}

/// [`Transformer::transform`] with default matching settings
#[must_use]
pub fn transform(
    text: &str,
    transformations: Option<&CorrectionDictionary>,
    discarded: Option<&DiscardedFuzzy>,
) -> Transformation {
    Transformer::default().transform(text, transformations, discarded)
}

#[cfg(test)]
#[allow(clippy::float_cmp)] // Test assertions with known exact values
mod tests {
    use super::*;

    fn dict(entries: &[(&str, &str)]) -> CorrectionDictionary {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_replaces_single_word() {
        let result = transform("hello world", Some(&dict(&[("hello", "hi")])), None);
        assert_eq!(result.transformed_text, "hi world");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_case_insensitive_and_case_preserving() {
        let result = transform("Hello HELLO hello", Some(&dict(&[("hello", "hi")])), None);
        assert_eq!(result.transformed_text, "Hi HI hi");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_uppercase_dictionary_key() {
        let result = transform("hello there", Some(&dict(&[("HELLO", "hi")])), None);
        assert_eq!(result.transformed_text, "hi there");
    }

    #[test]
    fn test_fuzzy_match_without_substring_replacement() {
        let rules = dict(&[("hell", "heaven"), ("hello", "hi")]);
        let result = transform("shell hello shelling", Some(&rules), None);

        assert_eq!(result.transformed_text, "heaven hi shelling");
        assert_eq!(result.fuzzy_matches.len(), 1);
        assert_eq!(
            result.fuzzy_matches["heaven"],
            FuzzyMatch {
                original_word: "shell".to_owned(),
                corrected_word: "heaven".to_owned(),
                matched_key: "hell".to_owned(),
                score: 0.2,
                position: 1,
            }
        );
    }

    #[test]
    fn test_discarded_pair_suppresses_fuzzy_match() {
        let rules = dict(&[("hell", "heaven"), ("hello", "hi")]);
        let discarded = dict(&[("shell", "hell")]);
        let result = transform("shell hello", Some(&rules), Some(&discarded));

        assert_eq!(result.transformed_text, "shell hi");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_discard_only_applies_to_its_key() {
        let rules = dict(&[("hell", "heaven")]);
        let discarded = dict(&[("shell", "other")]);
        let result = transform("Shell", Some(&rules), Some(&discarded));

        assert_eq!(result.transformed_text, "Heaven");
        assert_eq!(result.fuzzy_matches["Heaven"].original_word, "Shell");
    }

    #[test]
    fn test_empty_text() {
        let result = transform("", Some(&dict(&[("hello", "hi")])), None);
        assert_eq!(result, Transformation::unchanged(""));
    }

    #[test]
    fn test_multiple_words() {
        let rules = dict(&[("cat", "lion"), ("dog", "wolf")]);
        let result = transform("cat dog mouse", Some(&rules), None);
        assert_eq!(result.transformed_text, "lion wolf mouse");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_no_rules_fast_path() {
        let text = "just a normal sentence";
        assert_eq!(transform(text, Some(&dict(&[])), None), Transformation::unchanged(text));
        assert_eq!(transform(text, None, None), Transformation::unchanged(text));
    }

    #[test]
    fn test_no_matches_returns_text() {
        let rules = dict(&[("hello", "hi"), ("world", "earth")]);
        let text = "there is nothing to change";
        assert_eq!(transform(text, Some(&rules), None), Transformation::unchanged(text));
    }

    #[test]
    fn test_punctuation_preserved() {
        let rules = dict(&[("hello", "hi"), ("world", "earth")]);
        let result = transform("Hello, world! Hello...", Some(&rules), None);
        assert_eq!(result.transformed_text, "Hi, earth! Hi...");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_uppercase_replacement_value() {
        let result = transform("good morning", Some(&dict(&[("good", "GREAT")])), None);
        assert_eq!(result.transformed_text, "GREAT morning");
    }

    #[test]
    fn test_position_counts_every_word() {
        let rules = dict(&[("hell", "heaven")]);
        let result = transform("The quick, brown shell.", Some(&rules), None);

        assert_eq!(result.transformed_text, "The quick, brown heaven.");
        assert_eq!(result.fuzzy_matches["heaven"].position, 4);
    }

    #[test]
    fn test_fuzzy_preserves_case_style() {
        let rules = dict(&[("kubernetes", "Kubernetes"), ("hell", "heaven")]);
        let result = transform("SHELL kubernets", Some(&rules), None);

        assert_eq!(result.transformed_text, "HEAVEN Kubernetes");
        assert_eq!(result.fuzzy_matches["HEAVEN"].matched_key, "hell");
        assert_eq!(result.fuzzy_matches["Kubernetes"].original_word, "kubernets");
    }

    #[test]
    fn test_collision_keeps_later_match() {
        let rules = dict(&[("hell", "heaven"), ("yellow", "heaven")]);
        let result = transform("shell yello", Some(&rules), None);

        assert_eq!(result.transformed_text, "heaven heaven");
        assert_eq!(result.fuzzy_matches.len(), 1);
        let kept = &result.fuzzy_matches["heaven"];
        assert_eq!(kept.original_word, "yello");
        assert_eq!(kept.position, 2);
    }

    #[test]
    fn test_length_guard_rejects_short_token() {
        let transformer = Transformer::new(MatchAlgorithm::Substring, MatchOptions::default());
        let rules = dict(&[("helloworld", "greeting")]);
        let result = transformer.transform("hxllo", Some(&rules), None);

        assert_eq!(result, Transformation::unchanged("hxllo"));
    }

    #[test]
    fn test_zero_score_is_not_fuzzy() {
        // "hel" sits verbatim inside "hello": distance 0, treated as no match
        let transformer = Transformer::new(MatchAlgorithm::Substring, MatchOptions::default());
        let rules = dict(&[("hello", "hi")]);
        let result = transformer.transform("hel", Some(&rules), None);

        assert_eq!(result, Transformation::unchanged("hel"));
    }

    #[test]
    fn test_length_guard_with_loose_threshold() {
        let options = MatchOptions {
            threshold: 0.5,
            ..MatchOptions::default()
        };
        let transformer = Transformer::new(MatchAlgorithm::Levenshtein, options);
        let rules = dict(&[("hell", "heaven")]);
        let result = transformer.transform("shelling", Some(&rules), None);

        assert_eq!(result.transformed_text, "shelling");
    }

    #[test]
    fn test_single_char_keys_match_exactly_only() {
        let rules = dict(&[("x", "ex")]);
        let result = transform("x y", Some(&rules), None);
        assert_eq!(result.transformed_text, "ex y");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_blank_entries_skipped() {
        let rules = dict(&[("", "nothing"), ("um", ""), ("  ", "space"), ("teh", "the")]);
        let result = transform("Teh um cat", Some(&rules), None);
        assert_eq!(result.transformed_text, "The um cat");
        assert!(result.fuzzy_matches.is_empty());
    }

    #[test]
    fn test_blank_entries_leave_only_valid_keys() {
        let rules = dict(&[("hello", ""), ("teh", "the")]);
        let index =
            CorrectionIndex::build(&rules, MatchAlgorithm::default(), MatchOptions::default());
        assert_eq!(index.exact("hello"), None);
        assert_eq!(index.exact("TEH"), Some("the"));
    }

    #[test]
    fn test_validate_correction() {
        assert_eq!(validate_correction("teh", "the"), Ok(()));
        assert_eq!(validate_correction("", "the"), Err(TransformError::EmptyKey));
        assert_eq!(
            validate_correction("um", " "),
            Err(TransformError::EmptyReplacement {
                key: "um".to_owned()
            })
        );
    }

    #[test]
    fn test_colliding_keys_last_wins() {
        let rules = dict(&[("Hello", "first"), ("hello", "second")]);
        let index =
            CorrectionIndex::build(&rules, MatchAlgorithm::default(), MatchOptions::default());
        assert_eq!(index.exact("HELLO"), Some("second"));
    }

    #[test]
    fn test_deterministic_output() {
        let rules = dict(&[("hell", "heaven"), ("hello", "hi"), ("world", "earth")]);
        let text = "Shell, hello wrld and shelling";
        let first = transform(text, Some(&rules), None);
        for _ in 0..5 {
            assert_eq!(transform(text, Some(&rules), None), first);
        }
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let rules = dict(&[("hell", "heaven")]);
        let result = transform("shell", Some(&rules), None);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["transformedText"], "heaven");
        assert_eq!(json["fuzzyMatches"]["heaven"]["matchedKey"], "hell");
        assert_eq!(json["fuzzyMatches"]["heaven"]["originalWord"], "shell");
        assert_eq!(json["fuzzyMatches"]["heaven"]["position"], 1);
    }
}
