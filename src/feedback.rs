use crate::tokenize::{is_word_char, words};
use crate::transform::{DiscardedFuzzy, FuzzyMatch};
use tracing::{debug, info};

/// Records that the user rejected `fuzzy`
///
/// Adds `lowercase(original_word) → matched_key`, replacing any older entry
/// for the same word. Returns the key previously stored for that word.
pub fn discard(discarded: &mut DiscardedFuzzy, fuzzy: &FuzzyMatch) -> Option<String> {
    let word = fuzzy.original_word.to_lowercase();
    info!(
        word = word.as_str(),
        key = fuzzy.matched_key.as_str(),
        "fuzzy correction discarded"
    );
    discarded.insert(word, fuzzy.matched_key.clone())
}

/// Puts the original word back where a fuzzy correction was applied
///
/// Looks for `fuzzy.corrected_word` as a whole-word span of `text`, so
/// corrections containing separators (`heaven's`, `New York`) revert too.
/// `fuzzy.position` counts words of the input text, which earlier
/// replacements may have shifted, so among several occurrences the one whose
/// word offset is closest to it wins. Returns `None` when the corrected word
/// no longer appears.
#[must_use]
pub fn revert_fuzzy_match(text: &str, fuzzy: &FuzzyMatch) -> Option<String> {
    let corrected = fuzzy.corrected_word.as_str();
    if corrected.is_empty() {
        return None;
    }

    let expected = fuzzy.position.saturating_sub(1);
    let Some(start) = text
        .match_indices(corrected)
        .map(|(start, _)| start)
        .filter(|&start| is_whole_word(text, start, start + corrected.len()))
        .min_by_key(|&start| words(&text[..start]).count().abs_diff(expected))
    else {
        debug!(
            position = fuzzy.position,
            expected = corrected,
            "fuzzy correction not found in text"
        );
        return None;
    };

    let mut reverted = String::with_capacity(text.len());
    reverted.push_str(&text[..start]);
    reverted.push_str(&fuzzy.original_word);
    reverted.push_str(&text[start + corrected.len()..]);
    Some(reverted)
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !matches!(before, Some(c) if is_word_char(c)) && !matches!(after, Some(c) if is_word_char(c))
}
