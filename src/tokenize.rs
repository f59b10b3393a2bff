/// A piece of text as seen by the transformation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Maximal run of word characters (letters, digits, underscore)
    Word(&'a str),
    /// Anything between words: whitespace, punctuation
    Separator(&'a str),
}

impl<'a> Segment<'a> {
    /// Underlying text slice
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        match self {
            Self::Word(s) | Self::Separator(s) => s,
        }
    }
}

/// Returns true for characters that belong to a word token
#[must_use]
pub fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Splits text into interleaving [`Segment::Word`] and [`Segment::Separator`] items.
///
/// Concatenating every segment's text yields the input unchanged. A word is
/// never split, so a rule for "hell" cannot fire inside "shelling".
pub fn segments(text: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let in_word = is_word_char(first);
        let end = rest
            .char_indices()
            .find(|&(_, c)| is_word_char(c) != in_word)
            .map_or(rest.len(), |(i, _)| i);

        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if in_word {
            Segment::Word(head)
        } else {
            Segment::Separator(head)
        })
    })
}

/// Iterates word tokens only
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    segments(text).filter_map(|segment| match segment {
        Segment::Word(w) => Some(w),
        Segment::Separator(_) => None,
    })
}

/// Reapplies the capitalization style of `original` onto `replacement`
///
/// - all caps (at least one letter) → replacement upper-cased
/// - leading capital → replacement with its first character upper-cased
/// - otherwise → replacement untouched
#[must_use]
pub fn match_case(replacement: &str, original: &str) -> String {
    let has_upper = original.chars().any(char::is_uppercase);
    let has_lower = original.chars().any(char::is_lowercase);
    if has_upper && !has_lower {
        return replacement.to_uppercase();
    }

    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        return chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        });
    }

    replacement.to_owned()
}
