//! Text normalization shared by gazetteer loading and geocoding queries.
//!
//! Both sides of a comparison go through [`normalize`], so a record loaded
//! from disk and a query typed by a user agree on case, accents,
//! punctuation and spacing.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for matching.
///
/// Applies compatibility decomposition, drops combining marks (so `é`
/// becomes `e`), lower-cases, turns every non-alphanumeric character into a
/// separator and collapses runs of separators into a single space.
/// Apostrophes are removed without splitting, so `O'Neil` becomes `oneil`.
///
/// The output only contains lower-case alphanumerics separated by single
/// spaces, which makes the function idempotent.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(' ');
            }
            pending_separator = false;
            for lower in c.to_lowercase() {
                if !is_combining_mark(lower) {
                    out.push(lower);
                }
            }
        } else if !is_joiner(c) {
            pending_separator = true;
        }
    }

    out
}

/// Split already-normalized text into tokens.
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|token| !token.is_empty())
}

/// Normalize and tokenize in one step, returning owned tokens.
pub fn normalized_tokens(input: &str) -> Vec<String> {
    tokens(&normalize(input)).map(str::to_string).collect()
}

/// Return the first `chars` characters of a token (whole token if shorter).
pub(crate) fn char_prefix(token: &str, chars: usize) -> &str {
    match token.char_indices().nth(chars) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

fn is_joiner(c: char) -> bool {
    matches!(c, '\'' | '\u{2019}' | '\u{02BC}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  123   Main\tSt "), "123 main st");
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(normalize("456 Oak Ave., Apt #5"), "456 oak ave apt 5");
        assert_eq!(normalize("St.-Laurent/Blvd"), "st laurent blvd");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(normalize("Café Müller"), "cafe muller");
        assert_eq!(normalize("São Paulo"), "sao paulo");
        assert_eq!(normalize("Ångström Straße"), "angstrom straße");
    }

    #[test]
    fn apostrophes_join_words() {
        assert_eq!(normalize("O'Neil’s Pub"), "oneils pub");
    }

    #[test]
    fn punctuation_only_normalizes_to_empty() {
        assert_eq!(normalize("!!! ,,, ..."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "123 Main St",
            "  Café   Müller, Zürich ",
            "Ångström Straße 12b",
            "O'Neil's   Pub & Grill",
            "İstanbul Ⅻ ²nd",
            "ÉCOLE-NORMALE   supérieure",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn tokenizes_normalized_text() {
        let normalized = normalize("123 Main St.");
        let collected: Vec<&str> = tokens(&normalized).collect();
        assert_eq!(collected, vec!["123", "main", "st"]);
        assert_eq!(normalized_tokens("Oak, Ave"), vec!["oak", "ave"]);
    }

    #[test]
    fn char_prefix_respects_char_boundaries() {
        assert_eq!(char_prefix("straße", 5), "straß");
        assert_eq!(char_prefix("st", 3), "st");
    }
}
