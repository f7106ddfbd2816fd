//! Text normalization for venue and place-name matching
//!
//! Every lookup key and every query goes through [`normalize`] so that
//! "MONTRÉAL", "Montréal " and "montreal" all meet at the same key.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// NFD-decompose, strip diacritics, lowercase, collapse whitespace and trim.
pub fn normalize(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold the remaining non-ASCII letters of already-normalized text.
///
/// Letters such as `ø` or `ß` have no NFD decomposition, so [`normalize`]
/// leaves them alone. Characters without a mapping are dropped.
pub fn ascii_fold(normalized: &str) -> String {
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        match c {
            'ø' => out.push('o'),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'ß' => out.push_str("ss"),
            'ł' => out.push('l'),
            'đ' | 'ð' => out.push('d'),
            'þ' => out.push_str("th"),
            'ı' => out.push('i'),
            '’' | '‘' => out.push('\''),
            '–' | '—' => out.push('-'),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if `needle` occurs in `haystack` with no alphanumeric character
/// directly before or after it.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(normalize("MONTRÉAL"), "montreal");
        assert_eq!(normalize("  São   Paulo "), "sao paulo");
        assert_eq!(normalize("Zürich"), "zurich");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("Québec City, QC");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_ascii_fold_handles_non_decomposing_letters() {
        assert_eq!(ascii_fold(&normalize("Tromsø")), "tromso");
        assert_eq!(ascii_fold(&normalize("Łódź")), "lodz");
        assert_eq!(ascii_fold("straße"), "strasse");
        assert_eq!(ascii_fold("plain"), "plain");
    }

    #[test]
    fn test_contains_word_respects_boundaries() {
        assert!(contains_word("red rocks, co", "co"));
        assert!(contains_word("co springs", "co"));
        assert!(!contains_word("concord pavilion", "co"));
        assert!(!contains_word("tacoma dome", "co"));
        assert!(contains_word("the nyc show", "nyc"));
        assert!(!contains_word("anything", ""));
    }
}
