//! Page citations in assistant replies.
//!
//! Citations are read from the generated text only; they are not checked
//! against the document.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Citation;

/// Trigger patterns, applied one after another. Case-sensitive.
static PAGE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"page\s+(\d+)",
        r"Page\s+(\d+)",
        r"p\.\s*(\d+)",
        r"pg\.\s*(\d+)",
    ]
    .map(|pattern| Regex::new(pattern).expect("citation pattern is valid"))
});

/// Collect every page reference in `text`.
///
/// Results are grouped by pattern (all `page N` matches, then all `Page N`,
/// then `p. N`, then `pg. N`), not by position in the text. Repeated pages
/// are kept. Only ASCII digits yield a page number; a match written in other
/// decimal scripts is skipped.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    PAGE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .map(Citation::page)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(text: &str) -> Vec<u32> {
        extract_citations(text).into_iter().map(|c| c.page).collect()
    }

    #[test]
    fn test_pattern_order_not_text_order() {
        let citations = extract_citations("See Page 7 and page 5.");
        assert_eq!(citations, vec![Citation::page(5), Citation::page(7)]);
        assert_eq!(citations[0].text, "Page 5");
    }

    #[test]
    fn test_two_patterns_two_records() {
        assert_eq!(extract_citations("See page 5 and Page 7."), vec![Citation::page(5), Citation::page(7)]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        assert_eq!(pages("Page 12 and p.12"), vec![12, 12]);
        assert_eq!(pages("page 3, again page 3"), vec![3, 3]);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(pages("(p. 4) and (pg.9) and p.  10"), vec![4, 10, 9]);
    }

    #[test]
    fn test_pg_is_not_counted_twice() {
        assert_eq!(pages("pg. 2"), vec![2]);
    }

    #[test]
    fn test_no_references() {
        assert!(extract_citations("The page is blank. Page numbers are missing.").is_empty());
        assert!(extract_citations("").is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        assert!(extract_citations("PAGE 3").is_empty());
    }

    #[test]
    fn test_embedded_words_still_match() {
        // "homepage 4" ends in "page 4"
        assert_eq!(pages("homepage 4"), vec![4]);
    }

    #[test]
    fn test_non_ascii_digits_are_skipped() {
        assert!(extract_citations("see page \u{663}").is_empty());
        assert_eq!(pages("page \u{661}\u{662} then page 4"), vec![4]);
    }

    #[test]
    fn test_oversized_numbers_are_skipped() {
        assert_eq!(pages("page 99999999999999999999 and page 2"), vec![2]);
    }
}
