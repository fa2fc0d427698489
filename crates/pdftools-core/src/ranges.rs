//! Page range parsing
//!
//! Turns a user-facing expression like "1-3, 5, 8-10" into zero-based page
//! indices. Parsing is lenient: malformed tokens and inverted ranges add
//! nothing, and the remaining tokens are still honoured. A token counts only
//! when each bound is a whole unsigned integer, so "3abc" selects nothing.

use std::collections::BTreeSet;

/// Parse a page range expression into sorted, unique, zero-based indices.
///
/// # Arguments
/// * `expression` - Range string like "1-3, 5, 8-10" (1-based, inclusive)
/// * `page_count` - Pages in the target document; indices outside it are dropped
///
/// # Examples
/// ```
/// use pdftools_core::ranges::parse_page_ranges;
///
/// assert_eq!(parse_page_ranges("1-3", 10), vec![0, 1, 2]);
/// assert_eq!(parse_page_ranges("1-3, 5, 8-10", 12), vec![0, 1, 2, 4, 7, 8, 9]);
/// assert_eq!(parse_page_ranges("abc, 2", 5), vec![1]);
/// assert!(parse_page_ranges("10-5", 12).is_empty());
/// ```
pub fn parse_page_ranges(expression: &str, page_count: usize) -> Vec<usize> {
    let mut indices = BTreeSet::new();

    for part in expression.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
            else {
                continue;
            };

            // Page 0 has no index; pages past the end are dropped below anyway
            let first = start.max(1);
            let last = end.min(page_count);
            for page in first..=last {
                indices.insert(page - 1);
            }
        } else if let Ok(page) = part.parse::<usize>() {
            // Single page like "5"
            if let Some(index) = page.checked_sub(1) {
                indices.insert(index);
            }
        }
    }

    indices.into_iter().filter(|&i| i < page_count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_complex_expression() {
        assert_eq!(parse_page_ranges("1-3, 5, 8-10", 12), vec![0, 1, 2, 4, 7, 8, 9]);
    }

    #[test]
    fn test_parse_is_order_independent() {
        assert_eq!(parse_page_ranges("5, 1-3", 12), parse_page_ranges("1-3, 5", 12));
        assert_eq!(parse_page_ranges("5, 1-3", 12), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_malformed_token_is_skipped() {
        assert_eq!(parse_page_ranges("abc, 2", 5), vec![1]);
        assert_eq!(parse_page_ranges("2, x-4, 3-y, 4", 5), vec![1, 3]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(parse_page_ranges("10-5", 12).is_empty());
        assert_eq!(parse_page_ranges("10-5, 7", 12), vec![6]);
    }

    #[test]
    fn test_out_of_bounds_is_clipped() {
        assert_eq!(parse_page_ranges("3-100", 5), vec![2, 3, 4]);
        assert!(parse_page_ranges("6", 5).is_empty());
    }

    #[test]
    fn test_whitespace_around_hyphen_is_ignored() {
        assert_eq!(parse_page_ranges("  1 -  3 ,4 ", 10), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_deduplicates_overlapping_ranges() {
        assert_eq!(parse_page_ranges("1-3, 2-4, 3", 10), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_page_zero_is_discarded() {
        assert!(parse_page_ranges("0", 5).is_empty());
        assert_eq!(parse_page_ranges("0-2", 5), vec![0, 1]);
    }

    #[test]
    fn test_range_bounds_must_both_be_present() {
        assert!(parse_page_ranges("3-", 5).is_empty());
        assert!(parse_page_ranges("-3", 5).is_empty());
        assert!(parse_page_ranges("1-2-3", 5).is_empty());
    }

    #[test]
    fn test_numbers_with_trailing_text_are_rejected_whole() {
        // "3abc" is not read as page 3
        assert!(parse_page_ranges("3abc", 5).is_empty());
        assert!(parse_page_ranges("2.5", 5).is_empty());
        assert!(parse_page_ranges("1-3x", 5).is_empty());
        assert_eq!(parse_page_ranges("1x-3, 4", 5), vec![3]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(parse_page_ranges("", 5).is_empty());
        assert!(parse_page_ranges(" , ,", 5).is_empty());
        assert!(parse_page_ranges("1-3", 0).is_empty());
    }

    #[test]
    fn test_huge_upper_bound_is_cheap() {
        assert_eq!(parse_page_ranges("1-18446744073709551615", 3), vec![0, 1, 2]);
    }
}
