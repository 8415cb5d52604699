//! Filter primitives for the store contract.
//!
//! The store is queried with typed filter structs built from these pieces:
//! date ranges, and case-insensitive pattern matching with the SQL `ILIKE`
//! wildcard vocabulary (`%`, `_`, backslash escape). Free-text terms coming
//! from untrusted input MUST pass through [`sanitize_like_term`] before being
//! wrapped into a pattern, so wildcard metacharacters match literally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// DATE RANGE
// ============================================================================

/// Inclusive date range filter. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whether a date falls within this range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }

    /// True when neither bound is set.
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

// ============================================================================
// PATTERN SANITIZATION
// ============================================================================

/// Escape a free-text term for use inside an `ILIKE` pattern.
///
/// Strips any backslashes the caller supplied, then escapes `%` and `_`.
/// Because every backslash in the output was introduced by this function,
/// sanitizing an already-sanitized term yields the same string - the
/// operation is idempotent, and a wildcard-bearing input can never match
/// more rows than its literal characters would.
pub fn sanitize_like_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 4);
    for ch in term.chars() {
        match ch {
            '\\' => {}
            '%' | '_' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap a sanitized term into a substring pattern.
pub fn substring_pattern(sanitized_term: &str) -> String {
    format!("%{}%", sanitized_term)
}

// ============================================================================
// ILIKE EVALUATION
// ============================================================================

/// Evaluate an `ILIKE` pattern against a text, with SQL semantics:
/// `%` matches any sequence, `_` matches one character, `\` escapes the
/// following character, and comparison is case-insensitive.
pub fn ilike_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();
    match_from(&p, 0, &t, 0)
}

fn match_from(p: &[char], pi: usize, t: &[char], ti: usize) -> bool {
    if pi == p.len() {
        return ti == t.len();
    }
    match p[pi] {
        '%' => (ti..=t.len()).any(|skip| match_from(p, pi + 1, t, skip)),
        '_' => ti < t.len() && match_from(p, pi + 1, t, ti + 1),
        '\\' if pi + 1 < p.len() => {
            ti < t.len() && t[ti] == p[pi + 1] && match_from(p, pi + 2, t, ti + 1)
        }
        c => ti < t.len() && t[ti] == c && match_from(p, pi + 1, t, ti + 1),
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Sanitizing twice yields the same result as sanitizing once.
        #[test]
        fn prop_sanitize_idempotent(term in ".{0,40}") {
            let once = sanitize_like_term(&term);
            let twice = sanitize_like_term(&once);
            prop_assert_eq!(once, twice);
        }

        /// A sanitized wildcard-bearing term never matches more than its
        /// literal characters: when the substring pattern matches, the text
        /// contains the backslash-stripped term literally (ignoring case).
        #[test]
        fn prop_sanitized_term_matches_literally(
            term in "[a-z%_\\\\]{1,12}",
            text in "[a-z%_ ]{0,30}",
        ) {
            let sanitized = sanitize_like_term(&term);
            let literal: String = term.chars().filter(|c| *c != '\\').collect();
            if ilike_matches(&substring_pattern(&sanitized), &text) {
                prop_assert!(
                    text.to_lowercase().contains(&literal.to_lowercase()),
                    "pattern {:?} matched {:?} beyond literal {:?}",
                    sanitized, text, literal
                );
            }
        }

        /// The unsanitized wildcard pattern matches at least as many texts
        /// as the sanitized one.
        #[test]
        fn prop_sanitize_never_broadens(
            term in "[a-z%_]{1,10}",
            text in "[a-z ]{0,20}",
        ) {
            let raw = substring_pattern(&term);
            let safe = substring_pattern(&sanitize_like_term(&term));
            if ilike_matches(&safe, &text) {
                prop_assert!(ilike_matches(&raw, &text));
            }
        }
    }
}
