// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Predicate classification and compilation (the predicate compiler, C3).
//!
//! A user-supplied string for `pattern`, `except_pattern`, `discard_before`
//! or `discard_after` is either a plain substring or a regular expression.
//! The classification rule is the one thing both the server (to decide how
//! to match) and the client (to decide how to highlight) need to agree on,
//! so it lives here rather than duplicated on each side.

use regex::Regex;

/// One compiled matcher: absent, a literal substring, or a regex.
#[derive(Debug, Clone)]
pub enum PredicateTerm {
    Absent,
    Literal(String),
    Regex(Regex),
}

impl PredicateTerm {
    /// Whether this term fires against `line`.
    #[must_use]
    pub fn fires(&self, line: &str) -> bool {
        match self {
            Self::Absent => false,
            Self::Literal(s) => line.contains(s.as_str()),
            Self::Regex(re) => re.is_match(line),
        }
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Metacharacters whose unescaped presence makes a string a regex rather
/// than a literal, per the classification rule in the data model.
const METACHARACTERS: &[char] = &['(', ')', '[', '{', '.', '*', '+', '?', '^', '$', '|'];

/// Escape letters that, when preceded by a backslash, also mark the string
/// as a regex (character classes like `\d`, `\s`, `\w`, anchors `\A`/`\Z`/`\z`).
const METACHARACTER_ESCAPES: &[char] = &['A', 'b', 'd', 'D', 's', 'S', 'w', 'W', 'z', 'Z'];

/// Classifies `raw` as literal or regex and produces the matching
/// `PredicateTerm`. Empty input yields `PredicateTerm::Absent`.
///
/// # Errors
///
/// Returns the underlying `regex::Error` if `raw` is classified as a regex
/// but fails to compile.
pub fn compile(raw: &str) -> Result<PredicateTerm, regex::Error> {
    if raw.is_empty() {
        return Ok(PredicateTerm::Absent);
    }
    if is_regex(raw) {
        Ok(PredicateTerm::Regex(Regex::new(raw)?))
    } else {
        Ok(PredicateTerm::Literal(unescape_literal(raw)))
    }
}

/// True iff `raw` contains an unescaped metacharacter, or a backslash
/// escape of one of the special letter classes.
#[must_use]
pub fn is_regex(raw: &str) -> bool {
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                if METACHARACTER_ESCAPES.contains(&next) {
                    return true;
                }
                // `\X` where X is a plain metacharacter is an escape, not a
                // regex trigger by itself — it collapses to a literal `X`.
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if METACHARACTERS.contains(&c) {
            return true;
        }
        i += 1;
    }
    false
}

/// Collapses `\X` sequences (X a metacharacter) down to a bare `X`, for the
/// literal path. Any other backslash is left untouched.
#[must_use]
pub fn unescape_literal(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                if METACHARACTERS.contains(&next) {
                    out.push(next);
                    i += 2;
                    continue;
                }
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// A `discard_before`/`discard_after` boundary: either the reserved numeric
/// form (`discard_before_line_num=N`), or a regular text predicate.
#[derive(Debug, Clone)]
pub enum DiscardBoundary {
    None,
    LineNum(u64),
    Term(PredicateTerm),
}

impl DiscardBoundary {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Parses a `discard_before`/`discard_after` option value, recognising the
/// reserved numeric forms before falling back to ordinary predicate
/// compilation.
///
/// # Errors
///
/// Returns the underlying `regex::Error` if the value is neither numeric
/// form and fails to compile as a predicate.
pub fn compile_discard_boundary(
    raw: &str,
    numeric_key: &str,
) -> Result<DiscardBoundary, regex::Error> {
    if raw.is_empty() {
        return Ok(DiscardBoundary::None);
    }
    if let Some(n) = raw.strip_prefix(&format!("{numeric_key}=")) {
        if let Ok(line_num) = n.trim().parse::<u64>() {
            return Ok(DiscardBoundary::LineNum(line_num));
        }
    }
    compile(raw).map(DiscardBoundary::Term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_literal_is_not_regex() {
        assert!(!is_regex("four"));
    }

    #[test]
    fn metacharacter_marks_regex() {
        assert!(is_regex("1?4"));
        assert!(is_regex("a.b"));
        assert!(is_regex("a|b"));
    }

    #[test]
    fn escaped_metacharacter_is_literal() {
        assert!(!is_regex(r"5\."));
        let PredicateTerm::Literal(s) = compile(r"5\.").unwrap() else {
            panic!("expected literal");
        };
        assert_eq!(s, "5.");
    }

    #[test]
    fn escape_class_marks_regex() {
        assert!(is_regex(r"\d+"));
        assert!(is_regex(r"\bfoo"));
    }

    #[test]
    fn mixed_escaped_and_unescaped_is_regex() {
        // "1?5\." has both an unescaped `?` and an escaped `.`.
        assert!(is_regex(r"1?5\."));
    }

    #[test]
    fn empty_is_absent() {
        assert!(matches!(compile("").unwrap(), PredicateTerm::Absent));
    }

    #[test]
    fn numeric_discard_boundary_takes_precedence() {
        let b = compile_discard_boundary("discard_before_line_num=42", "discard_before_line_num")
            .unwrap();
        assert!(matches!(b, DiscardBoundary::LineNum(42)));
    }

    #[test]
    fn text_discard_boundary_compiles_as_predicate() {
        let b = compile_discard_boundary("eleven", "discard_before_line_num").unwrap();
        assert!(matches!(b, DiscardBoundary::Term(PredicateTerm::Literal(_))));
    }
}
