// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Colour mode resolution and match highlighting for the client (part of C9).
//!
//! Highlighting reuses the server's literal/regex classification (C3) so a
//! line is segmented the same way the search engine matched it: a literal
//! term walks plain substring occurrences, a regex term walks the compiled
//! pattern's match stream.

use std::io::IsTerminal;

use colored::Colorize;
use logrep_core::PredicateTerm;

use crate::cli::ColorArg;

/// Whether highlighting should be applied, resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Enabled,
    Disabled,
}

impl ColorMode {
    #[must_use]
    pub fn resolve(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Always => Self::Enabled,
            ColorArg::Never => Self::Disabled,
            ColorArg::Auto => {
                if std::io::stdout().is_terminal() {
                    Self::Enabled
                } else {
                    Self::Disabled
                }
            },
        }
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// One piece of a line, split around pattern matches.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Match(String),
    NonMatch(String),
}

/// Splits `line` into match/non-match segments per the pattern term,
/// preserving all text (matches and in-between text alike) in order.
fn segment(term: &PredicateTerm, line: &str) -> Vec<Segment> {
    match term {
        PredicateTerm::Absent => vec![Segment::NonMatch(line.to_string())],
        PredicateTerm::Literal(needle) if needle.is_empty() => {
            vec![Segment::NonMatch(line.to_string())]
        },
        PredicateTerm::Literal(needle) => {
            let mut segments = Vec::new();
            let mut rest = line;
            while let Some(pos) = rest.find(needle.as_str()) {
                if pos > 0 {
                    segments.push(Segment::NonMatch(rest[..pos].to_string()));
                }
                segments.push(Segment::Match(needle.clone()));
                rest = &rest[pos + needle.len()..];
            }
            if !rest.is_empty() || segments.is_empty() {
                segments.push(Segment::NonMatch(rest.to_string()));
            }
            segments
        },
        PredicateTerm::Regex(re) => {
            let mut segments = Vec::new();
            let mut last = 0;
            for m in re.find_iter(line) {
                if m.start() > last {
                    segments.push(Segment::NonMatch(line[last..m.start()].to_string()));
                }
                segments.push(Segment::Match(line[m.start()..m.end()].to_string()));
                last = m.end();
            }
            if last < line.len() || segments.is_empty() {
                segments.push(Segment::NonMatch(line[last..].to_string()));
            }
            segments
        },
    }
}

/// Renders `line` with pattern matches highlighted, or unchanged if `mode`
/// is disabled or `term` never fires on this line.
#[must_use]
pub fn highlight(term: &PredicateTerm, line: &str, mode: ColorMode) -> String {
    if !mode.is_enabled() {
        return line.to_string();
    }
    segment(term, line)
        .into_iter()
        .map(|s| match s {
            Segment::Match(text) => text.red().bold().to_string(),
            Segment::NonMatch(text) => text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrep_core::predicate;

    #[test]
    fn scenario_g_segmentation_matches_spec() {
        let term = predicate::compile(r"(2025)|(INFO)|(123)").unwrap();
        let line = "2025-11-06 15:52 INFO test 123 end";
        let segments = segment(&term, line);
        assert_eq!(
            segments,
            vec![
                Segment::Match("2025".to_string()),
                Segment::NonMatch("-11-06 15:52 ".to_string()),
                Segment::Match("INFO".to_string()),
                Segment::NonMatch(" test ".to_string()),
                Segment::Match("123".to_string()),
                Segment::NonMatch(" end".to_string()),
            ]
        );
    }

    #[test]
    fn literal_with_escaped_metacharacters_highlights_exact_occurrences() {
        let term = predicate::compile(r"5\.").unwrap();
        let segments = segment(&term, "line 5.five cinco");
        assert_eq!(
            segments,
            vec![
                Segment::NonMatch("line ".to_string()),
                Segment::Match("5.".to_string()),
                Segment::NonMatch("five cinco".to_string()),
            ]
        );
    }

    #[test]
    fn no_match_yields_single_nonmatch_segment() {
        let term = predicate::compile("absent").unwrap();
        let segments = segment(&term, "nothing here");
        assert_eq!(segments, vec![Segment::NonMatch("nothing here".to_string())]);
    }

    #[test]
    fn disabled_mode_leaves_line_untouched() {
        let term = predicate::compile("four").unwrap();
        assert_eq!(highlight(&term, "line four here", ColorMode::Disabled), "line four here");
    }
}
