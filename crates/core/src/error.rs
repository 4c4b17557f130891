// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for logrep.
//!
//! This module provides a hierarchy of error types for better error handling
//! and programmatic error inspection. All errors implement `Display` and
//! carry enough context to pick an HTTP status code without re-inspecting
//! the request.

use thiserror::Error;

/// Main error type for logrep operations.
///
/// Each variant maps to one row of the failure taxonomy in the error
/// handling design: config loading, request validation, predicate
/// compilation, and file-reader I/O each get their own variant so callers
/// can recover the right status code and log severity.
#[derive(Debug, Error)]
pub enum LogrepError {
    /// The configuration file exists but could not be parsed, or an unknown
    /// option / type mismatch was found while layering Settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// A client asked for a profile name that isn't defined in the config.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// None of discard_before, pattern, discard_after were non-empty after
    /// layering top-level defaults, profile, and request overrides.
    #[error("at least one of discard_before, pattern, or discard_after must be set")]
    EmptyPredicateSet,

    /// A user-supplied pattern failed to compile as a regex.
    #[error("invalid {parameter}: {source}")]
    InvalidPredicate {
        parameter: &'static str,
        #[source]
        source: regex::Error,
    },

    /// before_context or after_context was negative.
    #[error("{parameter} must be non-negative")]
    NegativeContext { parameter: &'static str },

    /// I/O error opening or reading a candidate file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decompression error mid-file (single-file compressors).
    #[error("decompression error: {0}")]
    Decompress(String),

    /// A member of an archive (tar/zip) could not be read; the caller should
    /// skip the member and continue rather than terminate the whole stream.
    #[error("archive member error: {0}")]
    Archive(String),
}

/// Convenience alias for Results using `LogrepError`.
pub type Result<T> = std::result::Result<T, LogrepError>;

impl LogrepError {
    /// Disposition per the error handling design: config/parse failures are
    /// 500, unknown profile is 404, validation failures are 400. I/O and
    /// archive errors never reach the HTTP layer directly — they terminate
    /// or skip inside the search worker — so they fall back to 500 if ever
    /// surfaced there.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnknownProfile(_) => 404,
            Self::EmptyPredicateSet
            | Self::InvalidPredicate { .. }
            | Self::NegativeContext { .. } => 400,
            Self::Config(_) | Self::Io(_) | Self::Decompress(_) | Self::Archive(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(LogrepError::UnknownProfile("x".into()).status_code(), 404);
        assert_eq!(LogrepError::EmptyPredicateSet.status_code(), 400);
        assert_eq!(
            LogrepError::NegativeContext { parameter: "before_context" }.status_code(),
            400
        );
        assert_eq!(LogrepError::Config("missing".into()).status_code(), 500);
    }

    #[test]
    fn display_includes_parameter_name() {
        let err = LogrepError::InvalidPredicate {
            parameter: "pattern",
            source: regex::Error::Syntax("bad".to_string()),
        };
        assert!(err.to_string().contains("pattern"));
    }
}
