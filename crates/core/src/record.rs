// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The Record/Frame wire vocabulary shared by the server, engine, and
//! client: `(line_num, kind, payload)` triples, encoded on the wire as a
//! compact JSON array rather than an object, one array per line_num==0
//! announcement or per matched line.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The semantic role of one emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    FilePath,
    DiscardBefore,
    BeforeContext,
    Pattern,
    AfterContext,
    DiscardAfter,
}

impl RecordKind {
    /// The single-letter wire tag for this kind.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::FilePath => 'l',
            Self::DiscardBefore => 'D',
            Self::BeforeContext => 'B',
            Self::Pattern => 'p',
            Self::AfterContext => 'A',
            Self::DiscardAfter => 'd',
        }
    }

    /// Parses a wire tag back into a `RecordKind`.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'l' => Some(Self::FilePath),
            'D' => Some(Self::DiscardBefore),
            'B' => Some(Self::BeforeContext),
            'p' => Some(Self::Pattern),
            'A' => Some(Self::AfterContext),
            'd' => Some(Self::DiscardAfter),
            _ => None,
        }
    }

    /// The separator character the client uses when line numbers are shown:
    /// `:` for an actual pattern match, `-` for context/discard lines.
    #[must_use]
    pub const fn line_number_separator(self) -> char {
        match self {
            Self::Pattern => ':',
            _ => '-',
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_char().encode_utf8(&mut [0; 4]))
    }
}

/// One tagged line. `line_num == 0` is reserved for `FilePath` announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line_num: u64,
    pub kind: RecordKind,
    pub payload: String,
}

impl Record {
    #[must_use]
    pub const fn file_path(name: String) -> Self {
        Self { line_num: 0, kind: RecordKind::FilePath, payload: name }
    }

    #[must_use]
    pub const fn new(line_num: u64, kind: RecordKind, payload: String) -> Self {
        Self { line_num, kind, payload }
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.line_num)?;
        seq.serialize_element(&self.kind.as_char().to_string())?;
        seq.serialize_element(&self.payload)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [line_num, kind, payload] array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Record, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let line_num: u64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let kind_str: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let payload: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let kind_char = kind_str.chars().next().ok_or_else(|| {
                    de::Error::invalid_value(de::Unexpected::Str(&kind_str), &"a single-char kind")
                })?;
                let kind = RecordKind::from_char(kind_char).ok_or_else(|| {
                    de::Error::invalid_value(de::Unexpected::Char(kind_char), &"l|D|B|p|A|d")
                })?;
                Ok(Record { line_num, kind, payload })
            }
        }

        deserializer.deserialize_seq(RecordVisitor)
    }
}

/// A batch of Records serialised as one NDJSON line: a JSON array of
/// Records. Deserializing a `Frame` from one line of the stream yields the
/// records it carried, in order.
pub type Frame = Vec<Record>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_compact_json() {
        let record = Record::new(42, RecordKind::Pattern, "line 42".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"[42,"p","line 42"]"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn file_path_uses_line_zero_and_l_tag() {
        let record = Record::file_path("foo.log".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"[0,"l","foo.log"]"#);
    }

    #[test]
    fn frame_round_trips_as_array_of_arrays() {
        let frame: Frame = vec![
            Record::file_path("a.log".to_string()),
            Record::new(4, RecordKind::Pattern, "line 4".to_string()),
        ];
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"[[0,"l","a.log"],[4,"p","line 4"]]"#);
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn separator_char_distinguishes_pattern_from_context() {
        assert_eq!(RecordKind::Pattern.line_number_separator(), ':');
        assert_eq!(RecordKind::BeforeContext.line_number_separator(), '-');
        assert_eq!(RecordKind::DiscardBefore.line_number_separator(), '-');
    }
}
