// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The stream batcher (C6): groups tagged records into size-bounded NDJSON
//! frames, and owns the lazy `file_path` emission the search state machine
//! delegates to it via [`Emission::Open`].

use logrep_core::{Frame, Record};

use crate::constants::MINIMUM_SIZE;

/// What the search worker sends over the record channel: either a new
/// logical stream starting, a tagged record, or a request to flush the
/// pending name with no accompanying record (files-with-matches mode).
#[derive(Debug)]
pub enum Emission {
    /// A new logical stream (file or archive member) has been opened.
    /// Remembered until the next [`Emission::Record`] or
    /// [`Emission::FlushName`] for the same file.
    Open(String),
    /// A tagged record for the most recently opened stream.
    Record(Record),
    /// Forces the pending name to be emitted as a lone `file_path` record,
    /// with no payload record following — used by `files_with_matches`.
    FlushName,
}

/// Accumulates records into size-bounded frames.
#[derive(Debug, Default)]
pub struct Batcher {
    buffer: Vec<Record>,
    payload_bytes: usize,
    pending_name: Option<String>,
}

impl Batcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one [`Emission`] into the batcher. Returns a completed
    /// [`Frame`] if the payload-byte threshold was reached.
    pub fn feed(&mut self, emission: Emission) -> Option<Frame> {
        match emission {
            Emission::Open(name) => {
                self.pending_name = Some(name);
                None
            },
            Emission::Record(record) => {
                self.flush_pending_name();
                self.payload_bytes += record.payload.len();
                self.buffer.push(record);
                self.flush_if_due()
            },
            Emission::FlushName => {
                self.flush_pending_name();
                self.flush_if_due()
            },
        }
    }

    fn flush_pending_name(&mut self) {
        if let Some(name) = self.pending_name.take() {
            let record = Record::file_path(name);
            self.payload_bytes += record.payload.len();
            self.buffer.push(record);
        }
    }

    fn flush_if_due(&mut self) -> Option<Frame> {
        if self.payload_bytes >= MINIMUM_SIZE {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Unconditionally flushes the buffer, resetting the byte count. Used
    /// both internally and by the caller at end-of-stream.
    pub fn flush(&mut self) -> Frame {
        self.payload_bytes = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Flushes any residual buffered records, or `None` if empty — the
    /// end-of-stream call.
    pub fn finish(mut self) -> Option<Frame> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrep_core::RecordKind;

    #[test]
    fn no_record_no_announcement() {
        let mut batcher = Batcher::new();
        assert!(batcher.feed(Emission::Open("a.log".into())).is_none());
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn file_path_emitted_before_first_record() {
        let mut batcher = Batcher::new();
        batcher.feed(Emission::Open("a.log".into()));
        batcher.feed(Emission::Record(Record::new(4, RecordKind::Pattern, "line 4".into())));
        let frame = batcher.finish().unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[0].kind, RecordKind::FilePath);
        assert_eq!(frame[0].payload, "a.log");
        assert_eq!(frame[1].kind, RecordKind::Pattern);
    }

    #[test]
    fn flush_name_announces_with_no_payload_record() {
        let mut batcher = Batcher::new();
        batcher.feed(Emission::Open("a.log".into()));
        let frame = batcher.feed(Emission::FlushName);
        assert!(frame.is_none());
        let frame = batcher.finish().unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame[0].kind, RecordKind::FilePath);
    }

    #[test]
    fn flushes_at_byte_threshold() {
        let mut batcher = Batcher::new();
        batcher.feed(Emission::Open("a.log".into()));
        let big_payload = "x".repeat(MINIMUM_SIZE);
        let frame = batcher.feed(Emission::Record(Record::new(1, RecordKind::Pattern, big_payload)));
        assert!(frame.is_some());
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn second_file_gets_its_own_announcement() {
        let mut batcher = Batcher::new();
        batcher.feed(Emission::Open("a.log".into()));
        batcher.feed(Emission::Record(Record::new(1, RecordKind::Pattern, "x".into())));
        batcher.feed(Emission::Open("b.log".into()));
        batcher.feed(Emission::Record(Record::new(1, RecordKind::Pattern, "y".into())));
        let frame = batcher.finish().unwrap();
        let names: Vec<_> =
            frame.iter().filter(|r| r.kind == RecordKind::FilePath).map(|r| r.payload.clone()).collect();
        assert_eq!(names, vec!["a.log".to_string(), "b.log".to_string()]);
    }
}
