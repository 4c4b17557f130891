// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The search state machine (C5): validates a request's effective Settings
//! into a `SearchArgs`, then walks every matching file applying
//! discard-before/before-context/pattern/except/after-context/discard-after
//! in the order the data model specifies, emitting [`Emission`]s that the
//! request task folds through a [`crate::batch::Batcher`].
//!
//! The scan runs to completion inside whatever thread calls
//! [`run_search`] — callers that need it off the async runtime's worker
//! pool should run it inside `tokio::task::spawn_blocking`, feeding the
//! paired `mpsc::Sender`.

use crate::batch::Emission;
use crate::reader::{self, LineCursor};
use logrep_core::predicate::{self, DiscardBoundary, PredicateTerm};
use logrep_core::{LogrepError, Record, RecordKind, Settings};
use std::collections::VecDeque;
use tokio::sync::mpsc::Sender;

/// The fully validated request: an effective Settings bag reduced to
/// exactly what the scanner needs, with every predicate already compiled.
pub struct SearchArgs {
    pub file_path_pattern: String,
    pub before_context: u32,
    pub after_context: u32,
    pub discard_before: DiscardBoundary,
    pub pattern: PredicateTerm,
    pub except_pattern: PredicateTerm,
    pub discard_after: DiscardBoundary,
    pub files_with_matches: bool,
}

impl SearchArgs {
    /// Validates and compiles `settings` into `SearchArgs`, per C7's
    /// validation order: predicate compilation first (so a bad regex names
    /// its parameter), then the empty-predicate-set check, then context
    /// sign checks.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::InvalidPredicate` if a pattern fails to
    /// compile, `LogrepError::EmptyPredicateSet` if none of
    /// discard_before/pattern/discard_after are set, or
    /// `LogrepError::NegativeContext` if a context size is negative.
    pub fn from_settings(settings: &Settings, files_with_matches: bool) -> Result<Self, LogrepError> {
        let discard_before = predicate::compile_discard_boundary(
            settings.discard_before.as_deref().unwrap_or(""),
            "discard_before_line_num",
        )
        .map_err(|source| LogrepError::InvalidPredicate { parameter: "discard_before", source })?;

        let pattern = predicate::compile(settings.pattern.as_deref().unwrap_or(""))
            .map_err(|source| LogrepError::InvalidPredicate { parameter: "pattern", source })?;

        let except_pattern = predicate::compile(settings.except_pattern.as_deref().unwrap_or(""))
            .map_err(|source| LogrepError::InvalidPredicate { parameter: "except_pattern", source })?;

        let discard_after = predicate::compile_discard_boundary(
            settings.discard_after.as_deref().unwrap_or(""),
            "discard_after_line_num",
        )
        .map_err(|source| LogrepError::InvalidPredicate { parameter: "discard_after", source })?;

        if discard_before.is_none() && pattern.is_absent() && discard_after.is_none() {
            return Err(LogrepError::EmptyPredicateSet);
        }

        let before_context = settings.before_context.unwrap_or(0);
        if before_context < 0 {
            return Err(LogrepError::NegativeContext { parameter: "before_context" });
        }
        let after_context = settings.after_context.unwrap_or(0);
        if after_context < 0 {
            return Err(LogrepError::NegativeContext { parameter: "after_context" });
        }

        Ok(Self {
            file_path_pattern: settings.file_path.clone().unwrap_or_default(),
            before_context: before_context as u32,
            after_context: after_context as u32,
            discard_before,
            pattern,
            except_pattern,
            discard_after,
            files_with_matches,
        })
    }
}

/// Per-file scanner state: the before-context ring buffer and the
/// after-context countdown, reset for every logical file.
struct FileState {
    before_buf: VecDeque<(u64, String)>,
    before_capacity: usize,
    after_remaining: u32,
    in_after_window: bool,
}

impl FileState {
    fn new(before_capacity: u32) -> Self {
        Self {
            before_buf: VecDeque::with_capacity(before_capacity as usize),
            before_capacity: before_capacity as usize,
            after_remaining: 0,
            in_after_window: false,
        }
    }

    fn push_before(&mut self, line_num: u64, text: String) {
        if self.before_capacity == 0 {
            return;
        }
        if self.before_buf.len() == self.before_capacity {
            self.before_buf.pop_front();
        }
        self.before_buf.push_back((line_num, text));
    }

    fn drain_before(&mut self) -> Vec<(u64, String)> {
        self.before_buf.drain(..).collect()
    }
}

/// Sentinel error meaning "the receiver is gone, stop scanning" — never
/// surfaced to a caller, just used to unwind out of the nested loops.
struct Disconnected;

/// Runs the whole search: enumerates candidate files, opens each logical
/// stream in turn, applies the state machine, and sends [`Emission`]s to
/// `sender`. Returns early, leaving remaining files unscanned, if the
/// receiver has been dropped (the client disconnected).
///
/// # Errors
///
/// Returns `LogrepError::Io`/`LogrepError::Archive` if enumeration or
/// opening a file fails outright. Per-member archive errors are logged and
/// skipped rather than returned.
pub fn run_search(args: &SearchArgs, sender: &Sender<Emission>) -> Result<(), LogrepError> {
    let candidates = reader::enumerate_candidates(&args.file_path_pattern)?;

    for path in candidates {
        let streams = reader::open_logical_streams(&path)?;
        for mut cursor in streams {
            if scan_one_file(args, &mut cursor, sender).is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

fn scan_one_file(
    args: &SearchArgs,
    cursor: &mut LineCursor,
    sender: &Sender<Emission>,
) -> Result<(), Disconnected> {
    let db_line = match &args.discard_before {
        DiscardBoundary::None => 0,
        DiscardBoundary::LineNum(n) => *n,
        DiscardBoundary::Term(term) => find_last_match(cursor, term),
    };
    cursor.rewind();

    send(sender, Emission::Open(cursor.name().to_string()))?;

    if args.files_with_matches {
        return scan_one_file_for_presence(args, cursor, sender, db_line);
    }

    let mut state = FileState::new(args.before_context);

    while let Some((line_num, text)) = cursor.next_line() {
        if db_line > 0 && line_num < db_line {
            continue;
        }
        if db_line > 0 && line_num == db_line {
            send(sender, Emission::Record(Record::new(line_num, RecordKind::DiscardBefore, text.clone())))?;
        }

        let is_match = args.pattern.fires(&text) && !args.except_pattern.fires(&text);

        if is_match {
            for (before_num, before_text) in state.drain_before() {
                send(sender, Emission::Record(Record::new(before_num, RecordKind::BeforeContext, before_text)))?;
            }
            send(sender, Emission::Record(Record::new(line_num, RecordKind::Pattern, text.clone())))?;
            state.after_remaining = args.after_context;
            state.in_after_window = true;
        } else {
            state.push_before(line_num, text.clone());
            if state.in_after_window {
                send(sender, Emission::Record(Record::new(line_num, RecordKind::AfterContext, text.clone())))?;
                state.after_remaining = state.after_remaining.saturating_sub(1);
                if state.after_remaining == 0 {
                    state.in_after_window = false;
                }
            }
        }

        let discard_after_fires = match &args.discard_after {
            DiscardBoundary::None => false,
            DiscardBoundary::LineNum(n) => line_num == *n,
            DiscardBoundary::Term(term) => term.fires(&text),
        };
        if discard_after_fires {
            send(sender, Emission::Record(Record::new(line_num, RecordKind::DiscardAfter, text)))?;
            break;
        }
    }

    Ok(())
}

/// The `files_with_matches` variant: no payload record is ever emitted,
/// only at most one `file_path` record, as soon as any predicate would
/// have produced a `pattern` emission.
fn scan_one_file_for_presence(
    args: &SearchArgs,
    cursor: &mut LineCursor,
    sender: &Sender<Emission>,
    db_line: u64,
) -> Result<(), Disconnected> {
    while let Some((line_num, text)) = cursor.next_line() {
        if db_line > 0 && line_num < db_line {
            continue;
        }

        if args.pattern.fires(&text) && !args.except_pattern.fires(&text) {
            return send(sender, Emission::FlushName);
        }

        let discard_after_fires = match &args.discard_after {
            DiscardBoundary::None => false,
            DiscardBoundary::LineNum(n) => line_num == *n,
            DiscardBoundary::Term(term) => term.fires(&text),
        };
        if discard_after_fires {
            break;
        }
    }

    Ok(())
}

fn find_last_match(cursor: &mut LineCursor, term: &PredicateTerm) -> u64 {
    let mut last = 0;
    while let Some((line_num, text)) = cursor.next_line() {
        if term.fires(&text) {
            last = line_num;
        }
    }
    last
}

fn send(sender: &Sender<Emission>, emission: Emission) -> Result<(), Disconnected> {
    sender.blocking_send(emission).map_err(|_| Disconnected)
}
