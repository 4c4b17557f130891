// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared constants for the search engine.

/// Byte threshold for the stream batcher (C6): once the sum of buffered
/// payload sizes reaches this many bytes, the batch is flushed as one
/// NDJSON frame. Also used by the HTTP layer as the floor above which a
/// response is worth compressing (C8).
pub const MINIMUM_SIZE: usize = 1000;

/// Capacity of the channel between the search worker and the request task.
/// Chosen to absorb a few batcher flushes' worth of records without
/// unbounded buffering, while the worker genuinely blocks on `send` once
/// full — that back-pressure is how a slow/cancelled client throttles a
/// fast scan.
pub const RECORD_CHANNEL_CAPACITY: usize = 64;
