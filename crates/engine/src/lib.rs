// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The logrep search engine: path templating, file reading, the predicate
//! state machine, and stream batching.
//!
//! ## Modules
//!
//! - [`template`]: `<FMT>` path-token expansion under a resolved timezone (C2)
//! - [`reader`]: glob enumeration, transparent decompression, and archive
//!   member iteration (C4)
//! - [`search`]: the per-file predicate state machine (C5)
//! - [`batch`]: size-bounded NDJSON frame batching and lazy `file_path`
//!   emission (C6)
//! - [`constants`]: sizes shared across the engine

pub mod batch;
pub mod constants;
pub mod reader;
pub mod search;
pub mod template;

pub use batch::{Batcher, Emission};
pub use search::{run_search, SearchArgs};
pub use template::ResolvedTimezone;
