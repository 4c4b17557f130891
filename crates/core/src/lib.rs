// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! logrep core - shared types for the server and client binaries.
//!
//! ## Core Modules
//!
//! - [`settings`]: the Settings/profile config model (C1)
//! - [`predicate`]: literal/regex classification and compilation (C3)
//! - [`record`]: the Record/RecordKind/Frame wire vocabulary
//! - [`error`]: the shared error taxonomy and HTTP status mapping
//! - [`ansi`]: ANSI escape stripping, shared by the client's plain-text paths

pub mod ansi;
pub mod error;
pub mod predicate;
pub mod record;
pub mod settings;

pub use error::{LogrepError, Result};
pub use predicate::{compile, compile_discard_boundary, is_regex, DiscardBoundary, PredicateTerm};
pub use record::{Frame, Record, RecordKind};
pub use settings::{ConfigDocument, Settings};
