// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! ANSI SGR escape stripping, for writers that need a plain-text copy of
//! output the client colorized for the terminal (`--template-processor`
//! output, or anything piped through a non-interactive processor).

use regex::Regex;
use std::sync::LazyLock;

static SGR_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[(\d+)(;\d+)*m").expect("static SGR pattern is valid"));

/// Removes every ANSI SGR escape sequence (`\x1b[...m`) from `text`.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    SGR_SEQUENCE.replace_all(text, "").into_owned()
}
