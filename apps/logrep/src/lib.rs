// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The logrep client: section/profile merge, the NDJSON consumer (C9), and
//! render templates with colorized highlighting (C10).

pub mod cli;
pub mod client;
pub mod color;
pub mod render;

pub use client::{build_client, build_search_url, run_search, ClientError, RenderOptions, SearchQuery};
pub use color::ColorMode;
