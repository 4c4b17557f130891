// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The logrep server: daemon config loading with hot-reload (C1), the HTTP
//! request surface (C7), response compression (C8), and the logging sink
//! (C11).

pub mod cli;
pub mod config;
pub mod logging;
pub mod server;

pub use config::{ConfigCache, DaemonConfig};
