// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, ValueEnum};

/// A single remote search, following the section/profile/CLI merge order
/// described in the config model: CLI wins over the selected client
/// section, which wins over the client config's top-level defaults.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the client configuration file (host/port/uuid, sections)
    #[arg(long, default_value = "logrep.toml")]
    pub config: String,

    /// Named section of the client config to layer under the top-level defaults
    #[arg(short = 'S', long)]
    pub section: Option<String>,

    /// Server-side profile to select (forwarded as the `profile` request field)
    #[arg(short = 'P', long)]
    pub profile: Option<String>,

    /// Full base URL of the server, e.g. `http://host:4545/<uuid>`. Overrides
    /// the host/port/uuid triple from the resolved client settings.
    #[arg(long)]
    pub url: Option<String>,

    /// TLS verification: omit to verify normally, pass `false`/`no` to
    /// disable verification, or a path to a CA bundle to trust additionally
    #[arg(long)]
    pub verify: Option<String>,

    #[arg(short = 'D', long = "discard-before")]
    pub discard_before: Option<String>,

    /// Sets both before- and after-context to the same line count
    #[arg(short = 'C', long)]
    pub context: Option<i64>,

    #[arg(short = 'B', long = "before-context")]
    pub before_context: Option<i64>,

    /// The search pattern, given positionally
    #[arg(value_name = "PATTERN", conflicts_with = "pattern_flag")]
    pub pattern_positional: Option<String>,

    /// The search pattern, given as a flag (mutually exclusive with the positional form)
    #[arg(short = 'e', long = "pattern")]
    pub pattern_flag: Option<String>,

    #[arg(short = 'E', long = "except-pattern")]
    pub except_pattern: Option<String>,

    #[arg(short = 'A', long = "after-context")]
    pub after_context: Option<i64>,

    #[arg(short = 'd', long = "discard-after")]
    pub discard_after: Option<String>,

    /// Prefix each rendered line with its line number and a `:`/`-` separator
    #[arg(short = 'n', long = "line-number")]
    pub line_number: bool,

    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    pub color: ColorArg,

    #[arg(long)]
    pub verbose: bool,

    /// Disables zstd response negotiation
    #[arg(short = 'N', long = "no-compression")]
    pub no_compression: bool,
}

impl Cli {
    /// The effective pattern, from whichever of the positional or `-e` form was given.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern_positional.as_deref().or(self.pattern_flag.as_deref())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}
