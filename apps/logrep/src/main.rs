// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use logrep_core::{predicate, ConfigDocument, PredicateTerm, Settings};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod client;
mod color;
mod render;

use cli::Cli;
use client::{build_client, build_search_url, run_search, RenderOptions, SearchQuery};
use color::ColorMode;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_section(cli: &Cli) -> Result<Settings, client::ClientError> {
    let document = if std::path::Path::new(&cli.config).exists() {
        let text = std::fs::read_to_string(&cli.config)?;
        ConfigDocument::parse(&text)?
    } else {
        ConfigDocument::default()
    };
    Ok(document.effective(cli.section.as_deref())?)
}

/// Builds the request overrides from the CLI flags alone, on top of the
/// resolved section settings: `-C/--context` sets both context sizes,
/// `-B`/`-A` then take precedence if also given.
fn cli_overrides(cli: &Cli) -> Settings {
    let mut overrides = Settings::default();
    if let Some(c) = cli.context {
        overrides.before_context = Some(c);
        overrides.after_context = Some(c);
    }
    if let Some(b) = cli.before_context {
        overrides.before_context = Some(b);
    }
    if let Some(a) = cli.after_context {
        overrides.after_context = Some(a);
    }
    if let Some(d) = &cli.discard_before {
        overrides.discard_before = Some(d.clone());
    }
    if let Some(p) = cli.pattern() {
        overrides.pattern = Some(p.to_string());
    }
    if let Some(e) = &cli.except_pattern {
        overrides.except_pattern = Some(e.clone());
    }
    if let Some(d) = &cli.discard_after {
        overrides.discard_after = Some(d.clone());
    }
    overrides
}

fn compile_highlight_term(pattern: Option<&str>) -> PredicateTerm {
    match pattern {
        None => PredicateTerm::Absent,
        Some(raw) => predicate::compile(raw).unwrap_or_else(|error| {
            warn!(%error, "pattern does not compile locally, highlighting disabled");
            PredicateTerm::Absent
        }),
    }
}

async fn run(cli: &Cli) -> Result<(), client::ClientError> {
    let section = load_section(cli)?;
    let effective = section.overlay(&cli_overrides(cli));

    let http_client = build_client(cli.no_compression, cli.verify.as_deref())?;
    let url = build_search_url(cli.url.as_deref(), &effective)?;
    let query = SearchQuery::from_settings(&effective, cli.profile.as_deref());
    let pattern_term = compile_highlight_term(effective.pattern.as_deref());
    let options = RenderOptions { line_number: cli.line_number, color: ColorMode::resolve(cli.color) };

    let mut stdout = std::io::stdout();
    run_search(&http_client, url, &query, &pattern_term, &effective, &options, &mut stdout).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = run(&cli).await {
        error!(%error, "search failed");
        std::process::exit(1);
    }
}
