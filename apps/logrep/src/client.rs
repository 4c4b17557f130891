// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The client consumer (C9): issues the search request, reassembles the
//! NDJSON frame stream, and renders each record through [`crate::render`]
//! and [`crate::color`].

use std::io::Write;

use bytes::Bytes;
use futures::StreamExt;
use logrep_core::{Frame, PredicateTerm, RecordKind, Settings};
use reqwest::Url;
use serde::Serialize;
use tracing::warn;

use crate::color::{self, ColorMode};
use crate::render::Renderer;

pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// The request parameters sent to the server, built from the effective
/// (CLI > section > top-level) client Settings plus the `-P/--profile` and
/// `files_with_matches` selectors.
#[derive(Serialize, Debug, Default)]
pub struct SearchQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discard_before: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_context: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub except_pattern: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_context: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discard_after: Option<&'a str>,
}

impl<'a> SearchQuery<'a> {
    #[must_use]
    pub fn from_settings(settings: &'a Settings, profile: Option<&'a str>) -> Self {
        Self {
            profile,
            discard_before: settings.discard_before.as_deref(),
            before_context: settings.before_context,
            pattern: settings.pattern.as_deref(),
            except_pattern: settings.except_pattern.as_deref(),
            after_context: settings.after_context,
            discard_after: settings.discard_after.as_deref(),
        }
    }
}

/// Builds the HTTP client. `no_compression` disables zstd response
/// negotiation entirely; `verify` is `None` for default certificate
/// verification, `Some("false"|"no")` to disable it, or `Some(path)` to
/// trust an additional CA bundle.
pub fn build_client(no_compression: bool, verify: Option<&str>) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().zstd(!no_compression);
    match verify {
        None => {},
        Some(v) if v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no") => {
            builder = builder.danger_accept_invalid_certs(true);
        },
        Some(path) => {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(cert);
        },
    }
    Ok(builder.build()?)
}

/// Builds the `/<uuid>/search` URL, preferring an explicit `--url` base over
/// the host/port/uuid triple in the effective Settings.
pub fn build_search_url(explicit_url: Option<&str>, settings: &Settings) -> Result<Url, ClientError> {
    let base = match explicit_url {
        Some(u) => u.trim_end_matches('/').to_string(),
        None => {
            let host = settings.host.as_deref().unwrap_or("127.0.0.1");
            let port = settings.port.unwrap_or(4545);
            let uuid = settings.uuid.as_deref().ok_or("no --url given and no uuid configured")?;
            format!("http://{host}:{port}/{uuid}")
        },
    };
    Ok(Url::parse(&format!("{base}/search"))?)
}

/// Options that don't belong in the request but shape how the response is rendered.
pub struct RenderOptions {
    pub line_number: bool,
    pub color: ColorMode,
}

/// Issues the search request and streams the response through `writer`,
/// rendering each record per C9/C10. Returns `Ok(true)` iff at least one
/// `pattern` record was seen (used to pick the process exit code the way
/// `grep` does). Generic over the writer so tests can capture rendered
/// output in a buffer instead of going straight to stdout.
pub async fn run_search(
    client: &reqwest::Client,
    url: Url,
    query: &SearchQuery<'_>,
    pattern_term: &PredicateTerm,
    settings: &Settings,
    options: &RenderOptions,
    writer: &mut impl Write,
) -> Result<bool, ClientError> {
    let response = client.get(url).query(query).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("server returned {status}: {body}").into());
    }

    let renderer = Renderer::from_settings(settings)?;
    let mut consumer = FrameConsumer::new(&renderer, pattern_term, options, writer);

    let mut buffer: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk?;
        buffer.extend_from_slice(&chunk);
        consumer.drain_lines(&mut buffer)?;
    }
    if !buffer.is_empty() {
        consumer.handle_line(&buffer)?;
    }
    consumer.finish();
    Ok(consumer.saw_match)
}

struct FrameConsumer<'a, W: Write> {
    renderer: &'a Renderer,
    pattern_term: &'a PredicateTerm,
    options: &'a RenderOptions,
    prev_line: u64,
    file_open: bool,
    saw_match: bool,
    writer: &'a mut W,
}

impl<'a, W: Write> FrameConsumer<'a, W> {
    fn new(
        renderer: &'a Renderer,
        pattern_term: &'a PredicateTerm,
        options: &'a RenderOptions,
        writer: &'a mut W,
    ) -> Self {
        Self { renderer, pattern_term, options, prev_line: 0, file_open: false, saw_match: false, writer }
    }

    fn drain_lines(&mut self, buffer: &mut Vec<u8>) -> Result<(), ClientError> {
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            if !line.is_empty() {
                self.handle_line(line)?;
            }
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<(), ClientError> {
        let frame: Frame = match serde_json::from_slice(line) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "malformed frame, skipping");
                return Ok(());
            },
        };
        for record in frame {
            if record.kind == RecordKind::Pattern {
                self.saw_match = true;
            }
            if record.kind == RecordKind::FilePath {
                self.close_pending_file();
                self.file_open = true;
                self.prev_line = 0;
                writeln!(self.writer, "{}", record.payload)?;
                if let Some(header) = self.renderer.render_header() {
                    writeln!(self.writer, "{header}")?;
                }
                continue;
            }
            if self.prev_line > 0 && record.line_num != self.prev_line + 1 {
                writeln!(self.writer, "--")?;
            }
            let text = if record.kind == RecordKind::Pattern {
                color::highlight(self.pattern_term, &record.payload, self.options.color)
            } else {
                record.payload.clone()
            };
            if self.options.line_number {
                writeln!(self.writer, "{}{}{}", record.line_num, record.kind.line_number_separator(), text)?;
            } else {
                writeln!(self.writer, "{text}")?;
            }
            self.prev_line = record.line_num;
        }
        Ok(())
    }

    fn close_pending_file(&mut self) {
        if self.file_open {
            if let Some(footer) = self.renderer.render_footer() {
                let _ = writeln!(self.writer, "{footer}");
            }
        }
    }

    fn finish(&mut self) {
        self.close_pending_file();
        self.file_open = false;
    }
}
