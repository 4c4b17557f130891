// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Header/footer rendering (C10): named-placeholder templates substituted
//! against the current time and a reconstructed command line.

use chrono::{DateTime, Local, Utc};
use logrep_core::{ansi, LogrepError, Settings};
use logrep_engine::ResolvedTimezone;

const ASCTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named transform applied to each rendered placeholder value before
/// substitution. The registry is the systems-language stand-in for a
/// `module:function` dynamic lookup: unknown names are rejected up front
/// rather than failing lazily at render time.
#[derive(Debug, Clone, Copy)]
enum TemplateProcessor {
    HtmlEscape,
    StripAnsi,
}

impl TemplateProcessor {
    fn lookup(name: &str) -> Result<Self, LogrepError> {
        match name {
            "html_escape" => Ok(Self::HtmlEscape),
            "strip_ansi" => Ok(Self::StripAnsi),
            other => Err(LogrepError::Config(format!("unknown template_processor: {other}"))),
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            Self::HtmlEscape => html_escape(value),
            Self::StripAnsi => ansi::strip_ansi_codes(value),
        }
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders header/footer templates for one search request.
pub struct Renderer {
    header_template: Option<String>,
    footer_template: Option<String>,
    timezone: ResolvedTimezone,
    processor: Option<TemplateProcessor>,
    command: String,
}

impl Renderer {
    /// # Errors
    ///
    /// Returns `LogrepError::Config` if `template_processor` names an
    /// unrecognised transform.
    pub fn from_settings(settings: &Settings) -> Result<Self, LogrepError> {
        let processor = settings.template_processor.as_deref().map(TemplateProcessor::lookup).transpose()?;
        Ok(Self {
            header_template: settings.header_template.clone(),
            footer_template: settings.footer_template.clone(),
            timezone: ResolvedTimezone::resolve(settings.timezone.as_deref().unwrap_or("")),
            processor,
            command: reconstruct_command(settings),
        })
    }

    #[must_use]
    pub fn render_header(&self) -> Option<String> {
        self.header_template.as_deref().map(|t| self.render(t))
    }

    #[must_use]
    pub fn render_footer(&self) -> Option<String> {
        self.footer_template.as_deref().map(|t| self.render(t))
    }

    fn render(&self, template: &str) -> String {
        let asctime = self.value_of(&format_asctime(&self.timezone, Utc::now()));
        let command = self.value_of(&self.command);
        template.replace("{asctime}", &asctime).replace("{command}", &command)
    }

    fn value_of(&self, raw: &str) -> String {
        match self.processor {
            Some(processor) => processor.apply(raw),
            None => raw.to_string(),
        }
    }
}

fn format_asctime(tz: &ResolvedTimezone, now: DateTime<Utc>) -> String {
    match tz {
        ResolvedTimezone::Named(zone) => now.with_timezone(zone).format(ASCTIME_FORMAT).to_string(),
        ResolvedTimezone::Offset(offset) => now.with_timezone(offset).format(ASCTIME_FORMAT).to_string(),
        ResolvedTimezone::Local => now.with_timezone(&Local).format(ASCTIME_FORMAT).to_string(),
    }
}

/// Rebuilds a shell-quoted command line from the effective Settings, the
/// way `{command}` is meant to read in a rendered header: the flags that
/// actually drove this search, nothing else.
fn reconstruct_command(settings: &Settings) -> String {
    let mut parts = vec!["logrep".to_string()];
    let mut push = |flag: &str, value: &str| {
        if !value.is_empty() {
            parts.push(flag.to_string());
            parts.push(shell_quote(value));
        }
    };
    if let Some(v) = &settings.discard_before {
        push("--discard-before", v);
    }
    if let Some(v) = settings.before_context {
        push("--before-context", &v.to_string());
    }
    if let Some(v) = &settings.pattern {
        push("--pattern", v);
    }
    if let Some(v) = &settings.except_pattern {
        push("--except-pattern", v);
    }
    if let Some(v) = settings.after_context {
        push("--after-context", &v.to_string());
    }
    if let Some(v) = &settings.discard_after {
        push("--discard-after", v);
    }
    parts.join(" ")
}

/// Minimal POSIX single-quote escaping: safe for any byte sequence.
fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=".contains(c)) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
