// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The Settings/profile model (C1), shared by the server and the client.
//!
//! A configuration document is a TOML table whose top-level scalar keys are
//! the `#top-level` defaults, and whose nested tables are named profiles
//! (server) or sections (client) that override those defaults. Table names
//! starting with `#` are synthetic and are skipped as selectable profiles —
//! except the reserved `#top-level` identity itself, which holds the
//! document's defaults.

use crate::error::LogrepError;
use std::collections::HashMap;

/// The reserved profile name holding top-level defaults.
pub const TOP_LEVEL: &str = "#top-level";

/// Recognised option names, normalised (hyphens become underscores) before
/// lookup. Anything else in the document is rejected as unknown.
const RECOGNIZED_OPTIONS: &[&str] = &[
    "file_path",
    "timezone",
    "discard_before",
    "before_context",
    "after_context",
    "pattern",
    "except_pattern",
    "discard_after",
    "host",
    "port",
    "uuid",
    "ssl_keyfile",
    "ssl_keyfile_password",
    "ssl_certificate",
    "header_template",
    "footer_template",
    "template_processor",
];

/// One named bag of options: either the `#top-level` defaults or a profile
/// overlay. Every field is optional so that overlaying is a simple
/// "profile value wins if present" merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub file_path: Option<String>,
    pub timezone: Option<String>,
    pub discard_before: Option<String>,
    pub before_context: Option<i64>,
    pub after_context: Option<i64>,
    pub pattern: Option<String>,
    pub except_pattern: Option<String>,
    pub discard_after: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub uuid: Option<String>,
    pub ssl_keyfile: Option<String>,
    pub ssl_keyfile_password: Option<String>,
    pub ssl_certificate: Option<String>,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
    pub template_processor: Option<String>,
}

impl Settings {
    /// Overlays `other` on top of `self`: any field `other` sets wins,
    /// otherwise `self`'s value is kept. Used both for `top-level ∪
    /// profile` and for `profile ∪ request overrides`.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            file_path: other.file_path.clone().or_else(|| self.file_path.clone()),
            timezone: other.timezone.clone().or_else(|| self.timezone.clone()),
            discard_before: other.discard_before.clone().or_else(|| self.discard_before.clone()),
            before_context: other.before_context.or(self.before_context),
            after_context: other.after_context.or(self.after_context),
            pattern: other.pattern.clone().or_else(|| self.pattern.clone()),
            except_pattern: other.except_pattern.clone().or_else(|| self.except_pattern.clone()),
            discard_after: other.discard_after.clone().or_else(|| self.discard_after.clone()),
            host: other.host.clone().or_else(|| self.host.clone()),
            port: other.port.or(self.port),
            uuid: other.uuid.clone().or_else(|| self.uuid.clone()),
            ssl_keyfile: other.ssl_keyfile.clone().or_else(|| self.ssl_keyfile.clone()),
            ssl_keyfile_password: other
                .ssl_keyfile_password
                .clone()
                .or_else(|| self.ssl_keyfile_password.clone()),
            ssl_certificate: other.ssl_certificate.clone().or_else(|| self.ssl_certificate.clone()),
            header_template: other.header_template.clone().or_else(|| self.header_template.clone()),
            footer_template: other.footer_template.clone().or_else(|| self.footer_template.clone()),
            template_processor: other
                .template_processor
                .clone()
                .or_else(|| self.template_processor.clone()),
        }
    }

    /// Invariant (iv): at least one of discard_before, pattern, discard_after
    /// must be non-empty.
    #[must_use]
    pub fn has_any_predicate(&self) -> bool {
        non_empty(&self.discard_before) || non_empty(&self.pattern) || non_empty(&self.discard_after)
    }

    /// Sets a single recognised option from its normalised (underscored)
    /// name and raw string value. Used by both the TOML loader and the HTTP
    /// query/body decoder, which share the same option vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::Config` if `name` isn't recognised, or if a
    /// numeric option's value doesn't parse.
    pub fn set_raw(&mut self, name: &str, value: &str) -> Result<(), LogrepError> {
        match name {
            "file_path" => self.file_path = Some(value.to_string()),
            "timezone" => self.timezone = Some(value.to_string()),
            "discard_before" => self.discard_before = Some(value.to_string()),
            "before_context" => self.before_context = Some(parse_int(name, value)?),
            "after_context" => self.after_context = Some(parse_int(name, value)?),
            "pattern" => self.pattern = Some(value.to_string()),
            "except_pattern" => self.except_pattern = Some(value.to_string()),
            "discard_after" => self.discard_after = Some(value.to_string()),
            "host" => self.host = Some(value.to_string()),
            "port" => {
                self.port = Some(
                    value
                        .parse()
                        .map_err(|_| LogrepError::Config(format!("invalid port: {value}")))?,
                );
            },
            "uuid" => self.uuid = Some(value.to_string()),
            "ssl_keyfile" => self.ssl_keyfile = Some(value.to_string()),
            "ssl_keyfile_password" => self.ssl_keyfile_password = Some(value.to_string()),
            "ssl_certificate" => self.ssl_certificate = Some(value.to_string()),
            "header_template" => self.header_template = Some(value.to_string()),
            "footer_template" => self.footer_template = Some(value.to_string()),
            "template_processor" => self.template_processor = Some(value.to_string()),
            other => {
                return Err(LogrepError::Config(format!("unknown option: {other}")));
            },
        }
        Ok(())
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, LogrepError> {
    value.parse().map_err(|_| LogrepError::Config(format!("invalid {name}: {value}")))
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|s| !s.is_empty())
}

/// Normalises an option name's hyphens to underscores, per the config
/// model's documented normalisation rule.
#[must_use]
pub fn normalize_option_name(name: &str) -> String {
    name.replace('-', "_")
}

/// A fully parsed configuration document: the `#top-level` defaults plus
/// zero or more named, selectable profiles. Synthetic (`#`-prefixed) table
/// names other than `#top-level` are parsed but never exposed as
/// selectable — they simply don't appear in `profiles`.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    defaults: Settings,
    profiles: HashMap<String, Settings>,
}

impl ConfigDocument {
    #[must_use]
    pub const fn new(defaults: Settings, profiles: HashMap<String, Settings>) -> Self {
        Self { defaults, profiles }
    }

    #[must_use]
    pub const fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Resolves the effective Settings for a profile: `top-level ∪
    /// profile`, profile values overriding. `None` selects only the
    /// defaults. A name starting with `#` is never resolvable by a client,
    /// even if present internally.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::UnknownProfile` if `name` isn't defined (or is
    /// itself synthetic).
    pub fn effective(&self, name: Option<&str>) -> Result<Settings, LogrepError> {
        match name {
            None => Ok(self.defaults.clone()),
            Some(name) if name.starts_with('#') => {
                Err(LogrepError::UnknownProfile(name.to_string()))
            },
            Some(name) => {
                let profile = self
                    .profiles
                    .get(name)
                    .ok_or_else(|| LogrepError::UnknownProfile(name.to_string()))?;
                Ok(self.defaults.overlay(profile))
            },
        }
    }

    /// Parses a TOML document into a `ConfigDocument`. Top-level scalar
    /// keys become the `#top-level` defaults; table keys become profiles,
    /// except those starting with `#`, which are retained but unreachable
    /// by name through `effective`.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::Config` on invalid TOML syntax, an unrecognised
    /// option name, or a type mismatch (e.g. a string where an integer was
    /// expected).
    pub fn parse(text: &str) -> Result<Self, LogrepError> {
        let value: toml::Table =
            text.parse().map_err(|e| LogrepError::Config(format!("invalid TOML: {e}")))?;

        let mut defaults = Settings::default();
        let mut profiles = HashMap::new();

        for (key, value) in &value {
            match value {
                toml::Value::Table(table) => {
                    let settings = settings_from_table(table)?;
                    profiles.insert(key.clone(), settings);
                },
                scalar => {
                    let normalized = normalize_option_name(key);
                    apply_scalar(&mut defaults, &normalized, scalar)?;
                },
            }
        }

        Ok(Self::new(defaults, profiles))
    }
}

fn settings_from_table(table: &toml::Table) -> Result<Settings, LogrepError> {
    let mut settings = Settings::default();
    for (key, value) in table {
        let normalized = normalize_option_name(key);
        apply_scalar(&mut settings, &normalized, value)?;
    }
    Ok(settings)
}

fn apply_scalar(settings: &mut Settings, name: &str, value: &toml::Value) -> Result<(), LogrepError> {
    if !RECOGNIZED_OPTIONS.contains(&name) {
        return Err(LogrepError::Config(format!("unknown option: {name}")));
    }
    match name {
        "before_context" | "after_context" => {
            let n = value
                .as_integer()
                .ok_or_else(|| LogrepError::Config(format!("{name} must be an integer")))?;
            settings.set_raw(name, &n.to_string())?;
        },
        "port" => {
            let n = value
                .as_integer()
                .ok_or_else(|| LogrepError::Config("port must be an integer".to_string()))?;
            settings.set_raw(name, &n.to_string())?;
        },
        _ => {
            let s = value
                .as_str()
                .ok_or_else(|| LogrepError::Config(format!("{name} must be a string")))?;
            settings.set_raw(name, s)?;
        },
    }
    Ok(())
}
