// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The path templater (C2): expands `<FMT>` / `<FMT|KV,KV,...>` tokens in a
//! `file_path` setting into a concrete file name, under a resolved
//! timezone. The expanded value doubles as both a literal file name and a
//! glob pattern against its parent directory — that part lives in
//! [`crate::reader`].

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use chrono_tz::Tz;

/// A resolved timezone: an IANA zone, a fixed `UTC±HH:MM` offset, or the
/// host's local timezone (the fallback for malformed or empty input).
#[derive(Debug, Clone)]
pub enum ResolvedTimezone {
    Named(Tz),
    Offset(FixedOffset),
    Local,
}

impl ResolvedTimezone {
    /// Resolves a `timezone` setting value. Recognises an IANA zone name
    /// first, then the `±HH:MM` / `UTC±HH:MM` literal form (the sign of
    /// `HH` also governs `MM`'s sign), falling back to local time with a
    /// logged warning if neither parses and the input was non-empty.
    #[must_use]
    pub fn resolve(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Local;
        }
        if let Ok(tz) = raw.parse::<Tz>() {
            return Self::Named(tz);
        }
        if let Some(offset) = parse_offset(raw) {
            return Self::Offset(offset);
        }
        tracing::warn!(timezone = raw, "malformed timezone, falling back to local");
        Self::Local
    }

    fn format(&self, instant: DateTime<Utc>, fmt: &str) -> String {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).format(fmt).to_string(),
            Self::Offset(offset) => instant.with_timezone(offset).format(fmt).to_string(),
            Self::Local => instant.with_timezone(&Local).format(fmt).to_string(),
        }
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let rest = raw.strip_prefix("UTC").unwrap_or(raw);
    let mut chars = rest.chars();
    let sign = match chars.next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let rest = chars.as_str();
    let (hh_str, mm_str) = rest.split_once(':').unwrap_or((rest, "0"));
    let hh: i32 = hh_str.parse().ok()?;
    let mm: i32 = mm_str.parse().ok()?;
    FixedOffset::east_opt(sign * (hh * 3600 + mm * 60))
}

/// Expands every `<...>` token in `template` against `now`, under `tz`.
/// Text outside tokens, and an unterminated trailing `<`, pass through
/// unchanged.
#[must_use]
pub fn expand(template: &str, now: DateTime<Utc>, tz: &ResolvedTimezone) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('<') {
        match rest[start..].find('>') {
            Some(end_rel) => {
                out.push_str(&rest[..start]);
                let token = &rest[start + 1..start + end_rel];
                out.push_str(&expand_token(token, now, tz));
                rest = &rest[start + end_rel + 1..];
            },
            None => {
                out.push_str(rest);
                return out;
            },
        }
    }
    out.push_str(rest);
    out
}

fn expand_token(token: &str, now: DateTime<Utc>, tz: &ResolvedTimezone) -> String {
    let (fmt, delta) = match token.split_once('|') {
        Some((fmt, kvs)) => (fmt, parse_deltas(kvs)),
        None => (token, Duration::zero()),
    };
    tz.format(now + delta, fmt)
}

fn parse_deltas(kvs: &str) -> Duration {
    let mut total = Duration::zero();
    for kv in kvs.split(',') {
        let Some((key, value)) = kv.trim().split_once('=') else {
            continue;
        };
        let Ok(n) = value.trim().parse::<i64>() else {
            continue;
        };
        total += match key.trim() {
            "weeks" => Duration::weeks(n),
            "days" => Duration::days(n),
            "hours" => Duration::hours(n),
            "minutes" => Duration::minutes(n),
            "seconds" => Duration::seconds(n),
            _ => Duration::zero(),
        };
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn plain_offset_applies_sign_to_both_fields() {
        let tz = ResolvedTimezone::resolve("+02:00");
        assert!(matches!(tz, ResolvedTimezone::Offset(o) if o.local_minus_utc() == 2 * 3600));

        let tz = ResolvedTimezone::resolve("-03:30");
        let ResolvedTimezone::Offset(offset) = tz else { panic!("expected offset") };
        assert_eq!(offset.local_minus_utc(), -(3 * 3600 + 30 * 60));
    }

    #[test]
    fn utc_prefixed_offset_parses() {
        let ResolvedTimezone::Offset(offset) = ResolvedTimezone::resolve("UTC+12:45") else {
            panic!("expected offset");
        };
        assert_eq!(offset.local_minus_utc(), 12 * 3600 + 45 * 60);

        let ResolvedTimezone::Offset(offset) = ResolvedTimezone::resolve("UTC-11:00") else {
            panic!("expected offset");
        };
        assert_eq!(offset.local_minus_utc(), -11 * 3600);
    }

    #[test]
    fn iana_name_resolves_as_named() {
        assert!(matches!(ResolvedTimezone::resolve("Australia/Sydney"), ResolvedTimezone::Named(_)));
        assert!(matches!(ResolvedTimezone::resolve("America/Toronto"), ResolvedTimezone::Named(_)));
    }

    #[test]
    fn malformed_offset_falls_back_to_local() {
        assert!(matches!(ResolvedTimezone::resolve("UTC+99:99"), ResolvedTimezone::Local));
        assert!(matches!(ResolvedTimezone::resolve("not-a-zone"), ResolvedTimezone::Local));
    }

    #[test]
    fn empty_timezone_is_local() {
        assert!(matches!(ResolvedTimezone::resolve(""), ResolvedTimezone::Local));
    }

    #[test]
    fn expands_plain_format_token() {
        let tz = ResolvedTimezone::resolve("UTC+00:00");
        let out = expand("app-<%Y%m%d>.log", fixed_now(), &tz);
        assert_eq!(out, "app-20240315.log");
    }

    #[test]
    fn expands_token_with_delta() {
        let tz = ResolvedTimezone::resolve("UTC+00:00");
        let out = expand("app-<%Y%m%d|days=1>.log", fixed_now(), &tz);
        assert_eq!(out, "app-20240316.log");
    }

    #[test]
    fn text_outside_tokens_is_preserved() {
        let tz = ResolvedTimezone::resolve("UTC+00:00");
        let out = expand("prefix-<%H>-suffix", fixed_now(), &tz);
        assert_eq!(out, "prefix-12-suffix");
    }

    #[test]
    fn unterminated_token_passes_through() {
        let tz = ResolvedTimezone::resolve("UTC+00:00");
        let out = expand("app-<%Y", fixed_now(), &tz);
        assert_eq!(out, "app-<%Y");
    }
}
