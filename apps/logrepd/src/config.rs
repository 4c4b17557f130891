// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Config loading and the mtime-invalidated cache (C1).
//!
//! The Settings/profile document itself lives in `logrep_core::settings`;
//! this module is the daemon-side wrapper that knows about *files*: where
//! the document lives on disk, when to reparse it, and how ambient daemon
//! concerns (logging, HTTP binding) are configured alongside it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use arc_swap::ArcSwap;
use logrep_core::{ConfigDocument, LogrepError, Settings};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log file format options.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration for console and file output.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default)]
    pub console_enable: bool,
    #[serde(default)]
    pub file_enable: bool,
    #[serde(default)]
    pub console_level: LogLevel,
    #[serde(default)]
    pub file_level: LogLevel,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enable: true,
            file_enable: false,
            console_level: LogLevel::default(),
            file_level: LogLevel::Info,
            file_path: "./logrepd.log".to_string(),
            file_format: LogFormat::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:4545".to_string()
}

fn default_settings_path() -> String {
    "./logrep.toml".to_string()
}

/// Daemon-level configuration: where the Settings document lives, where to
/// bind, and how to log. The Settings document itself (profiles, defaults)
/// is reparsed separately by [`ConfigCache`], since it hot-reloads on
/// mtime/size change while this outer document is loaded once at startup.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DaemonConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { address: default_address(), settings_path: default_settings_path(), log: LogConfig::default() }
    }
}

/// Loads the daemon configuration from defaults, a TOML file, and
/// environment variables (`LOGREPD_` prefix, `__` as the nesting
/// separator).
///
/// # Errors
///
/// Returns an error if the file contains invalid TOML, or environment
/// overrides don't deserialize into `DaemonConfig`.
pub fn load_daemon_config(path: &str) -> Result<DaemonConfig, Box<figment::Error>> {
    use figment::providers::{Env, Format, Toml};
    use figment::Figment;

    let mut figment = Figment::new().merge(figment::providers::Serialized::defaults(DaemonConfig::default()));
    if Path::new(path).exists() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed("LOGREPD_").split("__")).extract().map_err(Box::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    mtime: SystemTime,
    size: u64,
}

fn stamp(path: &Path) -> std::io::Result<FileStamp> {
    let metadata = std::fs::metadata(path)?;
    Ok(FileStamp { mtime: metadata.modified()?, size: metadata.len() })
}

/// The Settings/profile document cache (C1): a single-writer mapping from
/// profile name to `Settings`, valid while `(mtime, size)` of the source
/// file is unchanged. Readers take a cheap `Arc` clone of the current
/// snapshot under the guard; the document is never mutated in place, only
/// atomically swapped, so an in-flight reader's reference stays valid even
/// if another request triggers a reparse.
pub struct ConfigCache {
    path: PathBuf,
    document: ArcSwap<ConfigDocument>,
    stamp: Mutex<Option<FileStamp>>,
}

impl ConfigCache {
    /// Loads the document for the first time.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::Io` if the file can't be read, or
    /// `LogrepError::Config` if it isn't valid TOML / references an
    /// unrecognized option.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LogrepError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        let document = ConfigDocument::parse(&text)?;
        let stamp = stamp(&path).ok();
        Ok(Self { path, document: ArcSwap::from_pointee(document), stamp: Mutex::new(stamp) })
    }

    /// Returns the effective `Settings` for `profile` (or top-level
    /// defaults if `None`), reparsing the source file first if its
    /// `(mtime, size)` has changed since the last read.
    ///
    /// # Errors
    ///
    /// Returns `LogrepError::UnknownProfile` if `profile` doesn't name a
    /// reachable profile, or a parse/IO error if reparsing the (changed)
    /// source file fails.
    pub fn effective(&self, profile: Option<&str>) -> Result<Settings, LogrepError> {
        self.refresh_if_stale()?;
        self.document.load().effective(profile)
    }

    fn refresh_if_stale(&self) -> Result<(), LogrepError> {
        let mut guard = self.stamp.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let current = stamp(&self.path)?;
        if *guard == Some(current) {
            return Ok(());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let document = ConfigDocument::parse(&text)?;
        self.document.store(Arc::new(document));
        *guard = Some(current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reloads_after_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logrep.toml");
        std::fs::write(&path, "pattern = \"one\"\n").unwrap();

        let cache = ConfigCache::load(&path).unwrap();
        let settings = cache.effective(None).unwrap();
        assert_eq!(settings.pattern.as_deref(), Some("one"));

        // Ensure the mtime actually advances on coarse-grained filesystems.
        std::thread::sleep(std::time::Duration::from_millis(10));
        let mut file = std::fs::OpenOptions::new().write(true).truncate(true).open(&path).unwrap();
        file.write_all(b"pattern = \"two\"\n").unwrap();
        drop(file);

        let settings = cache.effective(None).unwrap();
        assert_eq!(settings.pattern.as_deref(), Some("two"));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logrep.toml");
        std::fs::write(&path, "pattern = \"one\"\n").unwrap();
        let cache = ConfigCache::load(&path).unwrap();
        assert!(matches!(cache.effective(Some("missing")), Err(LogrepError::UnknownProfile(_))));
    }
}
