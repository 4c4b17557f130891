// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The file reader (C4): enumerates glob matches, then uniformly exposes
//! each match (or, for archives, each member inside it) as a named,
//! rewindable sequence of text lines.
//!
//! Archive members and compressed single files aren't generally seekable
//! once decompressed, so each logical stream is decoded fully into memory
//! up front; `rewind`/`seek_to_end` then just move a cursor over the
//! decoded lines. Log files are expected to be modest in size, and this
//! keeps the reader's shape uniform across plain, compressed, tar, and zip
//! inputs rather than special-casing true backward seeks per format.

use logrep_core::LogrepError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compressor {
    None,
    Gz,
    Bz2,
    Xz,
    Zst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Plain,
    Tar,
    Zip,
}

fn classify(path: &Path) -> (Container, Compressor) {
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();

    if name.ends_with(".zip") {
        return (Container::Zip, Compressor::None);
    }
    if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
        return (Container::Tar, Compressor::Gz);
    }
    if name.ends_with(".tbz") || name.ends_with(".tar.bz2") {
        return (Container::Tar, Compressor::Bz2);
    }
    if name.ends_with(".txz") || name.ends_with(".tar.xz") {
        return (Container::Tar, Compressor::Xz);
    }
    if name.ends_with(".tzst") || name.ends_with(".tar.zst") {
        return (Container::Tar, Compressor::Zst);
    }
    if name.ends_with(".tar") {
        return (Container::Tar, Compressor::None);
    }
    if name.ends_with(".gz") {
        return (Container::Plain, Compressor::Gz);
    }
    if name.ends_with(".bz2") {
        return (Container::Plain, Compressor::Bz2);
    }
    if name.ends_with(".xz") {
        return (Container::Plain, Compressor::Xz);
    }
    if name.ends_with(".zst") {
        return (Container::Plain, Compressor::Zst);
    }
    (Container::Plain, Compressor::None)
}

fn open_decoder(file: File, compressor: Compressor) -> std::io::Result<Box<dyn Read>> {
    Ok(match compressor {
        Compressor::None => Box::new(file),
        Compressor::Gz => Box::new(flate2::read::GzDecoder::new(file)),
        Compressor::Bz2 => Box::new(bzip2::read::BzDecoder::new(file)),
        Compressor::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        Compressor::Zst => Box::new(zstd::Decoder::new(file)?),
    })
}

/// Decodes UTF-8 with a byte-backslash-replace error handler: each invalid
/// byte renders as literal `\xNN` text (Python's `errors='backslashreplace'`)
/// rather than being collapsed into U+FFFD, so a pattern search over a
/// binary-contaminated line can still match the bytes it actually contains.
fn read_lossy(mut reader: impl Read) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(backslash_replace(&bytes))
}

fn backslash_replace(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            },
            Err(error) => {
                let valid_len = error.valid_up_to();
                out.push_str(std::str::from_utf8(&bytes[..valid_len]).unwrap_or_default());
                let bad_len = error.error_len().unwrap_or(bytes.len() - valid_len);
                for &byte in &bytes[valid_len..valid_len + bad_len] {
                    out.push_str(&format!("\\x{byte:02x}"));
                }
                bytes = &bytes[valid_len + bad_len..];
            },
        }
    }
    out
}

/// One named, rewindable sequence of text lines: a plain file, a
/// single-file-compressed file, or one member of a tar/zip archive.
#[derive(Debug)]
pub struct LineCursor {
    name: String,
    lines: Vec<String>,
    pos: usize,
}

impl LineCursor {
    fn new(name: String, text: &str) -> Self {
        Self { name, lines: text.lines().map(str::to_string).collect(), pos: 0 }
    }

    /// The stream's name: a plain path, or `archive#member`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the next `(1-indexed line_num, text)` pair, or `None` at
    /// end of stream.
    pub fn next_line(&mut self) -> Option<(u64, String)> {
        let line = self.lines.get(self.pos)?.clone();
        self.pos += 1;
        Some((self.pos as u64, line))
    }

    /// Returns to the start of the stream.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Skips to end of stream, so the next `next_line` call returns `None`.
    pub fn seek_to_end(&mut self) {
        self.pos = self.lines.len();
    }
}

/// Opens every logical stream carried by `path`: one for a plain or
/// singly-compressed file, or one per regular-file member for a tar/zip
/// archive, in archive order.
///
/// # Errors
///
/// Returns `LogrepError::Io` if `path` can't be opened, or
/// `LogrepError::Archive` if a zip/tar container itself can't be read (a
/// malformed individual *member* is logged and skipped instead).
pub fn open_logical_streams(path: &Path) -> Result<Vec<LineCursor>, LogrepError> {
    let (container, compressor) = classify(path);
    let display_name = path.display().to_string();

    match container {
        Container::Plain => {
            let file = File::open(path)?;
            let decoder = open_decoder(file, compressor)
                .map_err(|e| LogrepError::Decompress(e.to_string()))?;
            let text = read_lossy(decoder).map_err(|e| LogrepError::Decompress(e.to_string()))?;
            Ok(vec![LineCursor::new(display_name, &text)])
        },
        Container::Tar => {
            let file = File::open(path)?;
            let decoder = open_decoder(file, compressor)
                .map_err(|e| LogrepError::Decompress(e.to_string()))?;
            let mut archive = tar::Archive::new(decoder);
            let entries = archive.entries().map_err(|e| LogrepError::Archive(e.to_string()))?;

            let mut cursors = Vec::new();
            for entry in entries {
                let mut entry = match entry {
                    Ok(entry) => entry,
                    Err(error) => {
                        tracing::warn!(path = %display_name, %error, "skipping malformed tar member");
                        continue;
                    },
                };
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let member_path = match entry.path() {
                    Ok(p) => p.display().to_string(),
                    Err(error) => {
                        tracing::warn!(path = %display_name, %error, "skipping tar member with invalid name");
                        continue;
                    },
                };
                let text = match read_lossy(&mut entry) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(path = %display_name, member = %member_path, %error, "skipping unreadable tar member");
                        continue;
                    },
                };
                cursors.push(LineCursor::new(format!("{display_name}#{member_path}"), &text));
            }
            Ok(cursors)
        },
        Container::Zip => {
            let file = File::open(path)?;
            let mut archive =
                zip::ZipArchive::new(file).map_err(|e| LogrepError::Archive(e.to_string()))?;

            let mut cursors = Vec::new();
            for index in 0..archive.len() {
                let mut member = match archive.by_index(index) {
                    Ok(member) => member,
                    Err(error) => {
                        tracing::warn!(path = %display_name, %error, "skipping malformed zip member");
                        continue;
                    },
                };
                if member.is_dir() {
                    continue;
                }
                let member_name = member.name().to_string();
                let text = match read_lossy(&mut member) {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(path = %display_name, member = %member_name, %error, "skipping unreadable zip member");
                        continue;
                    },
                };
                cursors.push(LineCursor::new(format!("{display_name}#{member_name}"), &text));
            }
            Ok(cursors)
        },
    }
}

/// Enumerates files matching a glob pattern (the expanded `file_path`
/// setting), sorted by case-folded name with a stable tie-break on
/// original case — so `A.txt` sorts before `a.txt`.
///
/// # Errors
///
/// Returns `LogrepError::Config` if `pattern` isn't a valid glob.
pub fn enumerate_candidates(pattern: &str) -> Result<Vec<PathBuf>, LogrepError> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| LogrepError::Config(format!("invalid glob pattern: {e}")))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable glob entry");
                None
            },
        })
        .collect();

    paths.sort_by(|a, b| {
        let a_folded = a.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        let b_folded = b.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        a_folded.cmp(&b_folded).then_with(|| a.file_name().cmp(&b.file_name()))
    });

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn classifies_known_suffixes() {
        assert_eq!(classify(Path::new("a.log")), (Container::Plain, Compressor::None));
        assert_eq!(classify(Path::new("a.log.gz")), (Container::Plain, Compressor::Gz));
        assert_eq!(classify(Path::new("a.tar.gz")), (Container::Tar, Compressor::Gz));
        assert_eq!(classify(Path::new("a.tgz")), (Container::Tar, Compressor::Gz));
        assert_eq!(classify(Path::new("a.tar.bz2")), (Container::Tar, Compressor::Bz2));
        assert_eq!(classify(Path::new("a.tar.xz")), (Container::Tar, Compressor::Xz));
        assert_eq!(classify(Path::new("a.tar.zst")), (Container::Tar, Compressor::Zst));
        assert_eq!(classify(Path::new("a.tar")), (Container::Tar, Compressor::None));
        assert_eq!(classify(Path::new("a.zip")), (Container::Zip, Compressor::None));
    }

    #[test]
    fn cursor_rewind_and_seek_to_end() {
        let mut cursor = LineCursor::new("x".to_string(), "one\ntwo\nthree");
        assert_eq!(cursor.next_line(), Some((1, "one".to_string())));
        assert_eq!(cursor.next_line(), Some((2, "two".to_string())));
        cursor.rewind();
        assert_eq!(cursor.next_line(), Some((1, "one".to_string())));
        cursor.seek_to_end();
        assert_eq!(cursor.next_line(), None);
    }

    #[test]
    fn lines_strip_cr_and_lf() {
        let cursor = LineCursor::new("x".to_string(), "a\r\nb\nc\r\n");
        assert_eq!(cursor.lines, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn backslash_replace_escapes_invalid_bytes_in_place() {
        let mut bytes = b"valid \xff tail".to_vec();
        assert_eq!(backslash_replace(&bytes), "valid \\xff tail");

        bytes = vec![b'a', 0xc3, 0x28, b'b']; // 0xc3 0x28 is not valid UTF-8
        assert_eq!(backslash_replace(&bytes), "a\\xc3(b");
    }

    #[test]
    fn plain_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let mut streams = open_logical_streams(&path).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].next_line(), Some((1, "line one".to_string())));
        assert_eq!(streams[0].next_line(), Some((2, "line two".to_string())));
    }

    #[test]
    fn gz_file_decompresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(b"hello\nworld\n").unwrap();
        encoder.finish().unwrap();

        let mut streams = open_logical_streams(&path).unwrap();
        assert_eq!(streams[0].next_line(), Some((1, "hello".to_string())));
        assert_eq!(streams[0].next_line(), Some((2, "world".to_string())));
    }

    #[test]
    fn enumerate_sorts_case_folded_with_stable_tiebreak() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "A.txt", "a.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.txt", dir.path().display());
        let paths = enumerate_candidates(&pattern).unwrap();
        let names: Vec<_> =
            paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["A.txt", "a.txt", "b.txt"]);
    }
}
