// fsgate - Input Validator
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Validates raw tool input before anything touches the file system:
// - Path sanity + normalisation (empty, NUL bytes, existence, kind)
// - Bare filenames (no separators, no Windows reserved names)
// - Search patterns, glob patterns, compression levels
// Bad input is FsError::Validation; a missing path is NotFound and any
// other stat failure is Io.

use crate::error::{FsError, Result};
use crate::paths;
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Kind a validated path must have when it exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Any,
    File,
    Directory,
}

/// Validate and normalise a raw path.
///
/// Returns the absolute, dot-folded path. With `must_exist` the path has to
/// exist; with a `want` other than `Any` an existing path must also be of
/// that kind.
pub fn validate_path(raw: &str, must_exist: bool, want: PathKind) -> Result<PathBuf> {
    if raw.is_empty() {
        return Err(FsError::validation("Path cannot be empty"));
    }
    if raw.contains('\0') {
        return Err(FsError::validation("Path cannot contain null bytes"));
    }

    let abs = paths::normalize(Path::new(raw))
        .map_err(|e| FsError::validation(format!("Invalid path format: {}", e)))?;

    // One stat covers both the existence and the kind check
    match std::fs::metadata(&abs) {
        Ok(meta) => match want {
            PathKind::File if !meta.is_file() => {
                Err(FsError::validation(format!("Path is not a file: {}", raw)))
            }
            PathKind::Directory if !meta.is_dir() => {
                Err(FsError::validation(format!("Path is not a directory: {}", raw)))
            }
            _ => Ok(abs),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if must_exist {
                Err(FsError::NotFound(format!("Path does not exist: {}", raw)))
            } else {
                Ok(abs)
            }
        }
        Err(e) => Err(FsError::io("Stat", &abs, e)),
    }
}

pub fn validate_file_path(raw: &str, must_exist: bool) -> Result<PathBuf> {
    validate_path(raw, must_exist, PathKind::File)
}

pub fn validate_directory_path(raw: &str, must_exist: bool) -> Result<PathBuf> {
    validate_path(raw, must_exist, PathKind::Directory)
}

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Validate a bare filename (used by rename)
pub fn validate_filename(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(FsError::validation("Filename cannot be empty"));
    }
    if name.contains('/') || name.contains('\\') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(FsError::validation(format!(
            "Filename cannot contain path separators: {}", name
        )));
    }
    if name.contains('\0') {
        return Err(FsError::validation("Filename cannot contain null bytes"));
    }
    if name == "." || name == ".." {
        return Err(FsError::validation(format!("Invalid filename: {}", name)));
    }
    if cfg!(windows) && WINDOWS_RESERVED.contains(&name.to_ascii_uppercase().as_str()) {
        return Err(FsError::validation(format!("Filename uses reserved name: {}", name)));
    }
    Ok(name)
}

/// Compile a content search pattern
pub fn validate_search_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(FsError::validation("Search pattern cannot be empty"));
    }
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| FsError::validation(format!("Invalid regex pattern: {}", e)))
}

/// Compile a filename glob (`*.py`, `data_??.csv`, `[ab]*`)
pub fn validate_glob(pattern: &str, case_sensitive: bool) -> Result<GlobMatcher> {
    if pattern.is_empty() {
        return Err(FsError::validation("File pattern cannot be empty"));
    }
    GlobBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .literal_separator(false)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| FsError::validation(format!("Invalid file pattern '{}': {}", pattern, e)))
}

/// ZIP deflate level, 0-9
pub fn validate_compression_level(level: i64) -> Result<i64> {
    if !(0..=9).contains(&level) {
        return Err(FsError::validation(format!(
            "Compression level must be between 0 and 9, got {}", level
        )));
    }
    Ok(level)
}

// ============================================================================
// TESTS
// ============================================================================
