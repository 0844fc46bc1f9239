// fsgate - File Operations
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// read_file, write_file, append_file, delete_file, file_exists,
// get_file_info, read_multiple_files.
// Deletion is the only destructive call here and goes through the gate.

use crate::config::ServerConfig;
use crate::error::{FsError, IoContext, Result};
use crate::gate::{self, Operation};
use crate::inspect::{self, TextEncoding};
use crate::outcome::{format_size, with_commas, Outcome};
use crate::security::Warning;
use crate::validate::{validate_file_path, validate_path, PathKind};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fs::{self, Metadata, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

const BATCH_SEPARATOR_WIDTH: usize = 70;

/// Create the parent directory of `path` when it is missing
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).at("Create directory", parent)
        }
        _ => Ok(()),
    }
}

// ============================================================================
// READ
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadArgs {
    pub file_path: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub as_base64: bool,
}

fn base64_outcome(path: &Path, bytes: &[u8], kind: &str, warnings: Vec<Warning>) -> Outcome {
    Outcome::success("File read")
        .warnings(warnings)
        .field("File", path.display())
        .field("Type", kind)
        .field("Size", format_size(bytes.len() as u64))
        .field("Encoding", "base64")
        .body(B64.encode(bytes))
}

/// Binary files (or `as_base64`) come back base64-encoded; text that
/// fails to decode falls back to base64 instead of failing.
pub fn read_file(args: &ReadArgs, config: &ServerConfig) -> Result<Outcome> {
    let path = validate_file_path(&args.file_path, true)?;
    let requested = args
        .encoding
        .as_deref()
        .map(TextEncoding::from_label)
        .transpose()?;
    let warnings = gate::advisories(&[&path], config);

    let bytes = fs::read(&path).at("Read", &path)?;

    if args.as_base64 || inspect::is_binary_file(&path) {
        return Ok(base64_outcome(&path, &bytes, "binary", warnings));
    }

    let encoding = requested.unwrap_or_else(|| inspect::detect_bytes(&bytes));
    match encoding.decode(&bytes) {
        Some(text) => Ok(Outcome::success("File read")
            .warnings(warnings)
            .field("File", path.display())
            .field("Type", "text")
            .field("Size", format_size(bytes.len() as u64))
            .field("Encoding", encoding.name())
            .body(text)),
        None => {
            log::debug!("{} is not valid {}; returning base64", path.display(), encoding.name());
            Ok(base64_outcome(&path, &bytes, "binary (failed to decode as text)", warnings))
        }
    }
}

// ============================================================================
// WRITE / APPEND
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteArgs {
    pub file_path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub is_base64: bool,
}

pub fn write_file(args: &WriteArgs, config: &ServerConfig) -> Result<Outcome> {
    let path = validate_path(&args.file_path, false, PathKind::File)?;
    let warnings = gate::advisories(&[&path], config);

    let (bytes, encoding) = if args.is_base64 {
        let decoded = B64
            .decode(args.content.trim())
            .map_err(|e| FsError::validation(format!("Failed to decode base64 content: {}", e)))?;
        (decoded, None)
    } else {
        let encoding = TextEncoding::from_label(args.encoding.as_deref().unwrap_or("utf-8"))?;
        (encoding.encode(&args.content)?, Some(encoding))
    };

    ensure_parent(&path)?;
    fs::write(&path, &bytes).at("Write", &path)?;

    let outcome = Outcome::success("File written successfully")
        .warnings(warnings)
        .field("Path", path.display());
    Ok(match encoding {
        Some(enc) => outcome
            .field("Type", "text")
            .field("Size", format_size(bytes.len() as u64))
            .field("Encoding", enc.name()),
        None => outcome
            .field("Type", "binary")
            .field("Size", format_size(bytes.len() as u64)),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendArgs {
    pub file_path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

pub fn append_file(args: &AppendArgs, config: &ServerConfig) -> Result<Outcome> {
    let path = validate_path(&args.file_path, false, PathKind::File)?;
    let encoding = TextEncoding::from_label(args.encoding.as_deref().unwrap_or("utf-8"))?;
    let warnings = gate::advisories(&[&path], config);
    let bytes = encoding.encode(&args.content)?;

    ensure_parent(&path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .at("Open", &path)?;
    file.write_all(&bytes).at("Append", &path)?;

    let new_size = fs::metadata(&path).at("Stat", &path)?.len();
    Ok(Outcome::success("Content appended successfully")
        .warnings(warnings)
        .field("Path", path.display())
        .field("New size", format_size(new_size))
        .field("Encoding", encoding.name()))
}

// ============================================================================
// DELETE
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathArgs {
    pub file_path: String,
}

pub fn delete_file(args: &PathArgs, config: &ServerConfig) -> Result<Outcome> {
    let path = validate_file_path(&args.file_path, true)?;

    let decision = gate::process(Operation::DeleteFile, &[&path], config);
    if !decision.allowed {
        return Ok(decision.into_blocked_outcome());
    }

    let size = fs::metadata(&path).at("Stat", &path)?.len();
    fs::remove_file(&path).at("Delete", &path)?;
    log::info!("Deleted {} ({} bytes)", path.display(), size);

    Ok(Outcome::success("File deleted successfully")
        .warnings(decision.warnings)
        .field("Path", path.display())
        .field("Size", format_size(size)))
}

// ============================================================================
// EXISTS / INFO
// ============================================================================

pub fn file_exists(args: &PathArgs, _config: &ServerConfig) -> Result<Outcome> {
    let path = validate_path(&args.file_path, false, PathKind::Any)?;

    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Ok(Outcome::success("File exists")
            .field("Path", path.display())
            .field("Exists", true)
            .field("Type", inspect::file_type(&path))
            .field("Size", format_size(meta.len()))),
        _ => Ok(Outcome::success("File does not exist")
            .field("Path", path.display())
            .field("Exists", false)),
    }
}

fn format_time(time: std::io::Result<SystemTime>) -> String {
    match time {
        Ok(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => "unknown".to_string(),
    }
}

/// `ls -l` style mode string
#[cfg(unix)]
pub fn permission_string(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'l'
    } else {
        '-'
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
pub fn permission_string(meta: &Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    if meta.permissions().readonly() {
        format!("{}r--r--r--", kind)
    } else {
        format!("{}rw-rw-rw-", kind)
    }
}

pub fn get_file_info(args: &PathArgs, _config: &ServerConfig) -> Result<Outcome> {
    let path = validate_file_path(&args.file_path, true)?;
    let meta = fs::metadata(&path).at("Stat", &path)?;

    Ok(Outcome::success("File information")
        .field("Path", path.display())
        .field("Type", inspect::file_type(&path))
        .field("Size", format!("{} ({} bytes)", format_size(meta.len()), with_commas(meta.len())))
        .field("Permissions", permission_string(&meta))
        .field("Created", format_time(meta.created()))
        .field("Modified", format_time(meta.modified()))
        .field("Accessed", format_time(meta.accessed())))
}

// ============================================================================
// BATCH READ
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadManyArgs {
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Cap checked before any read; each file's failure lands in its own slot
pub fn read_multiple_files(args: &ReadManyArgs, config: &ServerConfig) -> Result<Outcome> {
    let requested = args.file_paths.len();
    if requested > config.max_batch_files {
        return Err(FsError::validation(format!(
            "Too many files requested: {} (maximum {})",
            requested, config.max_batch_files
        )));
    }

    let separator = format!("\n{}\n", "=".repeat(BATCH_SEPARATOR_WIDTH));
    let mut sections = Vec::with_capacity(requested);
    let mut failed = 0usize;

    for file_path in &args.file_paths {
        let read = ReadArgs {
            file_path: file_path.clone(),
            encoding: args.encoding.clone(),
            as_base64: false,
        };
        match read_file(&read, config) {
            Ok(outcome) => sections.push(outcome.render()),
            Err(e) => {
                failed += 1;
                log::warn!("Batch read failed for {}: {}", file_path, e);
                sections.push(format!("ERROR: Error reading {}: {}", file_path, e));
            }
        }
    }

    Ok(Outcome::success("Multiple file read")
        .field("Files requested", requested)
        .field("Succeeded", requested - failed)
        .field("Failed", failed)
        .body(sections.join(&separator)))
}

// ============================================================================
// TESTS
// ============================================================================
