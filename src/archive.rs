// fsgate - ZIP Archives
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// compress_file: single file or whole directory tree, deflate level 0-9.
// decompress_file: every entry is checked before anything is written.
// One entry resolving outside the output directory aborts the whole
// extraction with zero side effects.

use crate::config::ServerConfig;
use crate::error::{FsError, IoContext, Result};
use crate::files::ensure_parent;
use crate::gate;
use crate::outcome::{format_size, Outcome};
use crate::paths;
use crate::validate::{validate_compression_level, validate_file_path, validate_path, PathKind};
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn default_level() -> i64 {
    6
}

fn require_enabled(config: &ServerConfig) -> Result<()> {
    if config.enable_compression {
        Ok(())
    } else {
        Err(FsError::Disabled("Compression is disabled in configuration".into()))
    }
}

/// Entry name with `/` separators regardless of platform
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// COMPRESS
// ============================================================================

/// Level 0 stores entries as-is; deflate only takes levels 1-9
fn entry_options(level: i64) -> SimpleFileOptions {
    let options = SimpleFileOptions::default();
    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompressArgs {
    pub source_path: String,
    pub output_path: String,
    #[serde(default = "default_level")]
    pub compression_level: i64,
}

fn add_file(writer: &mut ZipWriter<File>, source: &Path, name: String, options: SimpleFileOptions) -> Result<u64> {
    writer.start_file(name, options)?;
    let mut input = File::open(source).at("Open", source)?;
    io::copy(&mut input, writer).at("Compress", source)
}

pub fn compress_file(args: &CompressArgs, config: &ServerConfig) -> Result<Outcome> {
    require_enabled(config)?;
    let source = validate_path(&args.source_path, true, PathKind::Any)?;
    let output = validate_path(&args.output_path, false, PathKind::File)?;
    let level = validate_compression_level(args.compression_level)?;
    if source.is_file() && paths::same_file(&source, &output) {
        return Ok(Outcome::refused("Output path is the source file")
            .field("Path", source.display())
            .body("Choose a different output_path; creating the archive would overwrite its own input"));
    }
    let warnings = gate::advisories(&[&source, &output], config);

    ensure_parent(&output)?;
    let options = entry_options(level);
    let mut writer = ZipWriter::new(File::create(&output).at("Create", &output)?);
    let mut files_added = 0usize;
    let mut original_size = 0u64;

    if source.is_file() {
        original_size += add_file(&mut writer, &source, paths::display_name(&source), options)?;
        files_added = 1;
    } else {
        let entries = WalkDir::new(&source)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            // the archive itself may live inside the tree being compressed
            .filter(|e| e.path() != output);
        for entry in entries {
            let relative = entry.path().strip_prefix(&source).unwrap_or(entry.path());
            original_size += add_file(&mut writer, entry.path(), entry_name(relative), options)?;
            files_added += 1;
        }
    }
    writer.finish()?;

    let compressed_size = fs::metadata(&output).at("Stat", &output)?.len();
    let ratio = if original_size > 0 {
        (1.0 - compressed_size as f64 / original_size as f64) * 100.0
    } else {
        0.0
    };
    log::info!("Compressed {} -> {} ({} files)", source.display(), output.display(), files_added);

    Ok(Outcome::success("Compression successful")
        .warnings(warnings)
        .field("Source", source.display())
        .field("Output", output.display())
        .field("Files compressed", files_added)
        .field("Original size", format_size(original_size))
        .field("Compressed size", format_size(compressed_size))
        .field("Compression ratio", format!("{:.1}%", ratio)))
}

// ============================================================================
// DECOMPRESS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DecompressArgs {
    pub archive_path: String,
    pub output_directory: String,
}

/// Planned write for one archive entry
struct Extraction {
    index: usize,
    target: PathBuf,
    is_dir: bool,
}

fn traversal_error(name: &str) -> FsError {
    FsError::validation(format!(
        "Archive entry '{}' resolves outside the output directory; \
         extraction cancelled to prevent path traversal",
        name
    ))
}

/// Resolve every entry under `output_dir`, or fail on the first unsafe one
fn plan_extraction(archive: &mut ZipArchive<File>, output_dir: &Path) -> Result<Vec<Extraction>> {
    let mut plan = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let relative = entry.enclosed_name().ok_or_else(|| traversal_error(entry.name()))?;
        let target = paths::normalize(&output_dir.join(&relative)).at("Resolve", &relative)?;
        if !paths::is_within(&target, output_dir) {
            return Err(traversal_error(entry.name()));
        }
        plan.push(Extraction { index, target, is_dir: entry.is_dir() });
    }
    Ok(plan)
}

pub fn decompress_file(args: &DecompressArgs, config: &ServerConfig) -> Result<Outcome> {
    require_enabled(config)?;
    let archive_path = validate_file_path(&args.archive_path, true)?;
    let output_dir = validate_path(&args.output_directory, false, PathKind::Directory)?;
    let warnings = gate::advisories(&[&archive_path, &output_dir], config);

    let file = File::open(&archive_path).at("Open", &archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        FsError::validation(format!("Not a valid ZIP file: {} ({})", archive_path.display(), e))
    })?;

    let plan = plan_extraction(&mut archive, &output_dir)?;

    fs::create_dir_all(&output_dir).at("Create directory", &output_dir)?;
    let mut files_extracted = 0usize;
    let mut extracted_size = 0u64;

    for step in &plan {
        if step.is_dir {
            fs::create_dir_all(&step.target).at("Create directory", &step.target)?;
            continue;
        }
        ensure_parent(&step.target)?;
        let mut entry = archive.by_index(step.index)?;
        let mut out = File::create(&step.target).at("Create", &step.target)?;
        extracted_size += io::copy(&mut entry, &mut out).at("Extract", &step.target)?;
        files_extracted += 1;
    }

    let archive_size = fs::metadata(&archive_path).at("Stat", &archive_path)?.len();
    log::info!("Extracted {} entries from {}", plan.len(), archive_path.display());

    Ok(Outcome::success("Extraction successful")
        .warnings(warnings)
        .field("Archive", archive_path.display())
        .field("Output directory", output_dir.display())
        .field("Files extracted", files_extracted)
        .field("Archive size", format_size(archive_size))
        .field("Extracted size", format_size(extracted_size)))
}

// ============================================================================
// TESTS
// ============================================================================
