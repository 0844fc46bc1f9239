// fsgate - Copy / Move / Rename
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Copy is non-destructive: warnings are advisory. Move and rename remove
// the source, so both ends go through the gate. All three refuse to
// replace an existing destination unless `overwrite` is set.

use crate::config::ServerConfig;
use crate::error::{FsError, IoContext, Result};
use crate::files::ensure_parent;
use crate::gate::{self, Operation};
use crate::outcome::{format_size, Outcome};
use crate::paths;
use crate::validate::{validate_file_path, validate_filename, validate_path, PathKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferArgs {
    pub source_path: String,
    pub destination_path: String,
    #[serde(default)]
    pub overwrite: bool,
}

fn destination_exists(headline: &str, dest: &Path) -> Outcome {
    Outcome::refused(headline)
        .field("Path", dest.display())
        .body("Use overwrite=true to replace existing file")
}

pub fn copy_file(args: &TransferArgs, config: &ServerConfig) -> Result<Outcome> {
    let source = validate_file_path(&args.source_path, true)?;
    let dest = validate_path(&args.destination_path, false, PathKind::File)?;

    if paths::same_file(&source, &dest) {
        return Ok(Outcome::refused("Source and destination are the same file")
            .field("Path", source.display()));
    }
    if dest.exists() && !args.overwrite {
        return Ok(destination_exists("Destination already exists", &dest));
    }

    let warnings = gate::advisories(&[&source, &dest], config);
    ensure_parent(&dest)?;
    let copied = fs::copy(&source, &dest).at("Copy", &source)?;

    Ok(Outcome::success("File copied successfully")
        .warnings(warnings)
        .field("Source", source.display())
        .field("Destination", dest.display())
        .field("Size", format_size(copied)))
}

/// Rename, or copy + remove when the rename cannot cross file systems
fn relocate(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::debug!("rename {} failed ({}); trying copy", source.display(), rename_err);
            if fs::copy(source, dest).is_err() {
                return Err(FsError::io("Move", source, rename_err));
            }
            fs::remove_file(source).at("Remove source", source)
        }
    }
}

pub fn move_file(args: &TransferArgs, config: &ServerConfig) -> Result<Outcome> {
    let source = validate_file_path(&args.source_path, true)?;
    let dest = validate_path(&args.destination_path, false, PathKind::File)?;

    if dest.exists() && !args.overwrite {
        return Ok(destination_exists("Destination already exists", &dest));
    }

    let decision = gate::process(Operation::Move, &[&source, &dest], config);
    if !decision.allowed {
        return Ok(decision.into_blocked_outcome());
    }

    let size = fs::metadata(&source).at("Stat", &source)?.len();
    ensure_parent(&dest)?;
    relocate(&source, &dest)?;
    log::info!("Moved {} -> {}", source.display(), dest.display());

    Ok(Outcome::success("File moved successfully")
        .warnings(decision.warnings)
        .field("From", source.display())
        .field("To", dest.display())
        .field("Size", format_size(size)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenameArgs {
    pub file_path: String,
    pub new_name: String,
    #[serde(default)]
    pub overwrite: bool,
}

/// `new_name` is a bare filename; the file stays in its directory
pub fn rename_file(args: &RenameArgs, config: &ServerConfig) -> Result<Outcome> {
    let path = validate_file_path(&args.file_path, true)?;
    let new_name = validate_filename(&args.new_name)?;
    let new_path = match path.parent() {
        Some(parent) => parent.join(new_name),
        None => Path::new(new_name).to_path_buf(),
    };

    if new_path.exists() && !args.overwrite {
        return Ok(destination_exists("File with new name already exists", &new_path));
    }

    let decision = gate::process(Operation::Rename, &[&path, &new_path], config);
    if !decision.allowed {
        return Ok(decision.into_blocked_outcome());
    }

    fs::rename(&path, &new_path).at("Rename", &path)?;
    log::info!("Renamed {} -> {}", path.display(), new_name);

    Ok(Outcome::success("File renamed successfully")
        .warnings(decision.warnings)
        .field("Old name", paths::display_name(&path))
        .field("New name", new_name)
        .field("Full path", new_path.display()))
}
