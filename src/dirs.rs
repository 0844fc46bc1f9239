// fsgate - Directory Operations
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// list_directory, create_directory, delete_directory, directory_tree.
// Listings put directories first, then files, each in case-insensitive
// name order. Hidden entries (leading '.') are skipped unless asked for.

use crate::config::ServerConfig;
use crate::error::{IoContext, Result};
use crate::gate::{self, Operation};
use crate::outcome::{format_size, Outcome};
use crate::paths;
use crate::validate::{validate_directory_path, validate_glob, validate_path, PathKind};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn default_true() -> bool {
    true
}

fn default_tree_depth() -> usize {
    3
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map(is_hidden_name).unwrap_or(false)
}

/// Directories first, then case-insensitive name
fn listing_order(a_dir: bool, a_name: &str, b_dir: bool, b_name: &str) -> Ordering {
    b_dir
        .cmp(&a_dir)
        .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
}

/// One directory level, already filtered and sorted
struct Child {
    name: String,
    path: PathBuf,
    is_dir: bool,
    size: Option<u64>,
}

fn read_children(dir: &Path, show_hidden: bool) -> std::io::Result<Vec<Child>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        if !show_hidden && is_hidden_name(&name) {
            continue;
        }
        let path = entry.path();
        // Follow symlinks for the kind, like a shell listing does
        let meta = fs::metadata(&path).ok();
        let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        let size = meta.filter(|m| m.is_file()).map(|m| m.len());
        children.push(Child { name, path, is_dir, size });
    }
    children.sort_by(|a, b| listing_order(a.is_dir, &a.name, b.is_dir, &b.name));
    Ok(children)
}

fn file_line(name: &str, size: Option<u64>) -> String {
    match size {
        Some(s) => format!("FILE {} ({})", name, format_size(s)),
        None => format!("FILE {}", name),
    }
}

// ============================================================================
// LIST
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListArgs {
    pub directory_path: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub show_hidden: bool,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Flat listings filter every entry by `pattern`; recursive listings
/// filter files only so the directory structure stays visible.
pub fn list_directory(args: &ListArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;
    let matcher = args
        .pattern
        .as_deref()
        .map(|p| validate_glob(p, true))
        .transpose()?;
    let warnings = gate::advisories(&[&dir], config);

    let mut lines = Vec::new();

    if args.recursive {
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .sort_by(|a, b| {
                let (an, bn) = (a.file_name().to_string_lossy(), b.file_name().to_string_lossy());
                listing_order(a.file_type().is_dir(), &an, b.file_type().is_dir(), &bn)
            })
            .into_iter()
            .filter_entry(|e| args.show_hidden || !is_hidden(e));

        for entry in walker.filter_map(|e| e.ok()) {
            let rel = paths::relative_to(entry.path(), &dir);
            if entry.file_type().is_dir() {
                lines.push(format!("DIR  {}/", rel));
                continue;
            }
            if let Some(m) = &matcher {
                if !m.is_match(entry.file_name()) {
                    continue;
                }
            }
            let size = entry.metadata().ok().map(|m| m.len());
            lines.push(file_line(&rel, size));
        }
    } else {
        for child in read_children(&dir, args.show_hidden).at("List", &dir)? {
            if let Some(m) = &matcher {
                if !m.is_match(&child.name) {
                    continue;
                }
            }
            if child.is_dir {
                lines.push(format!("DIR  {}/", child.name));
            } else {
                lines.push(file_line(&child.name, child.size));
            }
        }
    }

    let body = if lines.is_empty() {
        "(empty directory)".to_string()
    } else {
        lines.join("\n")
    };

    Ok(Outcome::success("Directory listed")
        .warnings(warnings)
        .field("Directory", dir.display())
        .field("Total items", lines.len())
        .body(body))
}

// ============================================================================
// CREATE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDirArgs {
    pub directory_path: String,
    #[serde(default = "default_true")]
    pub parents: bool,
}

pub fn create_directory(args: &CreateDirArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_path(&args.directory_path, false, PathKind::Any)?;
    let warnings = gate::advisories(&[&dir], config);

    if let Ok(meta) = fs::metadata(&dir) {
        if meta.is_dir() {
            return Ok(Outcome::success("Directory already exists")
                .warnings(warnings)
                .field("Path", dir.display()));
        }
        return Ok(Outcome::refused("Path exists but is not a directory")
            .field("Path", dir.display()));
    }

    if args.parents {
        fs::create_dir_all(&dir).at("Create directory", &dir)?;
    } else {
        fs::create_dir(&dir).at("Create directory", &dir)?;
    }

    Ok(Outcome::success("Directory created successfully")
        .warnings(warnings)
        .field("Path", dir.display()))
}

// ============================================================================
// DELETE
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteDirArgs {
    pub directory_path: String,
    #[serde(default)]
    pub recursive: bool,
}

pub fn delete_directory(args: &DeleteDirArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;

    let decision = gate::process(Operation::DeleteDirectory, &[&dir], config);
    if !decision.allowed {
        return Ok(decision.into_blocked_outcome());
    }

    if args.recursive {
        let items = WalkDir::new(&dir).min_depth(1).into_iter().filter_map(|e| e.ok()).count();
        fs::remove_dir_all(&dir).at("Delete directory", &dir)?;
        log::info!("Deleted directory {} ({} items)", dir.display(), items);
        return Ok(Outcome::success("Directory deleted successfully (recursive)")
            .warnings(decision.warnings)
            .field("Path", dir.display())
            .field("Items deleted", items));
    }

    let non_empty = fs::read_dir(&dir).at("List", &dir)?.next().is_some();
    if non_empty {
        return Ok(Outcome::refused("Directory is not empty")
            .field("Path", dir.display())
            .body("Use recursive=true to delete non-empty directories"));
    }

    fs::remove_dir(&dir).at("Delete directory", &dir)?;
    log::info!("Deleted directory {}", dir.display());
    Ok(Outcome::success("Directory deleted successfully")
        .warnings(decision.warnings)
        .field("Path", dir.display()))
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TreeArgs {
    pub directory_path: String,
    #[serde(default = "default_tree_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub show_hidden: bool,
}

fn build_tree(dir: &Path, prefix: &str, depth: usize, max_depth: usize, show_hidden: bool, lines: &mut Vec<String>) {
    if depth > max_depth {
        return;
    }
    let children = match read_children(dir, show_hidden) {
        Ok(c) => c,
        Err(e) => {
            lines.push(format!("{}(unreadable: {})", prefix, e));
            return;
        }
    };

    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        if child.is_dir {
            lines.push(format!("{}{}{}/", prefix, branch, child.name));
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            build_tree(&child.path, &next, depth + 1, max_depth, show_hidden, lines);
        } else {
            match child.size {
                Some(s) => lines.push(format!("{}{}{} ({})", prefix, branch, child.name, format_size(s))),
                None => lines.push(format!("{}{}{}", prefix, branch, child.name)),
            }
        }
    }
}

/// Depth is clamped to `max_tree_depth`
pub fn directory_tree(args: &TreeArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;
    let max_depth = args.max_depth.min(config.max_tree_depth);
    let warnings = gate::advisories(&[&dir], config);

    let mut lines = vec![format!("{}/", paths::display_name(&dir))];
    build_tree(&dir, "", 0, max_depth, args.show_hidden, &mut lines);

    Ok(Outcome::success("Directory tree")
        .warnings(warnings)
        .field("Directory", dir.display())
        .field("Max depth", max_depth)
        .body(lines.join("\n")))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeKind;
    use tempfile::TempDir;

    fn raw(p: &Path) -> String {
        p.to_str().unwrap().to_string()
    }

    fn sample() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("A.md"), "a").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/inner/deep.rs"), "").unwrap();
        dir
    }

    #[test]
    fn flat_listing_orders_dirs_first() {
        let dir = sample();
        let args = ListArgs { directory_path: raw(dir.path()), ..Default::default() };
        let out = list_directory(&args, &ServerConfig::default()).unwrap();
        assert_eq!(out.get("Total items"), Some("3"));
        let body = out.body.unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines, vec!["DIR  src/", "FILE A.md (1.00 B)", "FILE b.txt (1.00 B)"]);
    }

    #[test]
    fn hidden_and_pattern_filters() {
        let dir = sample();
        let args = ListArgs {
            directory_path: raw(dir.path()),
            show_hidden: true,
            pattern: Some("*.txt".into()),
            ..Default::default()
        };
        let body = list_directory(&args, &ServerConfig::default()).unwrap().body.unwrap();
        assert_eq!(body, "FILE b.txt (1.00 B)");

        let args = ListArgs { directory_path: raw(dir.path()), show_hidden: true, ..Default::default() };
        let body = list_directory(&args, &ServerConfig::default()).unwrap().body.unwrap();
        assert!(body.contains(".git/"));
    }

    #[test]
    fn recursive_listing_keeps_structure() {
        let dir = sample();
        let args = ListArgs {
            directory_path: raw(dir.path()),
            recursive: true,
            pattern: Some("*.rs".into()),
            ..Default::default()
        };
        let body = list_directory(&args, &ServerConfig::default()).unwrap().body.unwrap();
        assert!(body.contains("DIR  src/"));
        assert!(body.contains("main.rs"));
        assert!(body.contains("deep.rs"));
        assert!(!body.contains("b.txt"));
        assert!(!body.contains(".git"));
    }

    #[test]
    fn create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x/y");
        let args = CreateDirArgs { directory_path: raw(&target), parents: true };
        let config = ServerConfig::default();

        assert_eq!(create_directory(&args, &config).unwrap().headline, "Directory created successfully");
        assert_eq!(create_directory(&args, &config).unwrap().headline, "Directory already exists");

        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();
        let out = create_directory(&CreateDirArgs { directory_path: raw(&file), parents: true }, &config).unwrap();
        assert_eq!(out.kind, OutcomeKind::Refused);
    }

    #[test]
    fn non_empty_delete_needs_recursive() {
        let dir = sample();
        let target = dir.path().join("src");
        let config = ServerConfig::default();

        let out = delete_directory(&DeleteDirArgs { directory_path: raw(&target), recursive: false }, &config).unwrap();
        assert_eq!(out.kind, OutcomeKind::Refused);
        assert!(target.exists());

        let out = delete_directory(&DeleteDirArgs { directory_path: raw(&target), recursive: true }, &config).unwrap();
        assert_eq!(out.get("Items deleted"), Some("3"));
        assert!(!target.exists());
    }

    #[test]
    fn blocked_directory_is_not_deleted() {
        let dir = sample();
        let target = dir.path().join("src");
        let config = ServerConfig { blocked_directories: vec![target.clone()], ..Default::default() };
        let out = delete_directory(&DeleteDirArgs { directory_path: raw(&target), recursive: true }, &config).unwrap();
        assert_eq!(out.kind, OutcomeKind::Blocked);
        assert!(target.exists());
    }

    #[test]
    fn tree_respects_depth() {
        let dir = sample();
        let config = ServerConfig { max_tree_depth: 10, ..Default::default() };
        let args = TreeArgs { directory_path: raw(dir.path()), max_depth: 0, show_hidden: false };
        let out = directory_tree(&args, &config).unwrap();
        let body = out.body.unwrap();
        assert!(body.contains("├── src/"));
        assert!(body.contains("└── b.txt (1.00 B)"));
        assert!(!body.contains("main.rs"));

        let args = TreeArgs { max_depth: 50, ..args };
        let out = directory_tree(&args, &config).unwrap();
        assert_eq!(out.get("Max depth"), Some("10"));
        assert!(out.body.unwrap().contains("│   ├── inner/"));
    }
}
