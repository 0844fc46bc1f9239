// fsgate - Security Classifier + Size Guard
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Classifies a normalised path. Checks run independently and accumulate:
// 1. Allow-list: outside every allowed directory
// 2. Block-list: inside a blocked directory
// 3. System roots: under a compiled critical root (never overridable)
// 4. Extension: executable/script extension (overridable)
// 5. Size: existing files only; advisory, never blocks
//
// Whether a warning blocks is decided in gate.rs. This module only reports.

use crate::config::{ServerConfig, DANGEROUS_EXTENSIONS, SYSTEM_CRITICAL_PATHS};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Allow-list / block-list boundary
    SafetyBoundary,
    SystemCritical,
    DangerousExtension,
    SizeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
}

/// One self-contained warning: the message always names the path and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub category: Category,
    pub level: Level,
    pub message: String,
}

impl Warning {
    fn new(category: Category, level: Level, message: String) -> Self {
        Self { category, level, message }
    }

    /// Whether this warning can stop a destructive operation at all
    pub fn is_blocking_class(&self) -> bool {
        !matches!(self.category, Category::SizeLimit)
    }

    /// Whether the dangerous-operations override lifts this warning's block
    pub fn is_overridable(&self) -> bool {
        !matches!(self.category, Category::SystemCritical)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => write!(f, "INFO: {}", self.message),
            Level::Warning => write!(f, "WARNING: {}", self.message),
        }
    }
}

/// Every warning for one path, in check order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub warnings: Vec<Warning>,
}

impl Classification {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has(&self, category: Category) -> bool {
        self.warnings.iter().any(|w| w.category == category)
    }

    pub fn merge(mut self, other: Classification) -> Self {
        self.warnings.extend(other.warnings);
        self
    }
}

/// Run every check against an already-normalised path
pub fn classify(path: &Path, config: &ServerConfig) -> Classification {
    let mut warnings = Vec::new();

    if let Some(w) = check_allowed(path, config) {
        warnings.push(w);
    }
    if let Some(w) = check_blocked(path, config) {
        warnings.push(w);
    }
    if let Some(w) = check_system_critical(path) {
        warnings.push(w);
    }
    if let Some(w) = check_dangerous_extension(path) {
        warnings.push(w);
    }
    if path.is_file() {
        if let SizeCheck { advisory: Some(w), .. } = check_size(path, config) {
            warnings.push(w);
        }
    }

    Classification { warnings }
}

fn normalized_entries(entries: &[PathBuf]) -> impl Iterator<Item = PathBuf> + '_ {
    entries
        .iter()
        .map(|e| paths::normalize(e).unwrap_or_else(|_| e.clone()))
}

fn check_allowed(path: &Path, config: &ServerConfig) -> Option<Warning> {
    if config.allowed_directories.is_empty() {
        return None;
    }
    let inside = normalized_entries(&config.allowed_directories)
        .any(|dir| paths::is_within(path, &dir));
    if inside {
        return None;
    }
    Some(Warning::new(
        Category::SafetyBoundary,
        Level::Warning,
        format!("Path {} is outside allowed directories", path.display()),
    ))
}

fn check_blocked(path: &Path, config: &ServerConfig) -> Option<Warning> {
    let dir = normalized_entries(&config.blocked_directories)
        .find(|dir| paths::is_within(path, dir))?;
    Some(Warning::new(
        Category::SafetyBoundary,
        Level::Warning,
        format!("Path {} is in a blocked directory ({})", path.display(), dir.display()),
    ))
}

/// The critical root `path` falls under, if any
pub fn critical_root(path: &Path) -> Option<&'static str> {
    SYSTEM_CRITICAL_PATHS
        .iter()
        .copied()
        .find(|root| paths::is_within(path, Path::new(root)))
}

fn check_system_critical(path: &Path) -> Option<Warning> {
    let root = critical_root(path)?;
    Some(Warning::new(
        Category::SystemCritical,
        Level::Warning,
        format!(
            "This path ({}) is in a system-critical location ({}). \
             Modifying files here could damage your system.",
            path.display(),
            root
        ),
    ))
}

pub fn is_dangerous_extension(path: &Path) -> bool {
    paths::extension_lower(path)
        .map(|ext| DANGEROUS_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn check_dangerous_extension(path: &Path) -> Option<Warning> {
    if !is_dangerous_extension(path) {
        return None;
    }
    let ext = paths::extension_lower(path).unwrap_or_default();
    Some(Warning::new(
        Category::DangerousExtension,
        Level::Warning,
        format!(
            "This file ({}) has a potentially dangerous extension (.{}). \
             Exercise caution when modifying executable files.",
            path.display(),
            ext
        ),
    ))
}

// ============================================================================
// SIZE GUARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeCheck {
    pub within_limit: bool,
    pub advisory: Option<Warning>,
}

/// Compare a file's size against `max_file_size_mb`, with a soft threshold at
/// half the ceiling. Missing paths pass silently (nothing written yet).
pub fn check_size(path: &Path, config: &ServerConfig) -> SizeCheck {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return SizeCheck { within_limit: true, advisory: None },
    };
    size_verdict(path, size, config)
}

fn size_verdict(path: &Path, size: u64, config: &ServerConfig) -> SizeCheck {
    let ceiling = config.max_file_size_bytes();
    let size_mb = size as f64 / (1024.0 * 1024.0);

    if size > ceiling {
        return SizeCheck {
            within_limit: false,
            advisory: Some(Warning::new(
                Category::SizeLimit,
                Level::Warning,
                format!(
                    "File {} is {:.2} MB, which exceeds the configured limit of {} MB.",
                    path.display(),
                    size_mb,
                    config.max_file_size_mb
                ),
            )),
        };
    }

    if size * 2 > ceiling {
        return SizeCheck {
            within_limit: true,
            advisory: Some(Warning::new(
                Category::SizeLimit,
                Level::Info,
                format!(
                    "File {} is {:.2} MB, which is large. This operation may take some time.",
                    path.display(),
                    size_mb
                ),
            )),
        };
    }

    SizeCheck { within_limit: true, advisory: None }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> ServerConfig {
        ServerConfig { max_file_size_mb: 10, ..Default::default() }
    }

    #[test]
    fn critical_roots_detected() {
        assert_eq!(critical_root(Path::new("/etc/passwd")), Some("/etc"));
        assert_eq!(critical_root(Path::new("/usr/bin/ls")), Some("/usr/bin"));
        assert_eq!(critical_root(Path::new("/proc")), Some("/proc"));
        assert_eq!(critical_root(Path::new("/home/user/documents/file.txt")), None);
        assert_eq!(critical_root(Path::new("/etcetera/file")), None);
    }

    #[cfg(windows)]
    #[test]
    fn windows_critical_roots_detected() {
        assert!(critical_root(Path::new(r"C:\Windows\System32\important.dll")).is_some());
    }

    #[test]
    fn dangerous_extensions_case_insensitive() {
        assert!(is_dangerous_extension(Path::new("malware.exe")));
        assert!(is_dangerous_extension(Path::new("SCRIPT.BAT")));
        assert!(is_dangerous_extension(Path::new("/x/deploy.sh")));
        assert!(!is_dangerous_extension(Path::new("document.txt")));
        assert!(!is_dangerous_extension(Path::new("exe")));
    }

    #[test]
    fn clean_path_has_no_warnings() {
        let c = classify(Path::new("/home/user/notes.txt"), &config());
        assert!(c.is_clean(), "{:?}", c);
    }

    #[test]
    fn checks_accumulate() {
        let c = classify(Path::new("/etc/init.sh"), &config());
        assert!(c.has(Category::SystemCritical));
        assert!(c.has(Category::DangerousExtension));
        assert_eq!(c.warnings.len(), 2);
        assert!(c.warnings.iter().all(|w| w.message.contains("/etc/init.sh")));
    }

    #[test]
    fn allow_and_block_lists_both_evaluated() {
        let cfg = ServerConfig {
            allowed_directories: vec![PathBuf::from("/srv")],
            blocked_directories: vec![PathBuf::from("/srv/private")],
            ..config()
        };

        assert!(classify(Path::new("/srv/public/a.txt"), &cfg).is_clean());

        let inside_blocked = classify(Path::new("/srv/private/a.txt"), &cfg);
        assert_eq!(inside_blocked.warnings.len(), 1);
        assert!(inside_blocked.warnings[0].message.contains("blocked directory"));

        let outside = classify(Path::new("/opt/a.txt"), &cfg);
        assert!(outside.warnings[0].message.contains("outside allowed directories"));
    }

    #[test]
    fn size_guard_thresholds() {
        let cfg = config();
        let p = Path::new("/data/big.bin");
        let mb = 1024 * 1024;

        let small = size_verdict(p, 4 * mb, &cfg);
        assert!(small.within_limit && small.advisory.is_none());

        let large = size_verdict(p, 6 * mb, &cfg);
        assert!(large.within_limit);
        assert_eq!(large.advisory.as_ref().map(|w| w.level), Some(Level::Info));

        let over = size_verdict(p, 11 * mb, &cfg);
        assert!(!over.within_limit);
        assert_eq!(over.advisory.as_ref().map(|w| w.level), Some(Level::Warning));
        assert!(!over.advisory.unwrap().is_blocking_class());
    }

    #[test]
    fn size_guard_ignores_missing_files() {
        let dir = TempDir::new().unwrap();
        let check = check_size(&dir.path().join("later.txt"), &config());
        assert_eq!(check, SizeCheck { within_limit: true, advisory: None });
    }

    #[test]
    fn rendering_carries_level_marker() {
        let c = classify(Path::new("/etc/hosts"), &config());
        assert!(c.warnings[0].to_string().starts_with("WARNING: "));
    }
}
