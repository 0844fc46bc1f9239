// fsgate - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Server limits, feature toggles, allow/block directories.
// Built once at startup (defaults -> JSON file -> environment) and passed
// by reference to every handler. Static lookup tables live here too.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Master gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,

    // File size limits (MB)
    pub max_file_size_mb: u64,
    pub max_batch_files: usize,
    pub max_search_results: usize,

    // Images
    pub max_image_size_mb: u64,
    pub enable_image_compression: bool,
    pub max_image_dimension: u32,
    pub image_quality: u8,

    // Security
    pub enable_dangerous_operations: bool,
    pub allowed_directories: Vec<PathBuf>,
    pub blocked_directories: Vec<PathBuf>,

    // Performance
    pub chunk_size: usize,
    pub max_tree_depth: usize,

    // Features
    pub enable_compression: bool,
    pub enable_hashing: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            max_file_size_mb: 100,
            max_batch_files: 50,
            max_search_results: 1000,
            max_image_size_mb: 15,
            enable_image_compression: true,
            max_image_dimension: 1920,
            image_quality: 85,
            enable_dangerous_operations: false,
            allowed_directories: Vec::new(),
            blocked_directories: Vec::new(),
            chunk_size: 8192,
            max_tree_depth: 10,
            enable_compression: true,
            enable_hashing: true,
        }
    }
}

impl ServerConfig {
    /// Load config from JSON file, falling back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config JSON in {:?}", path))?;
            Ok(config)
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables on top of the current values.
    /// Unset variables leave the field untouched; malformed ones are an error.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, get: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = get("LOG_FILE") {
            self.log_file = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }

        set_parsed(&get, "MAX_FILE_SIZE_MB", &mut self.max_file_size_mb)?;
        set_parsed(&get, "MAX_BATCH_FILES", &mut self.max_batch_files)?;
        set_parsed(&get, "MAX_SEARCH_RESULTS", &mut self.max_search_results)?;
        set_parsed(&get, "MAX_IMAGE_SIZE_MB", &mut self.max_image_size_mb)?;
        set_parsed(&get, "MAX_IMAGE_DIMENSION", &mut self.max_image_dimension)?;
        set_parsed(&get, "IMAGE_QUALITY", &mut self.image_quality)?;
        set_parsed(&get, "CHUNK_SIZE", &mut self.chunk_size)?;
        set_parsed(&get, "MAX_TREE_DEPTH", &mut self.max_tree_depth)?;

        set_flag(&get, "ENABLE_IMAGE_COMPRESSION", &mut self.enable_image_compression)?;
        set_flag(&get, "ENABLE_DANGEROUS_OPERATIONS", &mut self.enable_dangerous_operations)?;
        set_flag(&get, "ENABLE_COMPRESSION", &mut self.enable_compression)?;
        set_flag(&get, "ENABLE_HASHING", &mut self.enable_hashing)?;

        if let Some(v) = get("ALLOWED_DIRECTORIES") {
            self.allowed_directories = split_dirs(&v);
        }
        if let Some(v) = get("BLOCKED_DIRECTORIES") {
            self.blocked_directories = split_dirs(&v);
        }

        if self.chunk_size == 0 {
            return Err(anyhow!("CHUNK_SIZE must be greater than zero"));
        }
        if !(1..=100).contains(&self.image_quality) {
            return Err(anyhow!("IMAGE_QUALITY must be between 1 and 100, got {}", self.image_quality));
        }
        Ok(())
    }

    /// Save config to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_image_size_bytes(&self) -> u64 {
        self.max_image_size_mb.saturating_mul(1024 * 1024)
    }
}

fn set_parsed<F, T>(get: &F, key: &str, slot: &mut T) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))?;
    }
    Ok(())
}

fn set_flag<F>(get: &F, key: &str, slot: &mut bool) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *slot = parse_flag(&raw)
            .ok_or_else(|| anyhow!("Invalid boolean for {}: '{}'", key, raw))?;
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn split_dirs(raw: &str) -> Vec<PathBuf> {
    std::env::split_paths(raw)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

// ============================================================================
// STATIC TABLES (compiled, not configurable)
// ============================================================================

/// System-critical roots. A path under any of these can never be the target
/// of a destructive operation.
pub const SYSTEM_CRITICAL_PATHS: &[&str] = &[
    // Windows
    r"C:\Windows\System32",
    r"C:\Windows\SysWOW64",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    // Unix/Linux
    "/etc",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/boot",
    "/sys",
    "/proc",
    // macOS
    "/System",
    "/Library/System",
];

/// Executable/script extensions (lower-case, without dot)
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "vbs", "js", "jar",
    "dll", "sys", "drv", "ocx", "cpl", "msi", "ps1", "sh",
];

/// Extensions always treated as binary content
pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "dat", "db", "sqlite",
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", "svg",
    "mp3", "mp4", "avi", "mov", "wav", "flac", "mkv", "wmv",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "zip", "rar", "7z", "tar", "gz", "bz2", "xz",
];

/// Extensions served by the image tools
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "tiff", "tif",
];

/// Absolute ceiling for returning an image uncompressed after a failed
/// compression attempt.
pub const IMAGE_HARD_LIMIT_BYTES: u64 = 20 * 1024 * 1024;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = ServerConfig::default();
        config.apply_vars(|k| vars.get(k).cloned())?;
        Ok(config)
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = ServerConfig::default();
        assert_eq!(config.max_file_size_mb, 100);
        assert_eq!(config.max_batch_files, 50);
        assert_eq!(config.max_search_results, 1000);
        assert_eq!(config.max_image_dimension, 1920);
        assert!(!config.enable_dangerous_operations);
        assert!(config.enable_compression && config.enable_hashing);
        assert!(config.allowed_directories.is_empty());
    }

    #[test]
    fn env_overlay_parses_numbers_and_flags() {
        let config = apply(&[
            ("MAX_FILE_SIZE_MB", "10"),
            ("ENABLE_DANGEROUS_OPERATIONS", "TRUE"),
            ("ENABLE_HASHING", "0"),
            ("LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
        assert!(config.enable_dangerous_operations);
        assert!(!config.enable_hashing);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn huge_limits_saturate() {
        let max = "18446744073709551615";
        let config = apply(&[("MAX_FILE_SIZE_MB", max), ("MAX_IMAGE_SIZE_MB", max)]).unwrap();
        assert_eq!(config.max_file_size_bytes(), u64::MAX);
        assert_eq!(config.max_image_size_bytes(), u64::MAX);
    }

    #[test]
    fn env_overlay_rejects_garbage() {
        assert!(apply(&[("MAX_BATCH_FILES", "lots")]).is_err());
        assert!(apply(&[("ENABLE_COMPRESSION", "maybe")]).is_err());
        assert!(apply(&[("CHUNK_SIZE", "0")]).is_err());
    }

    #[test]
    fn directory_lists_split_on_os_separator() {
        let joined = std::env::join_paths(["/srv/data", "/home/me"]).unwrap();
        let config = apply(&[("ALLOWED_DIRECTORIES", joined.to_str().unwrap())]).unwrap();
        assert_eq!(
            config.allowed_directories,
            vec![PathBuf::from("/srv/data"), PathBuf::from("/home/me")]
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{"max_tree_depth": 4}"#).unwrap();
        assert_eq!(config.max_tree_depth, 4);
        assert_eq!(config.max_batch_files, 50);
    }
}
