// fsgate - Search
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Content search (line scan of text files) and name search (glob over a
// recursive walk). Both stop walking as soon as the result cap is hit.
// Binary and unreadable files are skipped without failing the search.

use crate::config::ServerConfig;
use crate::error::{FsError, Result};
use crate::gate;
use crate::inspect;
use crate::outcome::{format_size, Outcome};
use crate::paths;
use crate::validate::{validate_directory_path, validate_glob, validate_search_pattern};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use walkdir::WalkDir;

fn default_file_pattern() -> String {
    "*".to_string()
}

/// Requested cap, bounded by the configured ceiling
fn result_cap(requested: Option<usize>, config: &ServerConfig) -> Result<usize> {
    match requested {
        Some(0) => Err(FsError::validation("max_results must be at least 1")),
        Some(n) => Ok(n.min(config.max_search_results)),
        None => Ok(config.max_search_results),
    }
}

/// Regular files under `dir` in a stable order, skipping unreadable entries
fn walk_files(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
}

fn truncation_note(cap: usize) -> String {
    format!("Showing first {} results. There may be more matches.", cap)
}

// ============================================================================
// CONTENT SEARCH
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ContentSearchArgs {
    pub directory_path: String,
    pub search_text: String,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineHit {
    /// Path relative to the search root
    pub file: String,
    pub line_number: usize,
    /// Line with trailing whitespace removed
    pub line: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentReport {
    pub files_searched: usize,
    pub hits: Vec<LineHit>,
    pub truncated: bool,
}

/// Scan every text file under `dir` whose name matches `file_pattern`
pub fn scan_content(dir: &Path, args: &ContentSearchArgs, cap: usize) -> Result<ContentReport> {
    if args.search_text.is_empty() {
        return Err(FsError::validation("Search text cannot be empty"));
    }
    let pattern = if args.regex {
        validate_search_pattern(&args.search_text, args.case_sensitive)?
    } else {
        validate_search_pattern(&regex::escape(&args.search_text), args.case_sensitive)?
    };
    let names = validate_glob(&args.file_pattern, true)?;

    let mut report = ContentReport::default();

    'files: for entry in walk_files(dir) {
        if !names.is_match(entry.file_name()) || inspect::is_binary_file(entry.path()) {
            continue;
        }
        report.files_searched += 1;

        let bytes = match std::fs::read(entry.path()) {
            Ok(b) => b,
            Err(e) => {
                log::debug!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let text = inspect::detect_bytes(&bytes).decode_lossy(&bytes);
        let rel = paths::relative_to(entry.path(), dir);

        for (idx, line) in text.lines().enumerate() {
            if !pattern.is_match(line) {
                continue;
            }
            report.hits.push(LineHit {
                file: rel.clone(),
                line_number: idx + 1,
                line: line.trim_end().to_string(),
            });
            if report.hits.len() >= cap {
                report.truncated = true;
                break 'files;
            }
        }
    }

    Ok(report)
}

pub fn search_in_files(args: &ContentSearchArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;
    let cap = result_cap(args.max_results, config)?;
    let warnings = gate::advisories(&[&dir], config);

    let report = scan_content(&dir, args, cap)?;

    let mut body = String::new();
    let mut current: Option<&str> = None;
    for hit in &report.hits {
        if current != Some(hit.file.as_str()) {
            if current.is_some() {
                body.push('\n');
            }
            let _ = writeln!(body, "{}:", hit.file);
            current = Some(hit.file.as_str());
        }
        let _ = writeln!(body, "  Line {}: {}", hit.line_number, hit.line);
    }
    if report.truncated {
        let _ = writeln!(body, "\n{}", truncation_note(cap));
    }

    let outcome = Outcome::success("Search completed")
        .warnings(warnings)
        .field("Directory", dir.display())
        .field("Search text", format!("'{}'", args.search_text))
        .field("Files searched", report.files_searched)
        .field("Matches found", report.hits.len());
    Ok(if body.is_empty() {
        outcome
    } else {
        outcome.body(body.trim_end().to_string())
    })
}

// ============================================================================
// NAME SEARCH
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FindArgs {
    pub directory_path: String,
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameHit {
    pub file: String,
    pub size: Option<u64>,
}

pub fn scan_names(dir: &Path, pattern: &str, case_sensitive: bool, cap: usize) -> Result<(Vec<NameHit>, bool)> {
    let matcher = validate_glob(pattern, case_sensitive)?;
    let mut hits = Vec::new();

    for entry in walk_files(dir) {
        if !matcher.is_match(entry.file_name()) {
            continue;
        }
        hits.push(NameHit {
            file: paths::relative_to(entry.path(), dir),
            size: entry.metadata().ok().map(|m| m.len()),
        });
        if hits.len() >= cap {
            return Ok((hits, true));
        }
    }
    Ok((hits, false))
}

pub fn find_files(args: &FindArgs, config: &ServerConfig) -> Result<Outcome> {
    let dir = validate_directory_path(&args.directory_path, true)?;
    let cap = result_cap(args.max_results, config)?;
    let warnings = gate::advisories(&[&dir], config);

    let (hits, truncated) = scan_names(&dir, &args.pattern, args.case_sensitive, cap)?;

    let mut lines: Vec<String> = hits
        .iter()
        .map(|h| match h.size {
            Some(s) => format!("{} ({})", h.file, format_size(s)),
            None => h.file.clone(),
        })
        .collect();
    if truncated {
        lines.push(String::new());
        lines.push(truncation_note(cap));
    }

    let outcome = Outcome::success("File search completed")
        .warnings(warnings)
        .field("Directory", dir.display())
        .field("Pattern", format!("'{}'", args.pattern))
        .field("Matches found", hits.len());
    Ok(if lines.is_empty() { outcome } else { outcome.body(lines.join("\n")) })
}

// ============================================================================
// COMBINED SEARCH
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilesArgs {
    pub directory_path: String,
    #[serde(default)]
    pub name_pattern: Option<String>,
    #[serde(default)]
    pub content_pattern: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Name search and/or literal content search over the same directory
pub fn search_files(args: &SearchFilesArgs, config: &ServerConfig) -> Result<Outcome> {
    let mut sections = Vec::new();

    if let Some(pattern) = args.name_pattern.as_deref().filter(|p| !p.is_empty()) {
        let find = FindArgs {
            directory_path: args.directory_path.clone(),
            pattern: pattern.to_string(),
            case_sensitive: false,
            max_results: args.max_results,
        };
        sections.push(find_files(&find, config)?.render());
    }

    if let Some(text) = args.content_pattern.as_deref().filter(|p| !p.is_empty()) {
        let search = ContentSearchArgs {
            directory_path: args.directory_path.clone(),
            search_text: text.to_string(),
            file_pattern: default_file_pattern(),
            case_sensitive: false,
            regex: false,
            max_results: args.max_results,
        };
        sections.push(search_in_files(&search, config)?.render());
    }

    if sections.is_empty() {
        return Ok(Outcome::refused(
            "No search criteria provided (name_pattern or content_pattern required)",
        ));
    }

    Ok(Outcome::success("Combined search completed")
        .field("Searches run", sections.len())
        .body(sections.join("\n\n")))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeKind;
    use std::fs;
    use tempfile::TempDir;

    fn content_args(dir: &Path, text: &str) -> ContentSearchArgs {
        ContentSearchArgs {
            directory_path: dir.to_str().unwrap().to_string(),
            search_text: text.to_string(),
            file_pattern: default_file_pattern(),
            case_sensitive: false,
            regex: false,
            max_results: None,
        }
    }

    #[test]
    fn finds_todo_on_line_one() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.txt"), "TODO: fix   \nnothing here\n").unwrap();

        let report = scan_content(dir.path(), &content_args(dir.path(), "TODO"), 100).unwrap();
        assert_eq!(report.files_searched, 1);
        assert_eq!(
            report.hits,
            vec![LineHit { file: "x.txt".into(), line_number: 1, line: "TODO: fix".into() }]
        );
    }

    #[test]
    fn literal_text_is_not_a_regex() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a.b\naxb\n").unwrap();
        let report = scan_content(dir.path(), &content_args(dir.path(), "a.b"), 100).unwrap();
        assert_eq!(report.hits.len(), 1);

        let mut args = content_args(dir.path(), "a.b");
        args.regex = true;
        assert_eq!(scan_content(dir.path(), &args, 100).unwrap().hits.len(), 2);
    }

    #[test]
    fn case_and_binary_handling() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello World\n").unwrap();
        fs::write(dir.path().join("b.bin"), [b'h', b'e', b'l', b'l', b'o', 0]).unwrap();

        let report = scan_content(dir.path(), &content_args(dir.path(), "hello"), 100).unwrap();
        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.files_searched, 1);

        let mut args = content_args(dir.path(), "hello");
        args.case_sensitive = true;
        assert!(scan_content(dir.path(), &args, 100).unwrap().hits.is_empty());
    }

    #[test]
    fn cap_stops_scan() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x\nx\nx\nx\n").unwrap();
        let config = ServerConfig { max_search_results: 2, ..Default::default() };
        let out = search_in_files(&content_args(dir.path(), "x"), &config).unwrap();
        assert_eq!(out.get("Matches found"), Some("2"));
        assert!(out.body.unwrap().contains("Showing first 2 results"));
    }

    #[test]
    fn name_search_walks_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("src/main.PY"), "").unwrap();
        fs::write(dir.path().join("src/deep/util.py"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let (hits, truncated) = scan_names(dir.path(), "*.py", false, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(!truncated);

        let (hits, _) = scan_names(dir.path(), "*.py", true, 10).unwrap();
        assert_eq!(hits.len(), 1);

        let (hits, truncated) = scan_names(dir.path(), "*", false, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(truncated);
    }

    #[test]
    fn combined_search_needs_criteria() {
        let dir = TempDir::new().unwrap();
        let args = SearchFilesArgs {
            directory_path: dir.path().to_str().unwrap().to_string(),
            name_pattern: None,
            content_pattern: None,
            max_results: None,
        };
        let out = search_files(&args, &ServerConfig::default()).unwrap();
        assert_eq!(out.kind, OutcomeKind::Refused);
    }
}
