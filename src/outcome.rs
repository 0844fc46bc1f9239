// fsgate - Operation Outcome
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Structured result of every handler. Display text is rendered at the
// boundary (MCP text block, REST envelope), never built inside handlers.

use crate::security::Warning;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// What the handler did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    /// Refused by security policy; the file-system action was never attempted
    Blocked,
    /// Declined for a non-policy reason (destination exists, not empty, ...)
    Refused,
}

/// Status as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Blocked,
    Refused,
}

impl Status {
    pub fn marker(self) -> &'static str {
        match self {
            Status::Success | Status::Warning => "OK",
            Status::Blocked => "BLOCKED",
            Status::Refused => "REFUSED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub headline: String,
    pub warnings: Vec<Warning>,
    /// Ordered `Key: value` metadata lines
    pub fields: Vec<(String, String)>,
    /// Free-form payload (file content, listing, tree, ...)
    pub body: Option<String>,
}

impl Outcome {
    pub fn success(headline: impl Into<String>) -> Self {
        Self::with_kind(OutcomeKind::Success, headline)
    }

    pub fn blocked(headline: impl Into<String>) -> Self {
        Self::with_kind(OutcomeKind::Blocked, headline)
    }

    pub fn refused(headline: impl Into<String>) -> Self {
        Self::with_kind(OutcomeKind::Refused, headline)
    }

    fn with_kind(kind: OutcomeKind, headline: impl Into<String>) -> Self {
        Self {
            kind,
            headline: headline.into(),
            warnings: Vec::new(),
            fields: Vec::new(),
            body: None,
        }
    }

    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a metadata field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn status(&self) -> Status {
        match self.kind {
            OutcomeKind::Blocked => Status::Blocked,
            OutcomeKind::Refused => Status::Refused,
            OutcomeKind::Success if self.warnings.is_empty() => Status::Success,
            OutcomeKind::Success => Status::Warning,
        }
    }

    /// Display text with a leading marker clients can parse:
    /// `BLOCKED:` / `REFUSED:` first line, or a `WARNING:`/`INFO:` block
    /// followed by `OK:`, or a bare `OK:` line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.kind {
            OutcomeKind::Blocked => {
                let _ = writeln!(out, "BLOCKED: {}", self.headline);
                out.push('\n');
                for w in &self.warnings {
                    let _ = writeln!(out, "{}", w);
                }
            }
            _ => {
                for w in &self.warnings {
                    let _ = writeln!(out, "{}", w);
                }
                if !self.warnings.is_empty() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{}: {}", self.status().marker(), self.headline);
            }
        }

        for (k, v) in &self.fields {
            let _ = writeln!(out, "{}: {}", k, v);
        }
        while out.ends_with('\n') {
            out.pop();
        }

        // Body goes out verbatim so file content survives the round trip
        if let Some(body) = &self.body {
            out.push_str("\n\n");
            out.push_str(body);
        }
        out
    }
}

/// Human-readable byte size, two decimals (`5.00 B`, `1.50 KB`)
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}

/// `1234567` -> `1,234,567`
pub fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::security::classify;
    use std::path::Path;

    #[test]
    fn pure_success_starts_with_ok() {
        let o = Outcome::success("File written successfully").field("Path", "/a/b.txt");
        assert_eq!(o.status(), Status::Success);
        assert_eq!(o.render(), "OK: File written successfully\nPath: /a/b.txt");
    }

    #[test]
    fn warnings_lead_and_flip_status() {
        let w = classify(Path::new("/etc/motd"), &ServerConfig::default()).warnings;
        let o = Outcome::success("File read").warnings(w);
        assert_eq!(o.status(), Status::Warning);
        let text = o.render();
        assert!(text.starts_with("WARNING: "));
        assert!(text.contains("\n\nOK: File read"));
    }

    #[test]
    fn blocked_marker_first() {
        let w = classify(Path::new("/etc/motd"), &ServerConfig::default()).warnings;
        let o = Outcome::blocked("Deletion blocked").warnings(w).body("File was NOT deleted.");
        let text = o.render();
        assert!(text.starts_with("BLOCKED: Deletion blocked\n\nWARNING: "));
        assert!(text.ends_with("File was NOT deleted."));
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(5), "5.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(with_commas(999), "999");
        assert_eq!(with_commas(1_234_567), "1,234,567");
    }

    #[test]
    fn body_keeps_trailing_newline() {
        let o = Outcome::success("File read").field("Type", "text").body("line\n");
        assert_eq!(o.render(), "OK: File read\nType: text\n\nline\n");
    }
}
