// fsgate - Content Inspection
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Decides how file content is rendered:
// - Binary detection: extension table, MIME guess, content sniff
// - Text encodings: label validation, BOM/UTF-8 detection, decode/encode
// - File type descriptions for listings and info

use crate::config::BINARY_EXTENSIONS;
use crate::error::{FsError, Result};
use crate::paths;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_BYTES: usize = 8192;
const DETECT_BYTES: usize = 10 * 1024;

/// Bytes that count as text in the content sniff: BEL, BS, TAB, LF, FF, CR,
/// ESC and everything from 0x20 up.
fn is_text_byte(b: u8) -> bool {
    matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || b >= 0x20
}

/// MIME types outside `text/*` that still carry text
fn is_textual_mime(mime: &mime_guess::Mime) -> bool {
    if mime.type_() == mime_guess::mime::TEXT {
        return true;
    }
    let sub = mime.subtype().as_str();
    let suffix = mime.suffix().map(|s| s.as_str());
    mime.type_() == mime_guess::mime::APPLICATION
        && (matches!(
            sub,
            "json" | "javascript" | "ecmascript" | "xml" | "toml" | "x-sh" | "x-python"
                | "sql" | "x-httpd-php" | "x-yaml" | "yaml"
        ) || matches!(suffix, Some("json") | Some("xml")))
}

pub fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.essence_str().to_string())
}

/// Sniff a sample: any NUL byte, or more than 30% non-text bytes
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let non_text = sample.iter().filter(|b| !is_text_byte(**b)).count();
    non_text as f64 / sample.len() as f64 > 0.3
}

/// Binary by (a) extension, (b) MIME guess, (c) content sniff.
/// Unreadable files count as text; the read itself reports the error.
pub fn is_binary_file(path: &Path) -> bool {
    if let Some(ext) = paths::extension_lower(path) {
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }

    if let Some(mime) = mime_guess::from_path(path).first() {
        if !is_textual_mime(&mime) {
            return true;
        }
    }

    match read_head(path, SNIFF_BYTES) {
        Ok(sample) => looks_binary(&sample),
        Err(_) => false,
    }
}

fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    File::open(path)?.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Short description used by listings and file info
pub fn file_type(path: &Path) -> String {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return "unknown".to_string(),
    };
    if meta.file_type().is_symlink() {
        return "symlink".to_string();
    }
    if meta.is_dir() {
        return "directory".to_string();
    }
    if is_binary_file(path) {
        return guess_mime(path).unwrap_or_else(|| "binary".to_string());
    }
    "text".to_string()
}

// ============================================================================
// TEXT ENCODINGS
// ============================================================================

/// A validated text encoding
#[derive(Debug, Clone, Copy)]
pub struct TextEncoding {
    encoding: &'static Encoding,
}

impl TextEncoding {
    pub fn utf8() -> Self {
        Self { encoding: UTF_8 }
    }

    /// Resolve a caller-supplied label (`utf-8`, `UTF_8`, `latin-1`, `ascii`, `cp1252`)
    pub fn from_label(label: &str) -> Result<Self> {
        let lowered = label.trim().to_ascii_lowercase();
        let candidates = [
            lowered.clone(),
            lowered.replace('_', "-"),
            lowered.replace(['_', '-'], ""),
        ];
        candidates
            .iter()
            .find_map(|c| Encoding::for_label_no_replacement(c.as_bytes()))
            .map(|encoding| Self { encoding })
            .ok_or_else(|| FsError::validation(format!("Unknown encoding: {}", label)))
    }

    /// Canonical lower-case name (`utf-8`, `utf-16le`, `windows-1252`)
    pub fn name(&self) -> String {
        self.encoding.name().to_ascii_lowercase()
    }

    /// Strict decode: None when the bytes are not valid in this encoding.
    /// A leading BOM for this encoding is skipped.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let body = match Encoding::for_bom(bytes) {
            Some((enc, len)) if enc == self.encoding => &bytes[len..],
            _ => bytes,
        };
        self.encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|s| s.into_owned())
    }

    /// Lossy decode for line scanning (search skips nothing on bad bytes)
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Encode text; characters the encoding cannot represent are an error
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        if self.encoding == UTF_16LE {
            return Ok(text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect());
        }
        if self.encoding == UTF_16BE {
            return Ok(text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect());
        }
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(FsError::validation(format!(
                "Content contains characters that cannot be encoded as {}",
                self.name()
            )));
        }
        Ok(bytes.into_owned())
    }
}

/// Detect a file's encoding from its first 10 KiB: BOM, then UTF-8
/// validity, else windows-1252 (which decodes any byte sequence).
pub fn detect_encoding(path: &Path) -> std::io::Result<TextEncoding> {
    // One byte past the sample tells a cut sample from a short file
    let head = read_head(path, DETECT_BYTES + 1)?;
    Ok(detect_bytes(&head))
}

/// Same detection over bytes already in memory
pub fn detect_bytes(bytes: &[u8]) -> TextEncoding {
    let head = &bytes[..bytes.len().min(DETECT_BYTES)];
    if let Some((encoding, _)) = Encoding::for_bom(head) {
        return TextEncoding { encoding };
    }
    match std::str::from_utf8(head) {
        Ok(_) => TextEncoding::utf8(),
        // Sample cut mid-character: still UTF-8. A short file ending on a
        // lead byte was not cut, so it falls through.
        Err(e) if e.error_len().is_none() && bytes.len() > DETECT_BYTES => TextEncoding::utf8(),
        Err(_) => TextEncoding { encoding: WINDOWS_1252 },
    }
}

// ============================================================================
// TESTS
// ============================================================================
