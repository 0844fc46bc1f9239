// fsgate - File Hashing
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Streaming digests in fixed-size chunks: md5, sha1, sha256, sha512.
// Anything else is rejected before the file is opened.

use crate::config::ServerConfig;
use crate::error::{FsError, IoContext, Result};
use crate::outcome::{format_size, Outcome};
use crate::validate::validate_file_path;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == lowered)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|a| a.name()).collect();
                FsError::validation(format!(
                    "Invalid hash algorithm: {}. Must be one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Feed `reader` through `update` in `chunk_size` pieces
fn stream<R: Read>(mut reader: R, chunk_size: usize, mut update: impl FnMut(&[u8])) -> std::io::Result<()> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            return Ok(());
        }
        update(&buffer[..n]);
    }
}

fn digest_with<D: Digest, R: Read>(reader: R, chunk_size: usize) -> std::io::Result<String> {
    let mut hasher = D::new();
    stream(reader, chunk_size, |chunk| hasher.update(chunk))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hex digest of any reader
pub fn digest_reader<R: Read>(reader: R, algorithm: HashAlgorithm, chunk_size: usize) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => {
            let mut context = md5::Context::new();
            stream(reader, chunk_size, |chunk| context.consume(chunk))?;
            Ok(format!("{:x}", context.compute()))
        }
        HashAlgorithm::Sha1 => digest_with::<sha1::Sha1, R>(reader, chunk_size),
        HashAlgorithm::Sha256 => digest_with::<sha2::Sha256, R>(reader, chunk_size),
        HashAlgorithm::Sha512 => digest_with::<sha2::Sha512, R>(reader, chunk_size),
    }
}

pub fn digest_file(path: &Path, algorithm: HashAlgorithm, chunk_size: usize) -> Result<String> {
    let file = File::open(path).at("Open", path)?;
    digest_reader(file, algorithm, chunk_size).at("Hash", path)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HashArgs {
    pub file_path: String,
    #[serde(default)]
    pub algorithm: Option<String>,
}

/// get_file_hash
pub fn get_file_hash(args: &HashArgs, config: &ServerConfig) -> Result<Outcome> {
    if !config.enable_hashing {
        return Err(FsError::Disabled("File hashing is disabled in configuration".into()));
    }
    let path = validate_file_path(&args.file_path, true)?;
    let algorithm: HashAlgorithm = args.algorithm.as_deref().unwrap_or("sha256").parse()?;

    let size = std::fs::metadata(&path).at("Stat", &path)?.len();
    let hash = digest_file(&path, algorithm, config.chunk_size)?;

    Ok(Outcome::success("File hash computed")
        .field("File", path.display())
        .field("Size", format_size(size))
        .field("Algorithm", algorithm.name().to_uppercase())
        .field("Hash", hash))
}
