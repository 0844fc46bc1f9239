// fsgate - Errors
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Hard failures only. A policy block is NOT an error: it is an Outcome
// with kind Blocked (see outcome.rs).

use std::path::Path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

#[derive(Debug, Error)]
pub enum FsError {
    /// Malformed or disallowed input
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooLarge(String),

    /// Feature switched off in configuration
    #[error("{0}")]
    Disabled(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Fault class, used by the REST surface for status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    BadRequest,
    NotFound,
    PayloadTooLarge,
    NotImplemented,
    Internal,
}

impl FsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FsError::Validation(msg.into())
    }

    /// Wrap an io::Error with the operation and path it failed on
    pub fn io(op: &str, path: &Path, source: std::io::Error) -> Self {
        FsError::Io {
            context: format!("{} failed for {}", op, path.display()),
            source,
        }
    }

    pub fn fault_class(&self) -> FaultClass {
        match self {
            FsError::Validation(_) | FsError::UnknownTool(_) => FaultClass::BadRequest,
            FsError::NotFound(_) => FaultClass::NotFound,
            FsError::TooLarge(_) => FaultClass::PayloadTooLarge,
            FsError::Disabled(_) => FaultClass::NotImplemented,
            FsError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                FaultClass::NotFound
            }
            FsError::Io { .. } | FsError::Archive(_) | FsError::Image(_) => FaultClass::Internal,
        }
    }
}

/// Extension for attaching path context to io results
pub trait IoContext<T> {
    fn at(self, op: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, op: &str, path: &Path) -> Result<T> {
        self.map_err(|e| FsError::io(op, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_classes() {
        assert_eq!(FsError::validation("x").fault_class(), FaultClass::BadRequest);
        assert_eq!(FsError::NotFound("x".into()).fault_class(), FaultClass::NotFound);
        assert_eq!(FsError::Disabled("x".into()).fault_class(), FaultClass::NotImplemented);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = FsError::io("Read", Path::new("/x"), denied);
        assert_eq!(err.fault_class(), FaultClass::Internal);
        assert_eq!(err.to_string(), "Read failed for /x: nope");
    }
}
