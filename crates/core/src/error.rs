//! Error types for mtx-core
//!
//! Provides a closed error taxonomy that callers can match exhaustively and
//! convert to appropriate exit codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::traits::{ObjectHandle, TransportError};

/// Result type alias for mtx-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mtx-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Path or handle/path combination is malformed or does not resolve
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A directory scan found no child with the requested name
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Transport failure while reading object info, properties or handles
    #[error("Object access failed for handle {handle}: {source}")]
    ObjectAccess {
        handle: ObjectHandle,
        #[source]
        source: TransportError,
    },

    /// Failure while creating an object or streaming its bytes
    #[error("Failed to create '{name}': {source}")]
    ObjectCreate {
        name: String,
        #[source]
        source: CreateFailure,
    },

    /// Transport failure while deleting an object
    #[error("Failed to delete handle {handle}: {source}")]
    ObjectDelete {
        handle: ObjectHandle,
        #[source]
        source: TransportError,
    },

    /// Local filesystem failure other than a permission problem
    #[error("Local file error at {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local filesystem permission failure
    #[error("Permission denied at {}: {source}", .path.display())]
    FilePermission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Enumerating a directory's children failed during a walk
    #[error("Failed to list directory {handle}: {source}")]
    ListDirectory {
        handle: ObjectHandle,
        #[source]
        source: TransportError,
    },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Why an object could not be created
#[derive(Error, Debug)]
pub enum CreateFailure {
    /// The device rejected the object info or a data chunk
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading the local source failed mid-transfer
    #[error("reading source failed: {0}")]
    Source(#[source] std::io::Error),

    /// The source ran dry before the announced size was sent
    #[error("source ended after {sent} of {expected} bytes")]
    ShortSource { sent: u64, expected: u64 },
}

impl Error {
    /// Classify a local I/O failure, keeping permission problems apart
    pub fn local(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Error::FilePermission { path, source }
        } else {
            Error::LocalFile { path, source }
        }
    }

    /// Whether this is a name lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound(_))
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::ObjectAccess { .. } | Error::ListDirectory { .. } => 3, // DeviceError
            Error::FilePermission { .. } => 4,             // PermissionDenied
            Error::FileNotFound(_) => 5,                   // NotFound
            _ => 1,                                        // GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_exit_codes() {
        let transport = || TransportError::new("device busy");
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(
            Error::ObjectAccess {
                handle: ObjectHandle(7),
                source: transport()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            Error::ListDirectory {
                handle: ObjectHandle(7),
                source: transport()
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::FileNotFound("a".into()).exit_code(), 5);
        assert_eq!(
            Error::ObjectCreate {
                name: "a".into(),
                source: transport().into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_local_classification() {
        let err = Error::local("/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::FilePermission { .. }));
        assert_eq!(err.exit_code(), 4);

        let err = Error::local("/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::LocalFile { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPath("/bad/path".into());
        assert_eq!(err.to_string(), "Invalid path: /bad/path");

        let err = Error::ObjectAccess {
            handle: ObjectHandle(42),
            source: TransportError::new("timeout"),
        };
        assert_eq!(
            err.to_string(),
            "Object access failed for handle 42: timeout"
        );
    }

    #[test]
    fn test_object_create_keeps_cause() {
        use std::error::Error as _;

        let err = Error::ObjectCreate {
            name: "a.jpg".into(),
            source: TransportError::new("store full").into(),
        };
        assert_eq!(err.to_string(), "Failed to create 'a.jpg': store full");
        let cause = err.source().unwrap();
        assert!(matches!(
            cause.downcast_ref::<CreateFailure>(),
            Some(CreateFailure::Transport(t)) if t.message == "store full"
        ));

        let err = Error::ObjectCreate {
            name: "b.bin".into(),
            source: CreateFailure::Source(io::Error::other("disk gone")),
        };
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "reading source failed: disk gone");
        assert!(cause.source().unwrap().downcast_ref::<io::Error>().is_some());
    }
}
