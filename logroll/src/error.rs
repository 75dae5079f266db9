//! Error types for logroll.

use std::io;
use std::path::PathBuf;

use logroll_fs::FsError;
use thiserror::Error;

/// Invalid construction options. Raised before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file path is required")]
    MissingPath,

    #[error("maxSize ({0}) should be > 0")]
    InvalidMaxSize(u64),

    #[error("numToKeep ({0}) should be > 0")]
    InvalidNumToKeep(usize),

    #[error("daysToKeep ({0}) should be > 0")]
    InvalidDaysToKeep(u32),

    #[error("invalid date pattern {pattern:?}: {reason}")]
    InvalidDatePattern { pattern: String, reason: String },

    #[error("invalid file name separator {0:?}")]
    InvalidSeparator(String),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("cannot resolve relative path: {0}")]
    CurrentDir(#[source] io::Error),
}

/// Errors surfaced by the rolling stream.
#[derive(Debug, Error)]
pub enum RollError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Closing the hot file failed. The stream is closed afterwards.
    #[error("failed to close {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("stream is closed")]
    Closed,
}

impl From<io::Error> for RollError {
    fn from(err: io::Error) -> Self {
        RollError::Fs(FsError::Io(err))
    }
}

impl From<RollError> for io::Error {
    fn from(err: RollError) -> Self {
        match err {
            RollError::Fs(FsError::Io(e)) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
