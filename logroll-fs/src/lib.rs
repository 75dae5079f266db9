//! Filesystem abstraction for logroll.
//!
//! This crate provides:
//! - Filesystem trait for the handful of operations a rolling file sink needs
//! - RealFilesystem on top of `std::fs`, MockFilesystem for tests
//! - move_file, which moves (and optionally gzips) a rolled file into its
//!   backup slot while tolerating files locked by other processes

pub mod fs;
pub mod mover;

pub use fs::{
    CreateOptions, FileStat, Filesystem, FsError, MockFilesystem, MockReader, MockWriter,
    OpenMode, RealFilesystem, WriteHandle, DEFAULT_FILE_MODE,
};
pub use mover::{move_file, MoveOptions, MoveOutcome, DEFAULT_BACKUP_MODE};
