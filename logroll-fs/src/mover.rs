//! Moving a rolled file into its backup slot.
//!
//! A move is either a plain rename or a gzip copy into the target followed by
//! removal of the source. Both paths tolerate the failures that show up when
//! another process still has the file open or is rotating the same files:
//!
//! - rename fails: copy the content, then truncate the source in place
//! - compressed target already exists: another writer won the race, leave
//!   everything as it is
//! - source can't be removed after compressing: truncate it instead
//! - reading the source fails mid-stream: remove the partial target, keep the
//!   source untouched

use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use crate::fs::{Filesystem, FsError, WriteHandle};

/// Default permission bits for compressed backups.
pub const DEFAULT_BACKUP_MODE: u32 = 0o600;

/// Options for [`move_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOptions {
    /// Gzip the source into the target instead of renaming it.
    pub compress: bool,

    /// Permission bits of a compressed target.
    pub mode: u32,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            compress: false,
            mode: DEFAULT_BACKUP_MODE,
        }
    }
}

impl MoveOptions {
    pub fn new(compress: bool, mode: u32) -> Self {
        Self { compress, mode }
    }

    /// Enable gzip compression of the target.
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }
}

/// What [`move_file`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and target are the same path; nothing to do.
    SamePath,
    /// Source doesn't exist; nothing to do.
    SourceMissing,
    Renamed,
    /// Rename failed, so the content was copied and the source truncated.
    CopiedAndTruncated,
    Compressed,
    /// Compressed, but the source couldn't be removed and was truncated.
    CompressedAndTruncated,
    /// The compressed target already exists; source left untouched.
    TargetExists,
}

impl MoveOutcome {
    /// Whether the source content now lives at the target.
    pub fn moved(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Renamed
                | MoveOutcome::CopiedAndTruncated
                | MoveOutcome::Compressed
                | MoveOutcome::CompressedAndTruncated
        )
    }
}

/// Move `source` to `target`, optionally gzip-compressing it on the way.
///
/// Equal paths and a missing source are no-ops, not errors. An existing
/// target is replaced by a rename but never by compression.
pub fn move_file<F: Filesystem>(
    fs: &F,
    source: &Path,
    target: &Path,
    options: &MoveOptions,
) -> Result<MoveOutcome, FsError> {
    if source == target {
        debug!(path = %source.display(), "source and target are the same, not moving");
        return Ok(MoveOutcome::SamePath);
    }
    if !fs.exists(source) {
        debug!(path = %source.display(), "source does not exist, not moving");
        return Ok(MoveOutcome::SourceMissing);
    }

    debug!(
        source = %source.display(),
        target = %target.display(),
        compress = options.compress,
        "moving file"
    );
    if options.compress {
        compress_file(fs, source, target, options.mode)
    } else {
        rename_file(fs, source, target)
    }
}

fn rename_file<F: Filesystem>(
    fs: &F,
    source: &Path,
    target: &Path,
) -> Result<MoveOutcome, FsError> {
    match fs.rename(source, target) {
        Ok(()) => Ok(MoveOutcome::Renamed),
        Err(e) => {
            debug!(
                source = %source.display(),
                error = %e,
                "rename failed, trying copy and truncate instead"
            );
            fs.copy(source, target)?;
            fs.truncate(source)?;
            Ok(MoveOutcome::CopiedAndTruncated)
        }
    }
}

fn compress_file<F: Filesystem>(
    fs: &F,
    source: &Path,
    target: &Path,
    mode: u32,
) -> Result<MoveOutcome, FsError> {
    // Exclusive create: of two processes compressing the same file, only the
    // one that creates the target proceeds.
    let writer = match fs.create_new(target, mode) {
        Ok(writer) => writer,
        Err(e) if e.is_already_exists() => {
            debug!(target = %target.display(), "compressed target already exists, leaving source");
            return Ok(MoveOutcome::TargetExists);
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = gzip_into(fs, source, writer) {
        debug!(target = %target.display(), error = %e, "compression failed, removing partial target");
        if let Err(cleanup) = fs.remove(target) {
            warn!(target = %target.display(), error = %cleanup, "could not remove partial compressed file");
        }
        return Err(e);
    }

    match fs.remove(source) {
        Ok(()) => Ok(MoveOutcome::Compressed),
        Err(e) => {
            debug!(
                source = %source.display(),
                error = %e,
                "could not remove compressed source, truncating instead"
            );
            fs.truncate(source)?;
            Ok(MoveOutcome::CompressedAndTruncated)
        }
    }
}

fn gzip_into<F: Filesystem>(fs: &F, source: &Path, writer: F::Writer) -> Result<(), FsError> {
    let mut reader = fs.open_read(source)?;
    let mut encoder = GzEncoder::new(writer, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.close()
}
