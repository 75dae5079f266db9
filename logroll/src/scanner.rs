//! Directory scan that rebuilds rotation state from the files on disk.

use std::cmp::Ordering;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use logroll_fs::{Filesystem, FsError};

use crate::naming::FileNameCodec;

/// A managed file found in the stream's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_name: String,
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub compressed: bool,
}

impl FileDescriptor {
    /// Ordering key, smallest = oldest: the file's date at midnight (or
    /// `now` when the name has no date) in milliseconds, minus its index.
    pub fn sort_key(&self, now: NaiveDateTime) -> i64 {
        let at = self
            .date
            .map(|date| date.and_time(NaiveTime::default()))
            .unwrap_or(now);
        let index = i64::try_from(self.index).unwrap_or(i64::MAX);
        at.and_utc().timestamp_millis().saturating_sub(index)
    }

    fn cmp_at(&self, other: &Self, now: NaiveDateTime) -> Ordering {
        self.sort_key(now)
            .cmp(&other.sort_key(now))
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}

/// List the managed files in `dir`, oldest first.
///
/// Entries the codec does not recognise are skipped. A missing directory is
/// an error.
pub fn scan<F: Filesystem>(
    fs: &F,
    dir: &Path,
    codec: &FileNameCodec,
    now: NaiveDateTime,
) -> Result<Vec<FileDescriptor>, FsError> {
    let mut files: Vec<FileDescriptor> = fs
        .list_dir(dir)?
        .into_iter()
        .filter_map(|file_name| {
            let parsed = codec.parse(&file_name)?;
            Some(FileDescriptor {
                file_name,
                index: parsed.index,
                date: parsed.date,
                compressed: parsed.compressed,
            })
        })
        .collect();
    files.sort_by(|a, b| a.cmp_at(b, now));
    Ok(files)
}
