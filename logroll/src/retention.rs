//! Retention policy for backups.
//!
//! Backups are removed when:
//! - their date is more than `days_to_keep` days in the past
//! - more than `num_to_keep` of them remain after the age filter

use chrono::{Days, NaiveDate};

use crate::scanner::FileDescriptor;

/// Bounds on the set of kept backups. `None` disables a bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of backups, not counting the hot file.
    pub num_to_keep: Option<usize>,

    /// Maximum age of a dated backup in days.
    pub days_to_keep: Option<u32>,
}

impl RetentionPolicy {
    pub fn new(num_to_keep: Option<usize>, days_to_keep: Option<u32>) -> Self {
        Self {
            num_to_keep,
            days_to_keep,
        }
    }

    /// True when `file` is past its age limit. Undated files never expire.
    pub fn is_expired(&self, file: &FileDescriptor, today: NaiveDate) -> bool {
        match (self.days_to_keep, file.date) {
            (Some(days), Some(date)) if days > 0 => date
                .checked_add_days(Days::new(u64::from(days)))
                .map_or(false, |expiry| expiry < today),
            _ => false,
        }
    }
}

/// Backups chosen for deletion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionSelection {
    /// Removed because of their age.
    pub expired: Vec<FileDescriptor>,

    /// Removed because too many backups remained.
    pub excess: Vec<FileDescriptor>,
}

impl RetentionSelection {
    /// Total number of files selected.
    pub fn total(&self) -> usize {
        self.expired.len() + self.excess.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All selected files, expired first.
    pub fn iter(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.expired.iter().chain(self.excess.iter())
    }
}

/// Pick the backups to delete from `sorted` (oldest first).
///
/// The age filter runs first; the count filter then trims the oldest
/// survivors.
pub fn select_for_deletion(
    sorted: &[FileDescriptor],
    policy: &RetentionPolicy,
    today: NaiveDate,
) -> RetentionSelection {
    let mut selection = RetentionSelection::default();

    let mut survivors: Vec<&FileDescriptor> = Vec::with_capacity(sorted.len());
    for file in sorted {
        if policy.is_expired(file, today) {
            selection.expired.push(file.clone());
        } else {
            survivors.push(file);
        }
    }

    if let Some(keep) = policy.num_to_keep.filter(|n| *n > 0) {
        let excess = survivors.len().saturating_sub(keep);
        selection.excess = survivors[..excess].iter().map(|f| (*f).clone()).collect();
    }

    selection
}
