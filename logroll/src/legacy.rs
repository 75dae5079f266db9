//! Older constructor signatures mapped onto [`RollingOptions`].
//!
//! Earlier releases had separate size-rolling and date-rolling streams with
//! positional arguments. These functions translate those argument lists
//! into the unified options so callers can keep their configuration.

use crate::config::RollingOptions;

/// Default pattern of the old date-rolling stream.
pub const LEGACY_DATE_PATTERN: &str = "yyyy-MM-dd";

/// Options equivalent to the old size-rolling stream.
///
/// `size` is the maximum file size (zero or `None` keeps `base`'s limit),
/// `backups` the number of rolled files to keep (default 1). Date rolling is
/// switched off.
pub fn size_rolling_options(
    size: Option<u64>,
    backups: Option<usize>,
    base: RollingOptions,
) -> RollingOptions {
    let mut options = base.with_interval_days(0);
    if let Some(size) = size.filter(|s| *s > 0) {
        options = options.with_max_size(size);
    }
    options.with_num_to_keep(backups.unwrap_or(1))
}

/// Options equivalent to the old date-rolling stream.
///
/// The old `pattern` could start with the separator (`.yyyy-MM-dd`); that
/// leading `.` is dropped. The old `days_to_keep` argument counted daily
/// files rather than days, so it maps to `num_to_keep`.
pub fn date_rolling_options(
    pattern: Option<&str>,
    days_to_keep: Option<usize>,
    base: RollingOptions,
) -> RollingOptions {
    let pattern = pattern.unwrap_or(LEGACY_DATE_PATTERN);
    let pattern = pattern.strip_prefix('.').unwrap_or(pattern);
    let mut options = base.with_date_pattern(pattern).with_interval_days(1);
    if let Some(keep) = days_to_keep {
        options = options.with_num_to_keep(keep);
    }
    options
}
