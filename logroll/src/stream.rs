//! The rolling write stream.
//!
//! A [`RollingFileWriteStream`] appends to a single hot file. Before each
//! write it checks whether the period has ended or the hot file is full. If
//! so it rolls:
//!
//! 1. close the hot file
//! 2. shift this period's backups up one slot, moving the hot file into slot 1
//!    (compressing it if configured)
//! 3. open a fresh hot file
//! 4. delete backups the retention policy no longer allows
//!
//! On startup the stream scans its directory and, when appending, adopts an
//! existing hot file so a restarted process continues where it left off.
//!
//! The stream is single-writer. Two streams on the same path are not
//! coordinated beyond the exclusive create used when compressing.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Local, NaiveDate};
use logroll_clock::{Clock, SystemClock};
use logroll_fs::{move_file, Filesystem, MoveOptions, OpenMode, RealFilesystem, WriteHandle};
use tracing::{debug, warn};

use crate::config::{OpenFlags, RollingConfig, RollingOptions};
use crate::error::RollError;
use crate::naming::FileNameCodec;
use crate::retention::select_for_deletion;
use crate::scanner::{scan, FileDescriptor};

/// Mutable rolling state of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollState {
    /// Bytes written to the hot file since it was opened or adopted.
    pub current_size: u64,
    /// First day of the period the hot file belongs to.
    pub current_date: NaiveDate,
    /// Slot of the hot file among this period's files.
    pub current_index: usize,
}

impl RollState {
    fn fresh(date: NaiveDate) -> Self {
        Self {
            current_size: 0,
            current_date: date,
            current_index: 0,
        }
    }
}

/// File sink that rolls by date and size.
pub struct RollingFileWriteStream<F: Filesystem = RealFilesystem, C: Clock = SystemClock> {
    fs: F,
    clock: C,
    config: RollingConfig,
    codec: FileNameCodec,
    state: RollState,
    handle: Option<F::Writer>,
    hot_name: String,
}

impl RollingFileWriteStream {
    /// Open a stream on the real filesystem with the system clock.
    pub fn open(path: impl AsRef<Path>, options: &RollingOptions) -> Result<Self, RollError> {
        Self::with_collaborators(path, options, RealFilesystem, SystemClock)
    }
}

impl<F: Filesystem, C: Clock> RollingFileWriteStream<F, C> {
    /// Open a stream with an injected filesystem and clock.
    pub fn with_collaborators(
        path: impl AsRef<Path>,
        options: &RollingOptions,
        fs: F,
        clock: C,
    ) -> Result<Self, RollError> {
        let config = options.validate(path.as_ref())?;
        Self::from_config(config, fs, clock)
    }

    /// Open a stream from an already validated configuration.
    pub fn from_config(config: RollingConfig, fs: F, clock: C) -> Result<Self, RollError> {
        let codec = config.codec();
        fs.create_dir_all(config.dir())?;

        let now = clock.now();
        let existing = scan(&fs, config.dir(), &codec, now)?;
        let hot_name = codec.hot_file_name(now.date());
        let adopt = config.flags() == OpenFlags::Append
            && existing.iter().any(|f| f.file_name == hot_name);

        let state = if adopt {
            let stat = fs.stat(&config.dir().join(&hot_name))?;
            let current_date = stat
                .created
                .map(|created| DateTime::<Local>::from(created).naive_local().date())
                .unwrap_or(now.date());
            RollState {
                current_size: stat.len,
                current_date,
                current_index: existing
                    .first()
                    .map_or(0, |oldest| oldest.index.min(existing.len().saturating_sub(1))),
            }
        } else {
            RollState::fresh(now.date())
        };
        debug!(
            path = %config.dir().join(&hot_name).display(),
            adopted = adopt,
            size = state.current_size,
            date = %state.current_date,
            index = state.current_index,
            "opening rolling stream"
        );

        let open = if adopt {
            OpenMode::Append
        } else {
            config.flags().into()
        };
        let mut stream = Self {
            fs,
            clock,
            config,
            codec,
            state,
            handle: None,
            hot_name: String::new(),
        };
        stream.open_hot_file(hot_name, open)?;
        stream.clean()?;
        Ok(stream)
    }

    /// Append `chunk`, rolling first if the period ended or the hot file is full.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RollError> {
        if self.handle.is_none() {
            return Err(RollError::Closed);
        }
        if self.period_ended(self.clock.today()) {
            self.roll(true)?;
        }
        if self.state.current_size >= self.config.max_size() {
            self.roll(false)?;
        }

        let handle = self.handle.as_mut().ok_or(RollError::Closed)?;
        handle.write_all(chunk)?;
        self.state.current_size = self.state.current_size.saturating_add(chunk.len() as u64);
        Ok(())
    }

    /// Append a UTF-8 string.
    pub fn write_str(&mut self, s: &str) -> Result<(), RollError> {
        self.write(s.as_bytes())
    }

    /// Flush and close the hot file. Calling it again does nothing.
    pub fn end(&mut self) -> Result<(), RollError> {
        match self.handle.take() {
            Some(handle) => {
                debug!(path = %self.current_path().display(), "closing rolling stream");
                handle.close().map_err(|source| RollError::Close {
                    path: self.current_path(),
                    source,
                })
            }
            None => Ok(()),
        }
    }

    /// Path of the hot file.
    pub fn current_path(&self) -> PathBuf {
        self.config.dir().join(&self.hot_name)
    }

    /// Snapshot of the rolling state.
    pub fn state(&self) -> RollState {
        self.state
    }

    /// The validated configuration.
    pub fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// True once `end` ran or a roll failed to close the hot file.
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn period_ended(&self, today: NaiveDate) -> bool {
        let interval = self.config.interval_days();
        if interval == 0 {
            return false;
        }
        self.state
            .current_date
            .checked_add_days(Days::new(u64::from(interval - 1)))
            .map_or(false, |last_day| last_day < today)
    }

    fn roll(&mut self, next_period: bool) -> Result<(), RollError> {
        let hot_path = self.current_path();
        debug!(
            path = %hot_path.display(),
            next_period,
            size = self.state.current_size,
            index = self.state.current_index,
            "rolling"
        );
        if let Some(handle) = self.handle.take() {
            handle.close().map_err(|source| RollError::Close {
                path: hot_path.clone(),
                source,
            })?;
        }

        let dir = self.config.dir().to_path_buf();
        let date = self.state.current_date;
        let mut top = self
            .period_backup_count(&dir, date)
            .unwrap_or(self.state.current_index);
        if let Some(keep) = self.config.retention().num_to_keep {
            top = top.min(keep.saturating_sub(1));
        }

        for i in (0..=top).rev() {
            let source = if i == 0 {
                hot_path.clone()
            } else {
                dir.join(self.codec.format(date, i, false))
            };
            let target = dir.join(self.codec.format(date, i.saturating_add(1), false));
            let options = MoveOptions::new(self.config.compress() && i == 0, self.config.mode());
            match move_file(&self.fs, &source, &target, &options) {
                Ok(outcome) => debug!(
                    source = %source.display(),
                    target = %target.display(),
                    ?outcome,
                    "shifted backup"
                ),
                Err(e) => warn!(
                    source = %source.display(),
                    target = %target.display(),
                    error = %e,
                    "could not move backup, continuing"
                ),
            }
        }

        self.state = if next_period {
            RollState::fresh(self.clock.today())
        } else {
            RollState {
                current_size: 0,
                current_index: self.state.current_index.saturating_add(1),
                ..self.state
            }
        };

        let hot_name = self.codec.hot_file_name(self.state.current_date);
        self.open_hot_file(hot_name, self.config.flags().into())?;
        self.clean()
    }

    // Number of this period's backups. The shift runs over that many slots,
    // so a stray file with a huge index cannot stretch it.
    fn period_backup_count(&self, dir: &Path, date: NaiveDate) -> Option<usize> {
        let files = match scan(&self.fs, dir, &self.codec, self.clock.now()) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not scan for backups");
                return None;
            }
        };
        let date_rolling = self.config.is_date_rolling();
        let count = files
            .iter()
            .filter(|f| f.file_name != self.hot_name)
            .filter(|f| !date_rolling || f.date == Some(date))
            .count();
        Some(count)
    }

    fn open_hot_file(&mut self, name: String, open: OpenMode) -> Result<(), RollError> {
        self.fs.create_dir_all(self.config.dir())?;
        let path = self.config.dir().join(&name);
        let mut options = self.config.create_options();
        options.open = open;
        let mut handle = self.fs.open_write(&path, &options)?;
        // Zero-length write so a failing file shows up now, not on the first record.
        handle.write_all(&[])?;
        self.handle = Some(handle);
        self.hot_name = name;
        Ok(())
    }

    fn clean(&mut self) -> Result<(), RollError> {
        let now = self.clock.now();
        let backups: Vec<FileDescriptor> = scan(&self.fs, self.config.dir(), &self.codec, now)?
            .into_iter()
            .filter(|f| f.file_name != self.hot_name)
            .collect();
        let selection = select_for_deletion(&backups, self.config.retention(), now.date());

        for file in selection.iter() {
            let path = self.config.dir().join(&file.file_name);
            match self.fs.remove(&path) {
                Ok(()) => debug!(path = %path.display(), "removed old backup"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove old backup"),
            }
        }

        if let Some(keep) = self.config.retention().num_to_keep {
            self.state.current_index = self.state.current_index.min(keep.saturating_sub(1));
        }
        Ok(())
    }
}

impl<F: Filesystem, C: Clock> Write for RollingFileWriteStream<F, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RollingFileWriteStream::<F, C>::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.handle.as_mut() {
            Some(handle) => handle.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RollingOptions;
    use logroll_clock::MockClock;
    use logroll_fs::MockFilesystem;
    use std::time::{Duration, SystemTime};

    fn dir() -> PathBuf {
        PathBuf::from("/logs")
    }

    fn clock() -> MockClock {
        MockClock::at(2012, 9, 12, 10, 37, 11).unwrap()
    }

    fn open(
        fs: &MockFilesystem,
        clock: &MockClock,
        options: RollingOptions,
    ) -> RollingFileWriteStream<MockFilesystem, MockClock> {
        RollingFileWriteStream::with_collaborators(
            dir().join("test.log"),
            &options,
            fs.clone(),
            clock.clone(),
        )
        .expect("open stream")
    }

    fn content(fs: &MockFilesystem, name: &str) -> String {
        String::from_utf8(fs.get_file(&dir().join(name)).unwrap_or_default()).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ===========================================
    // Construction
    // ===========================================

    #[test]
    fn test_open_creates_hot_file_and_dir() {
        let fs = MockFilesystem::new();
        let stream = open(&fs, &clock(), RollingOptions::new());

        assert_eq!(fs.file_names(&dir()), vec!["test.log"]);
        assert_eq!(stream.current_path(), dir().join("test.log"));
        assert_eq!(stream.state(), RollState::fresh(day(2012, 9, 12)));
        assert_eq!(fs.mode(&dir().join("test.log")), Some(0o644));
        assert!(!stream.is_closed());
    }

    #[test]
    fn test_open_rejects_invalid_options() {
        let fs = MockFilesystem::new();
        let result = RollingFileWriteStream::with_collaborators(
            dir().join("test.log"),
            &RollingOptions::new().with_max_size(0),
            fs.clone(),
            clock(),
        );
        assert!(matches!(result, Err(RollError::Config(_))));
        assert!(fs.file_names(&dir()).is_empty());
    }

    #[test]
    fn test_open_adopts_existing_hot_file() {
        let fs = MockFilesystem::new();
        let hot = dir().join("test.log");
        fs.add_file(&hot, "exist");
        fs.add_file(dir().join("test.log.2012-09-11.2"), "b");
        fs.add_file(dir().join("test.log.2012-09-11.1"), "a");
        let birth = SystemTime::now() - Duration::from_secs(2 * 86_400);
        fs.set_created(&hot, birth);

        let mut stream = open(&fs, &clock(), RollingOptions::new().with_max_size(100));

        let state = stream.state();
        assert_eq!(state.current_size, 5);
        assert_eq!(state.current_date, DateTime::<Local>::from(birth).naive_local().date());
        assert_eq!(state.current_index, 2);

        stream.write_str("now").unwrap();
        assert_eq!(content(&fs, "test.log"), "existnow");
    }

    #[test]
    fn test_open_without_birth_time_uses_clock() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log"), "exist");

        let stream = open(&fs, &clock(), RollingOptions::new());
        assert_eq!(stream.state().current_date, day(2012, 9, 12));
        assert_eq!(stream.state().current_size, 5);
    }

    #[test]
    fn test_open_truncate_flag_starts_fresh() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log"), "exist");

        let mut stream = open(&fs, &clock(), RollingOptions::new().with_flags(OpenFlags::Truncate));
        assert_eq!(stream.state().current_size, 0);
        stream.write_str("new").unwrap();
        assert_eq!(content(&fs, "test.log"), "new");
    }

    #[test]
    fn test_open_enforces_retention() {
        let fs = MockFilesystem::new();
        for i in 1..=5 {
            fs.add_file(dir().join(format!("test.log.2012-09-12.{i}")), "x");
        }

        let stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(10).with_num_to_keep(2),
        );
        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.2012-09-12.1", "test.log.2012-09-12.2"]
        );
        assert_eq!(stream.state().current_index, 0);
    }

    #[test]
    fn test_open_caps_adopted_index() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log"), "hot");
        for i in 1..=4 {
            fs.add_file(dir().join(format!("test.log.2012-09-12.{i}")), "x");
        }

        let stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(10).with_num_to_keep(2),
        );
        // Oldest backup had index 4; capped to numToKeep - 1.
        assert_eq!(stream.state().current_index, 1);
    }

    // ===========================================
    // Size rolling
    // ===========================================

    #[test]
    fn test_size_roll_checks_before_write() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(5).with_interval_days(0),
        );

        stream.write_str("0123").unwrap();
        stream.write_str("45").unwrap();
        // Limit reached, but the roll happens on the next write.
        assert_eq!(fs.file_names(&dir()), vec!["test.log"]);
        assert_eq!(stream.state().current_size, 6);

        stream.write_str("6").unwrap();
        assert_eq!(content(&fs, "test.log.1"), "012345");
        assert_eq!(content(&fs, "test.log"), "6");
        assert_eq!(stream.state().current_index, 1);
        assert_eq!(stream.state().current_size, 1);
    }

    #[test]
    fn test_size_rolls_shift_contiguously() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        for chunk in ["a", "b", "c", "d"] {
            stream.write_str(chunk).unwrap();
        }

        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.1", "test.log.2", "test.log.3"]
        );
        assert_eq!(content(&fs, "test.log.3"), "a");
        assert_eq!(content(&fs, "test.log.2"), "b");
        assert_eq!(content(&fs, "test.log.1"), "c");
        assert_eq!(content(&fs, "test.log"), "d");
    }

    #[test]
    fn test_size_rolls_respect_num_to_keep() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new()
                .with_max_size(1)
                .with_interval_days(0)
                .with_num_to_keep(2),
        );
        for chunk in ["a", "b", "c", "d", "e"] {
            stream.write_str(chunk).unwrap();
        }

        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.1", "test.log.2"]
        );
        assert_eq!(content(&fs, "test.log.2"), "c");
        assert_eq!(content(&fs, "test.log.1"), "d");
        assert_eq!(content(&fs, "test.log"), "e");
        assert_eq!(stream.state().current_index, 1);
    }

    #[test]
    fn test_size_roll_continues_after_existing_backups() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log.1"), "old1");
        fs.add_file(dir().join("test.log.2"), "old2");

        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        stream.write_str("a").unwrap();
        stream.write_str("b").unwrap();

        assert_eq!(content(&fs, "test.log.3"), "old2");
        assert_eq!(content(&fs, "test.log.2"), "old1");
        assert_eq!(content(&fs, "test.log.1"), "a");
        assert_eq!(content(&fs, "test.log"), "b");
    }

    #[test]
    fn test_stray_large_index_does_not_stretch_shift() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log.2000000"), "stray");

        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        stream.write_str("a").unwrap();
        stream.write_str("b").unwrap();

        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.1", "test.log.2000000"]
        );
        assert_eq!(content(&fs, "test.log.2000000"), "stray");
        assert_eq!(content(&fs, "test.log.1"), "a");
        assert_eq!(content(&fs, "test.log"), "b");
        assert_eq!(stream.state().current_index, 1);
    }

    #[test]
    fn test_max_index_leftover_does_not_overflow() {
        let fs = MockFilesystem::new();
        let stray = format!("test.log.{}", usize::MAX);
        fs.add_file(dir().join(&stray), "stray");

        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        for chunk in ["a", "b", "c"] {
            stream.write_str(chunk).unwrap();
        }

        assert_eq!(content(&fs, &stray), "stray");
        assert_eq!(content(&fs, "test.log.2"), "a");
        assert_eq!(content(&fs, "test.log.1"), "b");
        assert_eq!(content(&fs, "test.log"), "c");
    }

    #[test]
    fn test_open_clamps_adopted_max_index() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log"), "hot");
        let stray = format!("test.log.{}", usize::MAX);
        fs.add_file(dir().join(&stray), "stray");

        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        // One backup on disk, so the adopted index is at most 1.
        assert_eq!(stream.state().current_index, 1);

        stream.write_str("a").unwrap();
        assert_eq!(content(&fs, &stray), "stray");
        assert_eq!(content(&fs, "test.log.1"), "hot");
        assert_eq!(content(&fs, "test.log"), "a");
        assert_eq!(stream.state().current_index, 2);
    }

    // ===========================================
    // Date rolling
    // ===========================================

    #[test]
    fn test_daily_roll() {
        let fs = MockFilesystem::new();
        let clock = clock();
        let mut stream = open(&fs, &clock, RollingOptions::new());

        stream.write_str("day one").unwrap();
        clock.advance_days(1);
        stream.write_str("day two").unwrap();

        assert_eq!(content(&fs, "test.log.2012-09-12"), "day one");
        assert_eq!(content(&fs, "test.log"), "day two");
        assert_eq!(stream.state(), RollState {
            current_size: 7,
            current_date: day(2012, 9, 13),
            current_index: 0,
        });
    }

    #[test]
    fn test_interval_days_waits_for_period_end() {
        let fs = MockFilesystem::new();
        let clock = clock();
        let mut stream = open(&fs, &clock, RollingOptions::new().with_interval_days(3));

        stream.write_str("a").unwrap();
        clock.advance_days(2);
        stream.write_str("b").unwrap();
        assert_eq!(fs.file_names(&dir()), vec!["test.log"]);

        clock.advance_days(1);
        stream.write_str("c").unwrap();
        assert_eq!(content(&fs, "test.log.2012-09-12"), "ab");
        assert_eq!(content(&fs, "test.log"), "c");
        assert_eq!(stream.state().current_date, day(2012, 9, 15));
    }

    #[test]
    fn test_always_include_pattern_renames_hot_file() {
        let fs = MockFilesystem::new();
        let clock = clock();
        let mut stream = open(
            &fs,
            &clock,
            RollingOptions::new().with_always_include_pattern(true),
        );
        assert_eq!(stream.current_path(), dir().join("test.log.2012-09-12"));

        stream.write_str("one").unwrap();
        clock.advance_days(1);
        stream.write_str("two").unwrap();

        assert_eq!(stream.current_path(), dir().join("test.log.2012-09-13"));
        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log.2012-09-12", "test.log.2012-09-13"]
        );
        assert_eq!(content(&fs, "test.log.2012-09-12"), "one");
        assert_eq!(content(&fs, "test.log.2012-09-13"), "two");
    }

    #[test]
    fn test_days_to_keep_removes_old_backups() {
        let fs = MockFilesystem::new();
        fs.add_file(dir().join("test.log.2012-09-01"), "old");
        fs.add_file(dir().join("test.log.2012-09-10"), "recent");
        let clock = clock();
        let mut stream = open(&fs, &clock, RollingOptions::new().with_days_to_keep(2));

        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.2012-09-10"]
        );

        clock.advance_days(1);
        stream.write_str("x").unwrap();
        // 09-10 + 2 = 09-12 is before 09-13.
        assert_eq!(
            fs.file_names(&dir()),
            vec!["test.log", "test.log.2012-09-12"]
        );
    }

    // ===========================================
    // Compression
    // ===========================================

    #[test]
    fn test_compressed_roll() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(3).with_compress(true),
        );
        stream.write_str("abc").unwrap();
        stream.write_str("d").unwrap();

        let names = fs.file_names(&dir());
        assert_eq!(names, vec!["test.log", "test.log.2012-09-12.1.gz"]);
        assert_eq!(content(&fs, "test.log"), "d");
        assert_eq!(fs.mode(&dir().join("test.log.2012-09-12.1.gz")), Some(0o644));

        let gz = fs.get_file(&dir().join("test.log.2012-09-12.1.gz")).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&gz[..]);
        let mut out = String::new();
        io::Read::read_to_string(&mut decoder, &mut out).unwrap();
        assert_eq!(out, "abc");
    }

    // ===========================================
    // Failures
    // ===========================================

    #[test]
    fn test_write_failure_propagates() {
        let fs = MockFilesystem::new();
        let mut stream = open(&fs, &clock(), RollingOptions::new());
        fs.fail_writes(&dir().join("test.log"));

        let err = stream.write_str("x").unwrap_err();
        assert!(matches!(err, RollError::Fs(_)));
        assert_eq!(stream.state().current_size, 0);
    }

    #[test]
    fn test_close_failure_during_roll_closes_stream() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        stream.write_str("a").unwrap();
        fs.fail_close(&dir().join("test.log"));

        let err = stream.write_str("b").unwrap_err();
        assert!(matches!(err, RollError::Close { .. }));
        assert!(stream.is_closed());
        assert!(matches!(stream.write_str("c"), Err(RollError::Closed)));
    }

    #[test]
    fn test_locked_backup_does_not_fail_write() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        stream.write_str("a").unwrap();
        stream.write_str("b").unwrap();
        fs.lock(&dir().join("test.log.1"));

        // Shifting .1 -> .2 fails rename, falls back to copy + truncate.
        stream.write_str("c").unwrap();
        assert_eq!(content(&fs, "test.log.2"), "a");
        assert_eq!(content(&fs, "test.log.1"), "b");
        assert_eq!(content(&fs, "test.log"), "c");
    }

    #[test]
    fn test_vanished_hot_file_is_skipped_on_roll() {
        let fs = MockFilesystem::new();
        let mut stream = open(
            &fs,
            &clock(),
            RollingOptions::new().with_max_size(1).with_interval_days(0),
        );
        stream.write_str("a").unwrap();
        fs.remove(&dir().join("test.log")).unwrap();

        stream.write_str("b").unwrap();
        assert_eq!(fs.file_names(&dir()), vec!["test.log"]);
        assert_eq!(content(&fs, "test.log"), "b");
    }

    // ===========================================
    // Closing
    // ===========================================

    #[test]
    fn test_end_is_idempotent() {
        let fs = MockFilesystem::new();
        let mut stream = open(&fs, &clock(), RollingOptions::new());
        stream.write_str("x").unwrap();

        stream.end().unwrap();
        stream.end().unwrap();
        assert!(stream.is_closed());
        assert!(matches!(stream.write_str("y"), Err(RollError::Closed)));
        assert_eq!(content(&fs, "test.log"), "x");
    }

    #[test]
    fn test_end_reports_close_failure() {
        let fs = MockFilesystem::new();
        let mut stream = open(&fs, &clock(), RollingOptions::new());
        fs.fail_close(&dir().join("test.log"));

        assert!(matches!(stream.end(), Err(RollError::Close { .. })));
        assert!(stream.is_closed());
    }

    // ===========================================
    // io::Write
    // ===========================================

    #[test]
    fn test_io_write_adapter() {
        let fs = MockFilesystem::new();
        let mut stream = open(&fs, &clock(), RollingOptions::new());

        writeln!(stream, "line {}", 1).unwrap();
        Write::flush(&mut stream).unwrap();
        assert_eq!(content(&fs, "test.log"), "line 1\n");
    }

    #[test]
    fn test_io_write_after_end_fails() {
        let fs = MockFilesystem::new();
        let mut stream = open(&fs, &clock(), RollingOptions::new());
        stream.end().unwrap();

        let err = Write::write(&mut stream, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
