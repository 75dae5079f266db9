//! Stream options and their validated form.

use std::env;
use std::path::{Path, PathBuf};

use logroll_fs::{CreateOptions, OpenMode, DEFAULT_FILE_MODE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::naming::{DatePattern, FileNameCodec};
use crate::retention::RetentionPolicy;

/// Default date pattern for dated file names.
pub const DEFAULT_DATE_PATTERN: &str = "YYYY-MM-DD";

/// Default separator between the base name and each suffix.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Default encoding label.
pub const DEFAULT_ENCODING: &str = "utf8";

/// Default rolling period: one file per day.
pub const DEFAULT_INTERVAL_DAYS: u32 = 1;

/// `maxSize` value meaning "never roll on size".
pub const UNBOUNDED_SIZE: u64 = u64::MAX;

/// How the hot file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenFlags {
    /// Append to an existing file (`"a"`).
    #[default]
    #[serde(rename = "a")]
    Append,
    /// Truncate an existing file (`"w"`).
    #[serde(rename = "w")]
    Truncate,
}

impl From<OpenFlags> for OpenMode {
    fn from(flags: OpenFlags) -> Self {
        match flags {
            OpenFlags::Append => OpenMode::Append,
            OpenFlags::Truncate => OpenMode::Truncate,
        }
    }
}

/// Construction options, as a user or config file supplies them.
///
/// Keys deserialize in camelCase (`maxSize`, `intervalDays`, ...), and every
/// key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RollingOptions {
    pub max_size: u64,
    pub interval_days: u32,
    pub num_to_keep: Option<usize>,
    pub days_to_keep: Option<u32>,
    pub date_pattern: String,
    pub compress: bool,
    pub keep_file_ext: bool,
    pub always_include_pattern: bool,
    pub file_name_separator: String,
    pub encoding: String,
    pub mode: u32,
    pub flags: OpenFlags,
}

impl Default for RollingOptions {
    fn default() -> Self {
        Self {
            max_size: UNBOUNDED_SIZE,
            interval_days: DEFAULT_INTERVAL_DAYS,
            num_to_keep: None,
            days_to_keep: None,
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            compress: false,
            keep_file_ext: false,
            always_include_pattern: false,
            file_name_separator: DEFAULT_SEPARATOR.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            mode: DEFAULT_FILE_MODE,
            flags: OpenFlags::Append,
        }
    }
}

impl RollingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set max_size.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Builder: set interval_days. Zero disables date rolling.
    pub fn with_interval_days(mut self, interval_days: u32) -> Self {
        self.interval_days = interval_days;
        self
    }

    /// Builder: set num_to_keep.
    pub fn with_num_to_keep(mut self, num_to_keep: usize) -> Self {
        self.num_to_keep = Some(num_to_keep);
        self
    }

    /// Builder: set days_to_keep.
    pub fn with_days_to_keep(mut self, days_to_keep: u32) -> Self {
        self.days_to_keep = Some(days_to_keep);
        self
    }

    /// Builder: set date_pattern.
    pub fn with_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.date_pattern = pattern.into();
        self
    }

    /// Builder: set compress.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Builder: set keep_file_ext.
    pub fn with_keep_file_ext(mut self, keep: bool) -> Self {
        self.keep_file_ext = keep;
        self
    }

    /// Builder: set always_include_pattern.
    pub fn with_always_include_pattern(mut self, always: bool) -> Self {
        self.always_include_pattern = always;
        self
    }

    /// Builder: set file_name_separator.
    pub fn with_file_name_separator(mut self, separator: impl Into<String>) -> Self {
        self.file_name_separator = separator.into();
        self
    }

    /// Builder: set encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Builder: set mode.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: set flags.
    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check the options and bind them to a target file path.
    ///
    /// Relative paths are resolved against the current working directory.
    pub fn validate(&self, path: &Path) -> Result<RollingConfig, ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        if let Some(0) = self.num_to_keep {
            return Err(ConfigError::InvalidNumToKeep(0));
        }
        if let Some(0) = self.days_to_keep {
            return Err(ConfigError::InvalidDaysToKeep(0));
        }
        let separator = &self.file_name_separator;
        if separator.is_empty() || separator.contains(|c: char| c == '/' || c == '\\') {
            return Err(ConfigError::InvalidSeparator(separator.clone()));
        }
        if !is_utf8_label(&self.encoding) {
            return Err(ConfigError::UnsupportedEncoding(self.encoding.clone()));
        }
        let date_pattern = DatePattern::new(&self.date_pattern)?;

        let path = absolute(path)?;
        let base = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(ConfigError::MissingPath)?
            .to_string();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = Path::new(&base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&base)
            .to_string();
        let ext = Path::new(&base)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let date_rolling = self.interval_days > 0;
        let retention = RetentionPolicy {
            num_to_keep: self.num_to_keep,
            // Age needs a date in the file name.
            days_to_keep: self.days_to_keep.filter(|_| date_rolling),
        };

        Ok(RollingConfig {
            dir,
            base,
            stem,
            ext,
            max_size: self.max_size,
            interval_days: self.interval_days,
            retention,
            date_pattern,
            compress: self.compress,
            keep_file_ext: self.keep_file_ext,
            always_include_pattern: self.always_include_pattern,
            separator: separator.clone(),
            mode: self.mode,
            flags: self.flags,
        })
    }
}

fn is_utf8_label(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf8") || encoding.eq_ignore_ascii_case("utf-8")
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingPath);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}

/// Validated, immutable stream configuration.
#[derive(Debug, Clone)]
pub struct RollingConfig {
    dir: PathBuf,
    base: String,
    stem: String,
    ext: String,
    max_size: u64,
    interval_days: u32,
    retention: RetentionPolicy,
    date_pattern: DatePattern,
    compress: bool,
    keep_file_ext: bool,
    always_include_pattern: bool,
    separator: String,
    mode: u32,
    flags: OpenFlags,
}

impl RollingConfig {
    /// Directory holding the hot file and its backups.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the configured target path.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Base name without its extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Extension including the leading dot, or empty.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// The configured target path.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.base)
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    pub fn date_pattern(&self) -> &DatePattern {
        &self.date_pattern
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn keep_file_ext(&self) -> bool {
        self.keep_file_ext
    }

    pub fn always_include_pattern(&self) -> bool {
        self.always_include_pattern
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// True when files roll over at period boundaries.
    pub fn is_date_rolling(&self) -> bool {
        self.interval_days > 0
    }

    /// True when files roll over on size.
    pub fn is_size_rolling(&self) -> bool {
        self.max_size < UNBOUNDED_SIZE
    }

    /// Options for opening the hot file.
    pub fn create_options(&self) -> CreateOptions {
        CreateOptions::new(self.mode, self.flags.into())
    }

    /// Name codec for this configuration.
    pub fn codec(&self) -> FileNameCodec {
        FileNameCodec::new(self)
    }
}
