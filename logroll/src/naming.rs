//! File name formatting and parsing.
//!
//! Every file a stream manages is named from the configured base plus an
//! optional date suffix, an optional index suffix and an optional `.gz`:
//!
//! ```text
//! <base>[<sep><date>][<sep><index>][.gz]              keepFileExt = false
//! <stem>[<sep><date>][<sep><index>]<ext>[.gz]         keepFileExt = true
//! ```
//!
//! [`FileNameCodec::parse`] is the left inverse of [`FileNameCodec::format`],
//! and also accepts names produced under other index/date settings so a
//! directory with a mixed history can still be scanned.

use chrono::{NaiveDate, NaiveTime};

use crate::config::RollingConfig;
use crate::error::ConfigError;

/// Suffix of compressed backups.
pub const COMPRESSED_SUFFIX: &str = ".gz";

// Longer tokens first so `YYYY` is not read as two `YY`.
const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("yyyy", "%Y"),
    ("YY", "%y"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("SSS", "%3f"),
];

/// A compiled date template such as `YYYY-MM-DD`.
///
/// Names are day-granular, so time tokens always render as `00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    pattern: String,
    format: String,
}

impl DatePattern {
    /// Compile a pattern. Fails unless a sample date survives format + parse.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDatePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let mut format = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;
        while let Some(ch) = rest.chars().next() {
            if let Some((token, spec)) = TOKENS.iter().find(|(t, _)| rest.starts_with(t)) {
                format.push_str(spec);
                rest = &rest[token.len()..];
                continue;
            }
            if ch == '%' {
                format.push_str("%%");
            } else {
                format.push(ch);
            }
            rest = &rest[ch.len_utf8()..];
        }

        let compiled = Self {
            pattern: pattern.to_string(),
            format,
        };

        // Day above 12 so a swapped month/day cannot round-trip by accident.
        let sample = NaiveDate::from_ymd_opt(2012, 9, 28).ok_or_else(|| invalid("bad sample"))?;
        let rendered = compiled.format(sample);
        if rendered.contains(|c: char| c == '/' || c == '\\') {
            return Err(invalid("renders a path separator"));
        }
        if compiled.parse(&rendered) != Some(sample) {
            return Err(invalid("does not identify a calendar day"));
        }
        Ok(compiled)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.and_time(NaiveTime::default())
            .format(&self.format)
            .to_string()
    }

    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, &self.format).ok()
    }
}

/// Index and date recovered from a managed file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub compressed: bool,
}

impl ParsedName {
    fn new(index: usize, date: Option<NaiveDate>, compressed: bool) -> Self {
        Self {
            index,
            date,
            compressed,
        }
    }
}

/// Derives file names from `(date, index)` and back.
#[derive(Debug, Clone)]
pub struct FileNameCodec {
    base: String,
    stem: String,
    ext: String,
    separator: String,
    date_pattern: DatePattern,
    date_rolling: bool,
    size_rolling: bool,
    compress: bool,
    keep_file_ext: bool,
    always_include_pattern: bool,
}

impl FileNameCodec {
    pub fn new(config: &RollingConfig) -> Self {
        Self {
            base: config.base().to_string(),
            stem: config.stem().to_string(),
            ext: config.ext().to_string(),
            separator: config.separator().to_string(),
            date_pattern: config.date_pattern().clone(),
            date_rolling: config.is_date_rolling(),
            size_rolling: config.is_size_rolling(),
            compress: config.compress(),
            keep_file_ext: config.keep_file_ext(),
            always_include_pattern: config.always_include_pattern(),
        }
    }

    /// Name of the file being written for the period starting on `date`.
    pub fn hot_file_name(&self, date: NaiveDate) -> String {
        self.format(date, 0, true)
    }

    /// Name for slot `index` of the period starting on `date`.
    ///
    /// The hot file is the bare base name unless `alwaysIncludePattern` is
    /// set with date rolling on. It is never compressed.
    pub fn format(&self, date: NaiveDate, index: usize, hot: bool) -> String {
        if hot {
            if self.always_include_pattern && self.date_rolling {
                return self.with_suffixes(&[self.date_pattern.format(date)]);
            }
            return self.base.clone();
        }

        let mut suffixes = Vec::with_capacity(2);
        if self.date_rolling {
            suffixes.push(self.date_pattern.format(date));
        }
        if index > 0 && self.size_rolling {
            suffixes.push(index.to_string());
        }
        let mut name = self.with_suffixes(&suffixes);
        if self.compress {
            name.push_str(COMPRESSED_SUFFIX);
        }
        name
    }

    fn with_suffixes(&self, suffixes: &[String]) -> String {
        let mut name = if self.keep_file_ext {
            self.stem.clone()
        } else {
            self.base.clone()
        };
        for suffix in suffixes {
            name.push_str(&self.separator);
            name.push_str(suffix);
        }
        if self.keep_file_ext {
            name.push_str(&self.ext);
        }
        name
    }

    /// Recover index and date from a file name, or `None` if the name does
    /// not belong to this stream.
    pub fn parse(&self, file_name: &str) -> Option<ParsedName> {
        let (name, compressed) = match file_name.strip_suffix(COMPRESSED_SUFFIX) {
            Some(name) => (name, true),
            None => (file_name, false),
        };
        if name == self.base {
            return Some(ParsedName::new(0, None, compressed));
        }

        let meta = if self.keep_file_ext {
            name.strip_prefix(self.stem.as_str())?
                .strip_prefix(self.separator.as_str())?
                .strip_suffix(self.ext.as_str())?
        } else {
            name.strip_prefix(self.base.as_str())?
                .strip_prefix(self.separator.as_str())?
        };
        if meta.is_empty() {
            return Some(ParsedName::new(0, None, compressed));
        }

        let (index, date) = if self.date_rolling {
            self.parse_dated(meta)
                .or_else(|| parse_index(meta).map(|index| (index, None)))?
        } else {
            parse_index(meta)
                .map(|index| (index, None))
                .or_else(|| self.parse_dated(meta))?
        };
        Some(ParsedName::new(index, date, compressed))
    }

    fn parse_dated(&self, meta: &str) -> Option<(usize, Option<NaiveDate>)> {
        if let Some((date, index)) = meta.rsplit_once(self.separator.as_str()) {
            if let (Some(index), Some(date)) = (parse_index(index), self.date_pattern.parse(date)) {
                return Some((index, Some(date)));
            }
        }
        self.date_pattern.parse(meta).map(|date| (0, Some(date)))
    }
}

fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
