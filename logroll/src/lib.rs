//! Rolling file sink.
//!
//! [`RollingFileWriteStream`] writes to a file and moves it aside when a
//! period ends or the file grows past a size limit, keeping a bounded set of
//! (optionally gzip-compressed) backups next to it.
//!
//! ```no_run
//! use logroll::{RollingFileWriteStream, RollingOptions};
//!
//! let options = RollingOptions::new()
//!     .with_max_size(10 * 1024 * 1024)
//!     .with_num_to_keep(5)
//!     .with_compress(true);
//! let mut stream = RollingFileWriteStream::open("/var/log/app/server.log", &options)?;
//! stream.write_str("started\n")?;
//! stream.end()?;
//! # Ok::<(), logroll::RollError>(())
//! ```

pub mod config;
pub mod error;
pub mod legacy;
pub mod naming;
pub mod retention;
pub mod scanner;
pub mod stream;

pub use config::{
    OpenFlags, RollingConfig, RollingOptions, DEFAULT_DATE_PATTERN, DEFAULT_ENCODING,
    DEFAULT_INTERVAL_DAYS, DEFAULT_SEPARATOR, UNBOUNDED_SIZE,
};
pub use error::{ConfigError, RollError};
pub use legacy::{date_rolling_options, size_rolling_options};
pub use naming::{DatePattern, FileNameCodec, ParsedName, COMPRESSED_SUFFIX};
pub use retention::{select_for_deletion, RetentionPolicy, RetentionSelection};
pub use scanner::{scan, FileDescriptor};
pub use stream::{RollState, RollingFileWriteStream};

pub use logroll_clock::{Clock, MockClock, SystemClock};
pub use logroll_fs::{Filesystem, MockFilesystem, RealFilesystem};
