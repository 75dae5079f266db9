//! Filesystem trait and its real and in-memory implementations.
//!
//! The rolling stream never touches `std::fs` directly: every open, rename,
//! listing and delete goes through [`Filesystem`], so tests can run the whole
//! state machine against [`MockFilesystem`] and inject the failures that only
//! happen under contention (locked files, failing reads, failing closes).

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use thiserror::Error;

/// Default permission bits for files the stream creates.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("path error: {0}")]
    Path(String),
}

impl FsError {
    /// The underlying IO error kind, if any.
    pub fn kind(&self) -> Option<io::ErrorKind> {
        match self {
            FsError::Io(e) => Some(e.kind()),
            FsError::Path(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(io::ErrorKind::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == Some(io::ErrorKind::AlreadyExists)
    }
}

/// How an existing file is treated when opened for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Keep existing content and append after it.
    #[default]
    Append,
    /// Discard existing content.
    Truncate,
}

/// Options for opening a file for writing (created if missing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Permission bits used when the file is created (Unix only).
    pub mode: u32,
    pub open: OpenMode,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            mode: DEFAULT_FILE_MODE,
            open: OpenMode::Append,
        }
    }
}

impl CreateOptions {
    pub fn new(mode: u32, open: OpenMode) -> Self {
        Self { mode, open }
    }
}

/// Size and birth time of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    /// `None` when the platform does not record birth time.
    pub created: Option<SystemTime>,
}

/// An open, writable file.
pub trait WriteHandle: Write + Send {
    /// Flush and release the handle. Errors here mean data may not be on disk.
    fn close(self) -> Result<(), FsError>;
}

impl WriteHandle for File {
    fn close(mut self) -> Result<(), FsError> {
        self.flush()?;
        self.sync_data()?;
        Ok(())
    }
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    type Writer: WriteHandle;
    type Reader: Read + Send;

    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// List the names of the files directly inside `dir`.
    fn list_dir(&self, dir: &Path) -> Result<Vec<String>, FsError>;

    fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Open a file for writing, creating it if it doesn't exist.
    fn open_write(&self, path: &Path, options: &CreateOptions) -> Result<Self::Writer, FsError>;

    /// Create a new file, failing with `AlreadyExists` if it is already there.
    fn create_new(&self, path: &Path, mode: u32) -> Result<Self::Writer, FsError>;

    fn open_read(&self, path: &Path) -> Result<Self::Reader, FsError>;

    /// Rename `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Copy the content of `from` to `to`, replacing `to` if it exists.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Truncate a file to zero length.
    fn truncate(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a file.
    fn remove(&self, path: &Path) -> Result<(), FsError>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

#[cfg(unix)]
fn apply_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn apply_mode(_options: &mut OpenOptions, _mode: u32) {}

impl Filesystem for RealFilesystem {
    type Writer = File;
    type Reader = File;

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            // Names that aren't valid UTF-8 can't have been produced by us.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let meta = fs::metadata(path)?;
        Ok(FileStat {
            len: meta.len(),
            created: meta.created().ok(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open_write(&self, path: &Path, options: &CreateOptions) -> Result<File, FsError> {
        let mut open = OpenOptions::new();
        open.create(true);
        match options.open {
            OpenMode::Append => {
                open.append(true);
            }
            OpenMode::Truncate => {
                open.write(true).truncate(true);
            }
        }
        apply_mode(&mut open, options.mode);
        Ok(open.open(path)?)
    }

    fn create_new(&self, path: &Path, mode: u32) -> Result<File, FsError> {
        let mut open = OpenOptions::new();
        open.write(true).create_new(true);
        apply_mode(&mut open, mode);
        Ok(open.open(path)?)
    }

    fn open_read(&self, path: &Path) -> Result<File, FsError> {
        Ok(File::open(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::copy(from, to)?;
        Ok(())
    }

    fn truncate(&self, path: &Path) -> Result<(), FsError> {
        OpenOptions::new().write(true).open(path)?.set_len(0)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    modes: HashMap<PathBuf, u32>,
    created: HashMap<PathBuf, SystemTime>,
    locked: HashSet<PathBuf>,
    failing_writes: HashSet<PathBuf>,
    failing_reads: HashSet<PathBuf>,
    failing_close: HashSet<PathBuf>,
}

impl MockState {
    fn dir_exists(&self, dir: &Path) -> bool {
        self.dirs.contains(dir) || self.files.keys().any(|p| p.starts_with(dir))
    }
}

fn not_found(path: &Path) -> FsError {
    FsError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("file not found: {}", path.display()),
    ))
}

fn busy(path: &Path) -> FsError {
    FsError::Io(io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("resource busy or locked: {}", path.display()),
    ))
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<RwLock<MockState>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.state
            .write()
            .unwrap()
            .files
            .insert(path.into(), data.into());
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().unwrap().files.get(path).cloned()
    }

    /// Sorted names of the files directly inside `dir`.
    pub fn file_names(&self, dir: &Path) -> Vec<String> {
        let state = self.state.read().unwrap();
        let mut names: Vec<String> = state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    /// Permission bits a file was created with, if it was created through the trait.
    pub fn mode(&self, path: &Path) -> Option<u32> {
        self.state.read().unwrap().modes.get(path).copied()
    }

    /// Record a birth time for a file.
    pub fn set_created(&self, path: &Path, created: SystemTime) {
        self.state
            .write()
            .unwrap()
            .created
            .insert(path.to_path_buf(), created);
    }

    /// Simulate another process holding the file open: rename and remove fail.
    pub fn lock(&self, path: &Path) {
        self.state.write().unwrap().locked.insert(path.to_path_buf());
    }

    pub fn unlock(&self, path: &Path) {
        self.state.write().unwrap().locked.remove(path);
    }

    /// Make every write to `path` fail.
    pub fn fail_writes(&self, path: &Path) {
        self.state
            .write()
            .unwrap()
            .failing_writes
            .insert(path.to_path_buf());
    }

    /// Make reads of `path` fail after the first chunk.
    pub fn fail_reads(&self, path: &Path) {
        self.state
            .write()
            .unwrap()
            .failing_reads
            .insert(path.to_path_buf());
    }

    /// Make closing a handle on `path` fail.
    pub fn fail_close(&self, path: &Path) {
        self.state
            .write()
            .unwrap()
            .failing_close
            .insert(path.to_path_buf());
    }

    fn writer(&self, path: &Path) -> MockWriter {
        MockWriter {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
        }
    }
}

impl Filesystem for MockFilesystem {
    type Writer = MockWriter;
    type Reader = MockReader;

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        for dir in path.ancestors() {
            state.dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        if !self.state.read().unwrap().dir_exists(dir) {
            return Err(not_found(dir));
        }
        Ok(self.file_names(dir))
    }

    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let state = self.state.read().unwrap();
        let data = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileStat {
            len: data.len() as u64,
            created: state.created.get(path).copied(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn open_write(&self, path: &Path, options: &CreateOptions) -> Result<MockWriter, FsError> {
        let mut state = self.state.write().unwrap();
        match state.files.get_mut(path) {
            Some(data) => {
                if options.open == OpenMode::Truncate {
                    data.clear();
                }
            }
            None => {
                state.files.insert(path.to_path_buf(), Vec::new());
                state.modes.insert(path.to_path_buf(), options.mode);
            }
        }
        drop(state);
        Ok(self.writer(path))
    }

    fn create_new(&self, path: &Path, mode: u32) -> Result<MockWriter, FsError> {
        let mut state = self.state.write().unwrap();
        if state.files.contains_key(path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            )));
        }
        state.files.insert(path.to_path_buf(), Vec::new());
        state.modes.insert(path.to_path_buf(), mode);
        drop(state);
        Ok(self.writer(path))
    }

    fn open_read(&self, path: &Path) -> Result<MockReader, FsError> {
        let state = self.state.read().unwrap();
        let data = state.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(MockReader {
            data: data.clone(),
            pos: 0,
            fail_after_first: state.failing_reads.contains(path),
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.locked.contains(from) || state.locked.contains(to) {
            return Err(busy(from));
        }
        let data = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), data);
        if let Some(mode) = state.modes.remove(from) {
            state.modes.insert(to.to_path_buf(), mode);
        }
        if let Some(created) = state.created.remove(from) {
            state.created.insert(to.to_path_buf(), created);
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        let data = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn truncate(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        let data = state.files.get_mut(path).ok_or_else(|| not_found(path))?;
        data.clear();
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.locked.contains(path) {
            return Err(busy(path));
        }
        state.files.remove(path).ok_or_else(|| not_found(path))?;
        state.modes.remove(path);
        state.created.remove(path);
        Ok(())
    }
}

/// Write handle into a [`MockFilesystem`].
#[derive(Debug)]
pub struct MockWriter {
    state: Arc<RwLock<MockState>>,
    path: PathBuf,
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.write().unwrap();
        if state.failing_writes.contains(&self.path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("write failed: {}", self.path.display()),
            ));
        }
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteHandle for MockWriter {
    fn close(self) -> Result<(), FsError> {
        if self.state.read().unwrap().failing_close.contains(&self.path) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("close failed: {}", self.path.display()),
            )));
        }
        Ok(())
    }
}

/// Read handle over a snapshot of a [`MockFilesystem`] file.
#[derive(Debug)]
pub struct MockReader {
    data: Vec<u8>,
    pos: usize,
    fail_after_first: bool,
}

impl Read for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_after_first && self.pos > 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "read failed"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
