//! Atomic file operations for small JSON/TOML documents.
//!
//! Writes go to a temporary sibling, are fsynced, then renamed over the
//! target, so readers see either the old or the new document. Updates and
//! removals take an exclusive lock file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Errors that can occur during atomic file operations.
#[derive(Debug)]
pub enum AtomicFileError {
    /// File I/O error.
    IoError(std::io::Error),
    /// Parse or render error in the given format.
    FormatError { format: &'static str, message: String },
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicFileError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicFileError::FormatError { format, message } => {
                write!(f, "{} error: {}", format, message)
            }
            AtomicFileError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicFileError {}

impl From<std::io::Error> for AtomicFileError {
    fn from(e: std::io::Error) -> Self {
        AtomicFileError::IoError(e)
    }
}

impl From<AtomicFileError> for gatekeep_core::GatekeepError {
    fn from(err: AtomicFileError) -> Self {
        match err {
            AtomicFileError::FormatError { format, message } => {
                gatekeep_core::GatekeepError::Serialization {
                    format: format.to_string(),
                    message,
                }
            }
            other => gatekeep_core::GatekeepError::storage(other.to_string()),
        }
    }
}

/// On-disk encoding of an [`AtomicFile`].
pub trait FileFormat {
    const NAME: &'static str;

    fn parse<T: DeserializeOwned>(content: &str) -> Result<T, AtomicFileError>;

    fn render<T: Serialize>(data: &T) -> Result<String, AtomicFileError>;
}

/// Pretty-printed JSON.
pub struct Json;

impl FileFormat for Json {
    const NAME: &'static str = "JSON";

    fn parse<T: DeserializeOwned>(content: &str) -> Result<T, AtomicFileError> {
        serde_json::from_str(content).map_err(|e| AtomicFileError::FormatError {
            format: Self::NAME,
            message: e.to_string(),
        })
    }

    fn render<T: Serialize>(data: &T) -> Result<String, AtomicFileError> {
        serde_json::to_string_pretty(data).map_err(|e| AtomicFileError::FormatError {
            format: Self::NAME,
            message: e.to_string(),
        })
    }
}

/// TOML.
pub struct Toml;

impl FileFormat for Toml {
    const NAME: &'static str = "TOML";

    fn parse<T: DeserializeOwned>(content: &str) -> Result<T, AtomicFileError> {
        toml::from_str(content).map_err(|e| AtomicFileError::FormatError {
            format: Self::NAME,
            message: e.to_string(),
        })
    }

    fn render<T: Serialize>(data: &T) -> Result<String, AtomicFileError> {
        toml::to_string_pretty(data).map_err(|e| AtomicFileError::FormatError {
            format: Self::NAME,
            message: e.to_string(),
        })
    }
}

pub type AtomicJsonFile<T> = AtomicFile<T, Json>;
pub type AtomicTomlFile<T> = AtomicFile<T, Toml>;

/// A handle to a document stored atomically at `path`.
pub struct AtomicFile<T, F> {
    path: PathBuf,
    mode: Option<u32>,
    _phantom: PhantomData<(T, F)>,
}

impl<T, F> AtomicFile<T, F>
where
    T: Serialize + DeserializeOwned,
    F: FileFormat,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            mode: None,
            _phantom: PhantomData,
        }
    }

    /// Unix permission bits applied to every write (e.g. `0o600`).
    /// Ignored on other platforms.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and parses the file.
    ///
    /// - `Ok(Some(T))`: loaded
    /// - `Ok(None)`: file missing or empty
    /// - `Err`: unreadable or unparsable
    pub fn load(&self) -> Result<Option<T>, AtomicFileError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        F::parse(&content).map(Some)
    }

    /// Writes `data` via tmp file + fsync + rename.
    pub fn save(&self, data: &T) -> Result<(), AtomicFileError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let rendered = F::render(data)?;

        let tmp_path = self.get_temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        self.apply_mode(&tmp_path)?;
        tmp_file.write_all(rendered.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Load-modify-save under an exclusive lock.
    pub fn update<U>(&self, default_value: T, f: U) -> Result<(), AtomicFileError>
    where
        U: FnOnce(&mut T) -> Result<(), AtomicFileError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data)?;
        self.save(&data)?;

        Ok(())
    }

    /// Deletes the file under an exclusive lock. A missing file is fine.
    pub fn remove(&self) -> Result<(), AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(unix)]
    fn apply_mode(&self, path: &Path) -> Result<(), AtomicFileError> {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = self.mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply_mode(&self, _path: &Path) -> Result<(), AtomicFileError> {
        Ok(())
    }

    fn get_temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let parent = self.path.parent().ok_or_else(|| {
            AtomicFileError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        })?;

        let file_name = self.path.file_name().ok_or_else(|| {
            AtomicFileError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no file name",
            ))
        })?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// Exclusive lock held for the lifetime of the guard.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicFileError::LockError(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
