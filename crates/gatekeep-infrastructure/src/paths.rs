//! Unified path management for gatekeep files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/gatekeep/          # Config directory
//! └── config.toml              # Domains, routes, verification policy
//!
//! ~/.local/share/gatekeep/     # Data directory
//! └── sessions/                # One token file per identity domain
//!     └── <domain>.json
//! ```
//!
//! `GATEKEEP_CONFIG` overrides the config file path and `GATEKEEP_DATA_DIR`
//! the data directory. A base path (used by tests) puts everything under
//! that directory instead.

use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "GATEKEEP_CONFIG";
pub const DATA_DIR_ENV: &str = "GATEKEEP_DATA_DIR";

const APP_DIR: &str = "gatekeep";
const CONFIG_FILE: &str = "config.toml";
const SESSIONS_DIR: &str = "sessions";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for gatekeep_core::GatekeepError {
    fn from(err: PathError) -> Self {
        gatekeep_core::GatekeepError::config(err.to_string())
    }
}

/// Resolves where gatekeep keeps its files.
#[derive(Debug, Clone)]
pub struct GatekeepPaths {
    base: Option<PathBuf>,
    config_override: Option<PathBuf>,
    data_override: Option<PathBuf>,
}

impl GatekeepPaths {
    /// Creates a resolver. With `Some(base)`, every path lives under `base`.
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
            config_override: None,
            data_override: None,
        }
    }

    /// Creates a resolver honouring `GATEKEEP_CONFIG` / `GATEKEEP_DATA_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatekeepPaths::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        Self {
            base: None,
            config_override: non_empty(CONFIG_ENV),
            data_override: non_empty(DATA_DIR_ENV),
        }
    }

    /// Path of `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        if let Some(path) = &self.config_override {
            return Ok(path.clone());
        }
        if let Some(base) = &self.base {
            return Ok(base.join(CONFIG_FILE));
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Directory holding one token file per identity domain.
    pub fn sessions_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(path) = &self.data_override {
            return Ok(path.join(SESSIONS_DIR));
        }
        if let Some(base) = &self.base {
            return Ok(base.join(SESSIONS_DIR));
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(SESSIONS_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Token file of one identity domain.
    ///
    /// Domain names are validated by the config layer to `[A-Za-z0-9_-]`.
    pub fn session_file(&self, domain: &str) -> Result<PathBuf, PathError> {
        Ok(self.sessions_dir()?.join(format!("{domain}.json")))
    }
}

impl Default for GatekeepPaths {
    fn default() -> Self {
        Self::from_env()
    }
}
