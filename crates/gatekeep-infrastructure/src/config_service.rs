//! Configuration service implementation.
//!
//! Loads `config.toml`, applies environment overrides and validates the
//! result. A missing file yields the built-in defaults.

use crate::paths::GatekeepPaths;
use crate::storage::AtomicTomlFile;
use gatekeep_core::config::GatekeepConfig;
use gatekeep_core::{GatekeepError, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Selects the identity domain.
pub const DOMAIN_ENV: &str = "GATEKEEP_DOMAIN";
/// Replaces the selected domain's base URL.
pub const BASE_URL_ENV: &str = "GATEKEEP_BASE_URL";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: GatekeepPaths,
    config: Arc<RwLock<Option<GatekeepConfig>>>,
}

impl ConfigService {
    pub fn new(paths: GatekeepPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &GatekeepPaths {
        &self.paths
    }

    /// Returns the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<GatekeepConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_with(|key| std::env::var(key).ok())?;

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Loads the file and applies overrides from `lookup`, bypassing the cache.
    pub fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<GatekeepConfig> {
        let path = self.config_path()?;
        let mut config = AtomicTomlFile::<GatekeepConfig>::new(path.clone())
            .load()?
            .unwrap_or_else(|| {
                tracing::debug!("[Config] No config at {:?}, using defaults", path);
                GatekeepConfig::default()
            });

        apply_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the default configuration, refusing to overwrite an existing file.
    pub fn write_default(&self) -> Result<PathBuf> {
        let path = self.config_path()?;
        if path.exists() {
            return Err(GatekeepError::config(format!(
                "Config already exists at {}",
                path.display()
            )));
        }
        AtomicTomlFile::<GatekeepConfig>::new(path.clone()).save(&GatekeepConfig::default())?;
        tracing::info!("[Config] Wrote default config to {:?}", path);
        Ok(path)
    }

    fn config_path(&self) -> Result<PathBuf> {
        Ok(self.paths.config_file()?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(GatekeepPaths::default())
    }
}

/// Applies `GATEKEEP_DOMAIN` then `GATEKEEP_BASE_URL` to `config`.
pub fn apply_overrides(
    config: &mut GatekeepConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(domain) = non_empty(DOMAIN_ENV) {
        config.default_domain = domain;
    }

    if let Some(base_url) = non_empty(BASE_URL_ENV) {
        let selected = config.default_domain.clone();
        let domain = config
            .domains
            .iter_mut()
            .find(|d| d.name == selected)
            .ok_or_else(|| {
                GatekeepError::config(format!("{BASE_URL_ENV} set but domain '{selected}' is unknown"))
            })?;
        domain.base_url = base_url;
    }

    Ok(())
}
