pub mod config;
pub mod route;
pub mod session;

use anyhow::Result;
use gatekeep_application::AuthService;
use gatekeep_core::config::GatekeepConfig;
use gatekeep_core::token::TokenStore;
use gatekeep_infrastructure::{ConfigService, FileTokenStore, GatekeepPaths, MemoryTokenStore};
use std::sync::Arc;

/// Global flags selecting which session a command works on.
pub struct Target {
    pub domain: Option<String>,
    pub ephemeral: bool,
}

/// Loads the effective configuration.
pub fn load_config() -> Result<(GatekeepPaths, GatekeepConfig)> {
    let paths = GatekeepPaths::from_env();
    let config = ConfigService::new(paths.clone()).get_config()?;
    Ok((paths, config))
}

/// Builds the auth service for the selected identity domain.
pub fn connect(target: &Target) -> Result<AuthService> {
    let (paths, config) = load_config()?;
    let domain = config.domain(target.domain.as_deref())?;

    let store: Arc<dyn TokenStore> = if target.ephemeral {
        Arc::new(MemoryTokenStore::new())
    } else {
        Arc::new(FileTokenStore::for_domain(&paths, &domain.name)?)
    };

    Ok(AuthService::for_domain(domain, store, config.routes.guard())?)
}
