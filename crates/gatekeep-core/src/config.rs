//! Configuration model.
//!
//! Loading lives in `gatekeep-infrastructure::config_service`; this module
//! only defines the shape of `config.toml` and its defaults.

use crate::error::{GatekeepError, Result};
use crate::route::{DEFAULT_LANDING_ROUTE, DEFAULT_PUBLIC_GROUP, DEFAULT_SIGN_IN_ROUTE, RouteGuard};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DOMAIN_NAME: &str = "primary";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 500;
pub const DEFAULT_VERIFY_DELAY_MS: u64 = 1000;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GatekeepConfig {
    #[serde(default = "default_domain_name")]
    pub default_domain: String,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(rename = "domain", default = "default_domains")]
    pub domains: Vec<DomainConfig>,
}

impl Default for GatekeepConfig {
    fn default() -> Self {
        Self {
            default_domain: default_domain_name(),
            routes: RoutesConfig::default(),
            domains: default_domains(),
        }
    }
}

impl GatekeepConfig {
    /// Looks up a domain by name, or the default domain when `name` is `None`.
    pub fn domain(&self, name: Option<&str>) -> Result<&DomainConfig> {
        let wanted = name.unwrap_or(self.default_domain.as_str());
        self.domains
            .iter()
            .find(|d| d.name == wanted)
            .ok_or_else(|| GatekeepError::config(format!("Unknown identity domain '{wanted}'")))
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(GatekeepError::config("At least one [[domain]] is required"));
        }
        for (i, domain) in self.domains.iter().enumerate() {
            domain.validate()?;
            if self.domains[..i].iter().any(|d| d.name == domain.name) {
                return Err(GatekeepError::config(format!(
                    "Duplicate identity domain '{}'",
                    domain.name
                )));
            }
        }
        self.domain(None)?;
        Ok(())
    }
}

/// Route names used by the guard.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RoutesConfig {
    #[serde(default = "default_public_group")]
    pub public_group: String,
    #[serde(default = "default_sign_in")]
    pub sign_in: String,
    #[serde(default = "default_landing")]
    pub landing: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            public_group: default_public_group(),
            sign_in: default_sign_in(),
            landing: default_landing(),
        }
    }
}

impl RoutesConfig {
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(&self.public_group, &self.sign_in, &self.landing)
    }
}

/// One identity API and its storage namespace.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DomainConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default)]
    pub verification: VerificationPolicy,
}

impl DomainConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_request_interval_ms: DEFAULT_MIN_REQUEST_INTERVAL_MS,
            verification: VerificationPolicy::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(GatekeepError::config(format!(
                "Domain name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GatekeepError::config(format!(
                "Domain '{}' base_url must start with http:// or https://",
                self.name
            )));
        }
        if self.timeout_secs == 0 {
            return Err(GatekeepError::config(format!(
                "Domain '{}' timeout_secs must be greater than zero",
                self.name
            )));
        }
        self.verification.validate()
    }
}

/// How long to wait between persisting fresh tokens and validating them.
///
/// The upstream identity service is not read-after-write consistent, so a
/// token that was just issued may be rejected for a short while.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerificationPolicy {
    /// One unconditional delay, then a single validation call.
    Fixed {
        #[serde(default = "default_verify_delay_ms")]
        delay_ms: u64,
    },
    /// Up to `max_attempts` validation calls, doubling the delay each time.
    Backoff {
        max_attempts: u32,
        initial_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        VerificationPolicy::Fixed {
            delay_ms: DEFAULT_VERIFY_DELAY_MS,
        }
    }
}

impl VerificationPolicy {
    /// Delay before each validation attempt, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        match *self {
            VerificationPolicy::Fixed { delay_ms } => vec![Duration::from_millis(delay_ms)],
            VerificationPolicy::Backoff {
                max_attempts,
                initial_delay_ms,
                max_delay_ms,
            } => {
                let mut delay = initial_delay_ms;
                (0..max_attempts)
                    .map(|_| {
                        let current = delay.min(max_delay_ms);
                        delay = delay.saturating_mul(2);
                        Duration::from_millis(current)
                    })
                    .collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if let VerificationPolicy::Backoff {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
        } = *self
        {
            if max_attempts == 0 {
                return Err(GatekeepError::config("verification.max_attempts must be at least 1"));
            }
            if initial_delay_ms > max_delay_ms {
                return Err(GatekeepError::config(
                    "verification.initial_delay_ms must not exceed max_delay_ms",
                ));
            }
        }
        Ok(())
    }
}

fn default_domain_name() -> String {
    DEFAULT_DOMAIN_NAME.to_string()
}

fn default_domains() -> Vec<DomainConfig> {
    vec![DomainConfig::new(DEFAULT_DOMAIN_NAME, DEFAULT_BASE_URL)]
}

fn default_public_group() -> String {
    DEFAULT_PUBLIC_GROUP.to_string()
}

fn default_sign_in() -> String {
    DEFAULT_SIGN_IN_ROUTE.to_string()
}

fn default_landing() -> String {
    DEFAULT_LANDING_ROUTE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_min_request_interval_ms() -> u64 {
    DEFAULT_MIN_REQUEST_INTERVAL_MS
}

fn default_verify_delay_ms() -> u64 {
    DEFAULT_VERIFY_DELAY_MS
}
