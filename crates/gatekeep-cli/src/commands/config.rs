use super::{Target, load_config};
use anyhow::Result;
use gatekeep_infrastructure::{ConfigService, GatekeepPaths};

pub fn init() -> Result<()> {
    let path = ConfigService::new(GatekeepPaths::from_env()).write_default()?;
    println!("✅ Wrote {}", path.display());
    Ok(())
}

pub fn show(target: &Target) -> Result<()> {
    let (_, config) = load_config()?;
    // Fails early on an unknown --domain.
    config.domain(target.domain.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
