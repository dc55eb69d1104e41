use super::{Target, connect};
use anyhow::{Context, Result, bail};
use gatekeep_core::GatekeepError;
use gatekeep_core::session::{AuthState, Credentials};
use gatekeep_core::user::UserProfile;
use std::io::BufRead;

const PASSWORD_ENV: &str = "GATEKEEP_PASSWORD";

pub async fn status(target: &Target) -> Result<()> {
    let service = connect(target)?;
    let state = service.bootstrap().await;

    match service.snapshot().await.user {
        Some(user) if state == AuthState::Authenticated => {
            println!("✅ {} as {}", state, user.display_name());
        }
        _ => println!("{}", state),
    }
    Ok(())
}

pub async fn login(target: &Target, account: String) -> Result<()> {
    let password = read_password()?;
    let service = connect(target)?;
    service.bootstrap().await;

    let user = service
        .login(&Credentials::new(account, password))
        .await
        .map_err(surface)?;
    println!("✅ Signed in as {}", user.display_name());
    Ok(())
}

pub async fn logout(target: &Target) -> Result<()> {
    let service = connect(target)?;
    service.logout().await;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(target: &Target) -> Result<()> {
    let service = connect(target)?;
    if service.bootstrap().await != AuthState::Authenticated {
        bail!("Not signed in");
    }

    // Bootstrap already validated the token and fetched the profile.
    let user = signed_in_profile(service.snapshot().await.user)?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

fn signed_in_profile(user: Option<UserProfile>) -> Result<UserProfile> {
    user.context("Signed in but no profile is cached")
}

pub async fn refresh(target: &Target) -> Result<()> {
    let service = connect(target)?;
    if service.bootstrap().await != AuthState::Authenticated {
        bail!("Not signed in");
    }

    service.refresh_tokens().await.map_err(surface)?;
    println!("✅ Tokens refreshed");
    Ok(())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    // No terminal handling here: the password is echoed as typed.
    eprint!("Password (input is visible): ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Replaces the error with the text meant for end users.
fn surface(err: GatekeepError) -> anyhow::Error {
    tracing::debug!("{}", err);
    anyhow::anyhow!(err.user_message())
}
