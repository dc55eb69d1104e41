use super::{Target, connect};
use anyhow::Result;

pub async fn run(target: &Target, path: &str) -> Result<()> {
    let service = connect(target)?;
    let state = service.bootstrap().await;

    match service.guard(path).await {
        Some(redirect) => println!("{} -> {} ({})", path, redirect.to, state),
        None => println!("{} ({})", path, state),
    }
    Ok(())
}
