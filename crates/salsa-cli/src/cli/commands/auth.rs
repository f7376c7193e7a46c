//! `salsa-bridge auth` – verify the configured credentials.

use anyhow::{Context, Result};
use salsa_core::config::BridgeConfig;
use salsa_core::verify_credentials;

pub fn run_auth(cfg: &BridgeConfig) -> Result<()> {
    super::require_settings(cfg)?;
    let session = verify_credentials(cfg).context("Salsa login failed")?;
    println!("host:             {}", session.host);
    println!(
        "organization_KEY: {}",
        session.organization_key.as_deref().unwrap_or("-")
    );
    if let Some(chapter) = &session.chapter_key {
        println!("chapter_KEY:      {chapter}");
    }
    Ok(())
}
