//! CLI command handlers, one file per command.

mod abbreviate;
mod auth;
mod check_host;
mod groups;
mod submit;
mod tags;

pub use abbreviate::run_abbreviate;
pub use auth::run_auth;
pub use check_host::run_check_host;
pub use groups::run_groups;
pub use submit::run_submit;
#[cfg(test)]
pub(crate) use submit::load_feed;
pub use tags::run_tags;

use anyhow::{bail, Result};
use salsa_core::client::SalsaClient;

/// Print errors the client recorded (and clear them).
fn report_client_errors(client: &mut SalsaClient) {
    for e in client.errors(true) {
        eprintln!("warning: {e}");
    }
}

fn require_settings(cfg: &salsa_core::config::BridgeConfig) -> Result<()> {
    if !cfg.salsa.is_configured() {
        bail!(
            "Salsa host, user and password must be set in [salsa] of {}",
            salsa_core::config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "config.toml".to_string())
        );
    }
    Ok(())
}
