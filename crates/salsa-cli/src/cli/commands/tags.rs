//! `salsa-bridge tags` – list tags.

use anyhow::Result;
use salsa_core::config::BridgeConfig;
use salsa_core::SessionPool;

pub fn run_tags(cfg: &BridgeConfig) -> Result<()> {
    super::require_settings(cfg)?;
    let pool = SessionPool::from_config(cfg);
    let mut client = pool.client()?;
    let tags = client.get_tags();
    super::report_client_errors(&mut client);

    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }
    println!("{:<10} {:<12} {}", "KEY", "PREFIX", "TAG");
    for t in tags {
        let prefix = if t.kind.is_empty() { "-" } else { t.kind.as_str() };
        println!("{:<10} {:<12} {}", t.tag_key, prefix, t.tag);
    }
    Ok(())
}
