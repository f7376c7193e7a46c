//! `salsa-bridge groups` – list groups through the file cache.

use anyhow::Result;
use salsa_core::cache::{FileCache, GroupDirectory};
use salsa_core::config::BridgeConfig;
use salsa_core::SessionPool;

pub fn run_groups(cfg: &BridgeConfig, refresh: bool) -> Result<()> {
    super::require_settings(cfg)?;
    let cache = FileCache::open(&FileCache::default_path()?)?;
    let mut directory = GroupDirectory::new(cache, cfg.group_cache_ttl());
    if refresh {
        directory.invalidate()?;
    }

    let pool = SessionPool::from_config(cfg);
    let mut client = pool.client()?;
    let groups = directory.groups(&mut *client);
    super::report_client_errors(&mut client);

    if groups.is_empty() {
        println!("No groups found.");
        return Ok(());
    }
    println!("{:<10} {}", "KEY", "NAME");
    for g in groups {
        println!("{:<10} {}", g.groups_key, g.name);
    }
    Ok(())
}
