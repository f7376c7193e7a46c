//! `salsa-bridge check-host` – allow-list lookup.

use anyhow::{bail, Result};
use salsa_core::hosts;

pub fn run_check_host(host: &str) -> Result<()> {
    if !hosts::is_valid_host(host) {
        bail!(
            "{} is not a known Salsa host (expected one of: {})",
            host,
            hosts::VALID_HOSTS.join(", ")
        );
    }
    println!("{}: ok", hosts::strip_scheme(host));
    Ok(())
}
