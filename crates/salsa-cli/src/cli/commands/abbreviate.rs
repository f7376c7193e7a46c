//! `salsa-bridge abbreviate` – state/country name to two-letter code.

use anyhow::Result;
use salsa_core::abbrev;

pub fn run_abbreviate(value: &str, country: bool) -> Result<()> {
    let field = if country { "Country" } else { "State" };
    println!("{}", abbrev::abbreviate(value, field));
    Ok(())
}
