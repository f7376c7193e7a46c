//! CLI for the Salsa form bridge.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use salsa_core::config::{self, BridgeConfig};
use std::path::{Path, PathBuf};

use commands::{run_abbreviate, run_auth, run_check_host, run_groups, run_submit, run_tags};

/// Top-level CLI for the Salsa form bridge.
#[derive(Debug, Parser)]
#[command(name = "salsa-bridge")]
#[command(about = "Forward form submissions to the Salsa CRM", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/salsa-bridge/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Check whether a host is a known Salsa deployment.
    CheckHost {
        /// Hostname, with or without scheme.
        host: String,
    },

    /// Log in with the configured credentials and print the session.
    Auth,

    /// List the account's groups (cached).
    Groups {
        /// Ignore the cached list and fetch again.
        #[arg(long)]
        refresh: bool,
    },

    /// List the account's tags.
    Tags,

    /// Print the two-letter code for a state/province or country name.
    Abbreviate {
        /// Full name, e.g. "California".
        value: String,
        /// Look the value up as a country instead of a state.
        #[arg(long)]
        country: bool,
    },

    /// Forward one form entry to Salsa using a feed definition.
    Submit {
        /// Form definition (JSON).
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
        /// Submitted entry (JSON).
        #[arg(long, value_name = "FILE")]
        entry: PathBuf,
        /// Feed mapping (TOML).
        #[arg(long, value_name = "FILE")]
        feed: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // Commands that need no account settings.
        match &cli.command {
            CliCommand::CheckHost { host } => return run_check_host(host),
            CliCommand::Abbreviate { value, country } => return run_abbreviate(value, *country),
            _ => {}
        }

        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!(
            host = %cfg.salsa.host,
            user = %cfg.salsa.user,
            override_empty_fields = cfg.override_empty_fields,
            "loaded config"
        );

        match cli.command {
            CliCommand::Auth => run_auth(&cfg)?,
            CliCommand::Groups { refresh } => run_groups(&cfg, refresh)?,
            CliCommand::Tags => run_tags(&cfg)?,
            CliCommand::Submit { form, entry, feed } => run_submit(&cfg, &form, &entry, &feed)?,
            CliCommand::CheckHost { .. } | CliCommand::Abbreviate { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
