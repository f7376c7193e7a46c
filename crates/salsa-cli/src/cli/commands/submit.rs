//! `salsa-bridge submit` – run one form entry through a feed.

use anyhow::{Context, Result};
use salsa_core::config::BridgeConfig;
use salsa_core::mapper::{Entry, FeedConfig, Form, SubmissionMapper, SubmissionOutcome};
use salsa_core::SessionPool;
use serde::de::DeserializeOwned;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read {what}: {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parse {what}: {}", path.display()))
}

pub(crate) fn load_feed(path: &Path) -> Result<FeedConfig> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("read feed: {}", path.display()))?;
    let mut feed: FeedConfig =
        toml::from_str(&data).with_context(|| format!("parse feed: {}", path.display()))?;
    if feed.name.is_empty() {
        feed.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    feed.validate()?;
    Ok(feed)
}

pub fn run_submit(cfg: &BridgeConfig, form: &Path, entry: &Path, feed: &Path) -> Result<()> {
    super::require_settings(cfg)?;
    let form: Form = read_json(form, "form")?;
    let entry: Entry = read_json(entry, "entry")?;
    let feed = load_feed(feed)?;

    let pool = SessionPool::from_config(cfg);
    let mapper = SubmissionMapper::new(cfg.override_empty_fields);
    match mapper.process(&pool, &feed, &entry, &form)? {
        SubmissionOutcome::Skipped => {
            println!("Feed {:?}: condition not met, nothing sent.", feed.name);
        }
        SubmissionOutcome::Submitted(report) => {
            println!("Saved {} as supporter {}", report.email, report.supporter_key);
            for g in &report.groups_added {
                println!("  + group {g}");
            }
            for (g, err) in &report.group_failures {
                println!("  ! group {g}: {err}");
            }
            for t in &report.tags_added {
                println!("  + tag {t}");
            }
            for (t, err) in &report.tag_failures {
                println!("  ! tag {t}: {err}");
            }
        }
    }
    Ok(())
}
