//! Submission mapper: one form entry in, one supporter save plus group and
//! tag assignments out.
//!
//! Steps run in order and are never retried:
//! 1. obtain the shared session;
//! 2. extract and validate `Email` (abort before any data call if invalid);
//! 3. extract the other mapped fields (`Tags` diverted, `State`/`Country` abbreviated);
//! 4. save the supporter;
//! 5. on success, add the supporter to each selected group;
//! 6. on success, apply each tag.
//!
//! Group and tag calls are independent: one failing does not stop the
//! others, and nothing already applied is rolled back.

pub mod extract;
pub mod feed;
pub mod form;
pub mod tags;

pub use extract::{extract, format_phone, is_valid_email};
pub use feed::{FeedCondition, FeedConfig, FeedError, FieldMapping, SUPPORTER_FIELDS};
pub use form::{Entry, FieldKind, FieldValue, FieldValueAccessor, Form, FormField, RawValues};
pub use tags::normalize_tags;

use crate::abbrev;
use crate::client::{Params, SaveResult, SalsaClient, Transport, SAVE_PATH};
use crate::error::SubmissionError;
use crate::session::SessionPool;

/// Fields for one supporter save. Always starts with `object=supporter` and `Email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupporterPayload {
    params: Params,
}

impl SupporterPayload {
    pub fn new(email: &str) -> Self {
        Self {
            params: Params::new().with("object", "supporter").with("Email", email),
        }
    }

    /// Set a supporter field. `object` and `Email` cannot be replaced.
    pub fn set(&mut self, field: &str, value: FieldValue) {
        if field == "object" || field == "Email" {
            return;
        }
        match value {
            FieldValue::Text(s) => self.params.set(field, s),
            FieldValue::List(v) => self.params.set(field, v),
        }
    }

    pub fn remove(&mut self, field: &str) {
        if field != "object" && field != "Email" {
            self.params.remove(field);
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// What happened to a processed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The feed's condition did not match; nothing was sent.
    Skipped,
    Submitted(SubmissionReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub email: String,
    pub supporter_key: String,
    pub groups_added: Vec<String>,
    /// (group key, error message)
    pub group_failures: Vec<(String, String)>,
    pub tags_added: Vec<String>,
    /// (tag, error message)
    pub tag_failures: Vec<(String, String)>,
}

impl SubmissionReport {
    pub fn is_complete(&self) -> bool {
        self.group_failures.is_empty() && self.tag_failures.is_empty()
    }
}

type PayloadHook = Box<dyn Fn(&mut SupporterPayload) + Send + Sync>;

pub struct SubmissionMapper {
    override_empty_fields: bool,
    accessor: Box<dyn FieldValueAccessor + Send + Sync>,
    payload_hook: Option<PayloadHook>,
}

impl Default for SubmissionMapper {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SubmissionMapper {
    /// With `override_empty_fields`, mapped fields whose value is empty are
    /// still sent and clear the value stored in Salsa.
    pub fn new(override_empty_fields: bool) -> Self {
        Self {
            override_empty_fields,
            accessor: Box::new(RawValues),
            payload_hook: None,
        }
    }

    pub fn with_accessor<A>(mut self, accessor: A) -> Self
    where
        A: FieldValueAccessor + Send + Sync + 'static,
    {
        self.accessor = Box::new(accessor);
        self
    }

    /// Last chance to adjust the payload before the supporter save.
    pub fn with_payload_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SupporterPayload) + Send + Sync + 'static,
    {
        self.payload_hook = Some(Box::new(hook));
        self
    }

    /// Build the supporter payload and the normalized tags (steps 2 and 3).
    pub fn build_payload(
        &self,
        feed: &FeedConfig,
        entry: &Entry,
        form: &Form,
    ) -> Result<(SupporterPayload, Vec<String>), SubmissionError> {
        let accessor = self.accessor.as_ref();
        let email = feed
            .source_for("Email")
            .map(|src| extract(form, entry, src, accessor).to_text())
            .unwrap_or_default();
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(SubmissionError::AbortedInvalidEmail(email.to_string()));
        }
        if !self.override_empty_fields {
            tracing::debug!("empty fields will not be overridden");
        }

        let mut payload = SupporterPayload::new(email);
        let mut tags = Vec::new();
        for mapping in feed.mapped() {
            let name = mapping.field.as_str();
            if name == "Email" {
                continue;
            }
            let mut value = extract(form, entry, &mapping.source, accessor);

            if name == "Tags" {
                tags = normalize_tags(&value);
                continue;
            }
            if name == "Country" || name == "State" {
                if let FieldValue::Text(s) = &value {
                    value = FieldValue::Text(abbrev::abbreviate(s, name));
                }
            }
            if value.is_empty() && !self.override_empty_fields {
                continue;
            }
            payload.set(name, value);
        }

        if let Some(hook) = &self.payload_hook {
            hook(&mut payload);
        }
        Ok((payload, tags))
    }

    /// Run one submission end to end against the shared session.
    pub fn process<T: Transport + Send>(
        &self,
        pool: &SessionPool<T>,
        feed: &FeedConfig,
        entry: &Entry,
        form: &Form,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        tracing::debug!(feed = %feed.name, "processing feed");

        if !feed.condition_met(form, entry, self.accessor.as_ref()) {
            tracing::info!(feed = %feed.name, "feed condition not met; skipping");
            return Ok(SubmissionOutcome::Skipped);
        }

        let mut client = pool.client().map_err(|e| {
            tracing::error!(error = %e, "failed to set up the API");
            SubmissionError::AbortedNoSession(e)
        })?;

        let (payload, tags) = self.build_payload(feed, entry, form).map_err(|e| {
            tracing::error!(error = %e, "a valid Email address must be provided");
            e
        })?;
        self.submit(&mut *client, feed, payload, &tags)
            .map(SubmissionOutcome::Submitted)
    }

    /// Steps 4 to 6 on an already authenticated client.
    ///
    /// Errors left on the client by earlier calls are discarded first, so
    /// after this returns the client's error list holds only this
    /// submission's failures.
    pub fn submit<T: Transport>(
        &self,
        client: &mut SalsaClient<T>,
        feed: &FeedConfig,
        payload: SupporterPayload,
        tags: &[String],
    ) -> Result<SubmissionReport, SubmissionError> {
        let email = payload
            .params()
            .get("Email")
            .and_then(|v| v.as_single())
            .unwrap_or_default()
            .to_string();
        let stale = client.errors(true);
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "discarding errors from earlier calls");
        }
        tracing::debug!(%email, fields = payload.params().len(), "saving supporter");

        let saved = client
            .post(SAVE_PATH, payload.params())
            .and_then(|v| SaveResult::from_response(&v));
        let saved = match saved {
            Ok(s) => s,
            Err(source) => {
                tracing::error!(%email, error = %source, "supporter save failed");
                return Err(SubmissionError::SaveFailed { email, source });
            }
        };
        let supporter_key = match (saved.is_success(), saved.key) {
            (true, Some(key)) => key,
            _ => {
                tracing::error!(%email, result = %saved.result, "supporter save was not successful");
                return Err(SubmissionError::SaveRejected {
                    email,
                    result: saved.result,
                });
            }
        };
        tracing::info!(%email, %supporter_key, "supporter saved");

        let mut report = SubmissionReport {
            email,
            supporter_key: supporter_key.clone(),
            ..SubmissionReport::default()
        };

        for group in feed.selected_groups() {
            let fields = Params::new()
                .with("supporter_KEY", supporter_key.as_str())
                .with("groups_KEY", group);
            match client.save_object("supporter_groups", fields) {
                Ok(r) if r.is_success() => report.groups_added.push(group.to_string()),
                Ok(r) => {
                    tracing::warn!(group, result = %r.result, "group assignment not successful");
                    report
                        .group_failures
                        .push((group.to_string(), format!("result {}", r.result)));
                }
                Err(e) => {
                    tracing::warn!(group, error = %e, "group assignment failed");
                    report.group_failures.push((group.to_string(), e.to_string()));
                }
            }
        }

        // Salsa rejects an empty tag.
        for tag in tags.iter().filter(|t| !t.is_empty()) {
            match client.tag_object("supporter", &supporter_key, tag) {
                Ok(_) => report.tags_added.push(tag.clone()),
                Err(e) => {
                    tracing::warn!(%tag, error = %e, "tagging failed");
                    report.tag_failures.push((tag.clone(), e.to_string()));
                }
            }
        }

        tracing::debug!(
            groups = report.groups_added.len(),
            tags = report.tags_added.len(),
            "submission finished"
        );
        Ok(report)
    }
}
