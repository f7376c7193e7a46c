//! Error types for the Salsa client and the submission pipeline.

use thiserror::Error;

/// Failure of a single call against the Salsa API.
///
/// Every variant returned by [`crate::client::SalsaClient`] is also recorded in the
/// client's error list so callers that only look at `errors()` still see it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Host, user or password missing from the settings.
    #[error("This page is not configured correctly.")]
    NotConfigured,
    /// Host is not one of the known Salsa deployments.
    #[error("Invalid hostname provided: {0}")]
    InvalidHost(String),
    /// Login was refused or the login response was unusable.
    #[error("We were unable to authenticate with the server: {0}")]
    Auth(String),
    /// The server answered with an empty body.
    #[error("Unable to connect to the server and receive a response.")]
    EmptyResponse,
    /// The body could not be decoded, or a record was missing an expected key.
    #[error("Server provided an invalid response: {0}")]
    Decode(String),
    /// The body decoded but did not have the expected shape.
    #[error("Invalid {0} response received")]
    InvalidResponse(String),
    /// The API answered with an `error` member.
    #[error("Salsa reported an error: {0}")]
    Api(String),
    /// libcurl failed before a response arrived (DNS, connect, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(#[from] curl::Error),
}

/// Why a submission was not (fully) forwarded to Salsa.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// No authenticated session could be obtained; nothing was sent.
    #[error("failed to set up the API: {0}")]
    AbortedNoSession(#[source] ClientError),
    /// The mapped Email value is missing or malformed; nothing was sent.
    #[error("a valid Email address must be provided (got {0:?})")]
    AbortedInvalidEmail(String),
    /// The supporter save call itself failed.
    #[error("supporter save for {email} failed: {source}")]
    SaveFailed {
        email: String,
        #[source]
        source: ClientError,
    },
    /// The save call returned but Salsa did not report success.
    #[error("supporter save for {email} was not successful (result {result:?})")]
    SaveRejected { email: String, result: String },
}
