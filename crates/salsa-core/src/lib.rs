pub mod config;
pub mod logging;

// Salsa API client and the submission pipeline built on it
pub mod abbrev;
pub mod cache;
pub mod client;
pub mod error;
pub mod hosts;
pub mod mapper;
pub mod session;

pub use error::{ClientError, SubmissionError};
pub use session::{verify_credentials, SessionPool};
