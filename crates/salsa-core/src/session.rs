//! Process-wide memoized Salsa session.
//!
//! The first caller authenticates; concurrent callers block on the same
//! initialization instead of logging in again. A failed login is not
//! memoized, so the next submission retries it.

use std::sync::{Mutex, MutexGuard};

use once_cell::sync::OnceCell;

use crate::client::{CurlTransport, Credentials, SalsaClient, Session, Transport};
use crate::config::BridgeConfig;
use crate::error::ClientError;

type Connector<T> = Box<dyn Fn() -> Result<T, curl::Error> + Send + Sync>;

pub struct SessionPool<T: Transport = CurlTransport> {
    credentials: Credentials,
    connect: Connector<T>,
    client: OnceCell<Mutex<SalsaClient<T>>>,
}

impl SessionPool<CurlTransport> {
    /// Pool that opens one curl handle with the configured timeouts.
    pub fn from_config(cfg: &BridgeConfig) -> Self {
        let connect_timeout = cfg.connect_timeout();
        let timeout = cfg.timeout();
        Self::with_connector(cfg.salsa.credentials(), move || {
            CurlTransport::new(connect_timeout, timeout)
        })
    }
}

impl<T: Transport + Send> SessionPool<T> {
    pub fn with_connector<F>(credentials: Credentials, connect: F) -> Self
    where
        F: Fn() -> Result<T, curl::Error> + Send + Sync + 'static,
    {
        Self {
            credentials,
            connect: Box::new(connect),
            client: OnceCell::new(),
        }
    }

    /// The shared client, authenticating on first use.
    pub fn client(&self) -> Result<MutexGuard<'_, SalsaClient<T>>, ClientError> {
        let cell = self.client.get_or_try_init(|| {
            let transport = (self.connect)().map_err(|e| {
                tracing::error!(error = %e, "failed to initialize HTTP transport");
                ClientError::Transport(e)
            })?;
            SalsaClient::authenticate(transport, &self.credentials).map(Mutex::new)
        })?;
        Ok(cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    pub fn is_connected(&self) -> bool {
        self.client.get().is_some()
    }

    /// Authenticate (if not already) and return the session.
    ///
    /// Only the login decides the outcome; errors recorded by later data
    /// calls on the shared client are left alone.
    pub fn verify(&self) -> Result<Session, ClientError> {
        let client = self.client()?;
        Ok(client.session().clone())
    }
}

/// One-shot credential check against the configured account.
pub fn verify_credentials(cfg: &BridgeConfig) -> Result<Session, ClientError> {
    if !cfg.salsa.is_configured() {
        return Err(ClientError::NotConfigured);
    }
    SessionPool::from_config(cfg).verify()
}
