//! HTTP transport used by the client.
//!
//! The real implementation keeps one libcurl easy handle for the life of the
//! session so the login cookie is replayed on every later request.

use std::time::Duration;

/// Issues one form POST and returns the raw response body.
pub trait Transport {
    fn post(&mut self, url: &str, body: &str) -> Result<Vec<u8>, curl::Error>;
}

/// Blocking libcurl transport with an in-memory cookie jar.
pub struct CurlTransport {
    easy: curl::easy::Easy,
}

impl CurlTransport {
    /// Create a handle with the cookie engine enabled and both timeouts set.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        // Empty file name turns on the cookie engine without reading from disk.
        easy.cookie_file("")?;
        easy.cookie_session(true)?;
        easy.connect_timeout(connect_timeout)?;
        easy.timeout(timeout)?;
        easy.follow_location(false)?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/x-www-form-urlencoded")?;
        easy.http_headers(list)?;

        Ok(Self { easy })
    }
}

impl Transport for CurlTransport {
    fn post(&mut self, url: &str, body: &str) -> Result<Vec<u8>, curl::Error> {
        let mut out: Vec<u8> = Vec::new();
        self.easy.url(url)?;
        self.easy.post(true)?;
        self.easy.post_fields_copy(body.as_bytes())?;
        {
            let mut transfer = self.easy.transfer();
            transfer.write_function(|data| {
                out.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = self.easy.response_code()?;
        tracing::debug!(url, code, bytes = out.len(), "salsa response");
        Ok(out)
    }
}
