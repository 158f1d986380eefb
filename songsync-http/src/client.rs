//! `ureq`-backed [`Transport`] with retries.
//!
//! ## `download`: streaming protocol
//!
//! 1. Create the destination's parent directory.
//! 2. Stream the body in 8 KiB chunks into `<dest>.songsync.part`.
//!    Read errors are network errors (retried); write errors are local
//!    filesystem errors (returned at once).
//! 3. Rename the part file over `dest` once the body is complete.
//! 4. On any failure remove the part file; `dest` is never left half-written.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use songsync_core::SyncConfig;

use crate::error::{io_err, transport_err, HttpError};
use crate::retry::RetryPolicy;

/// Chunk size used while streaming a download to disk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Outbound requests the sync engine needs.
///
/// Implementations are expected to apply their own retry policy, so a
/// returned error is terminal for that call.
pub trait Transport {
    /// `GET url` and parse the body as JSON.
    fn get_json(&self, url: &str) -> Result<Value, HttpError>;

    /// `POST url` with a JSON body and parse the reply as JSON.
    fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError>;

    /// Stream `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, HttpError>;
}

/// Sibling path a download is staged in before the final rename.
pub fn part_path(dest: &Path) -> PathBuf {
    PathBuf::from(format!("{}.songsync.part", dest.display()))
}

/// Blocking HTTP client with bounded retry.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("songsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, policy }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.request_timeout(), RetryPolicy::from(&config.retry))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn read_json(url: &str, response: ureq::Response) -> Result<Value, HttpError> {
        let body = response.into_string().map_err(|e| transport_err(url, e))?;
        serde_json::from_str(&body).map_err(|source| HttpError::MalformedJson {
            url: url.to_string(),
            source,
        })
    }

    fn download_once(&self, url: &str, part: &Path) -> Result<u64, HttpError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| HttpError::from((url, e)))?;
        let mut reader = response.into_reader();
        let mut file = File::create(part).map_err(|e| io_err(part, e))?;

        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(transport_err(url, e)),
            };
            file.write_all(&buf[..n]).map_err(|e| io_err(part, e))?;
            total += n as u64;
        }
        file.flush().map_err(|e| io_err(part, e))?;
        Ok(total)
    }
}

impl Transport for HttpClient {
    fn get_json(&self, url: &str) -> Result<Value, HttpError> {
        self.policy.run(&format!("GET {url}"), |_| {
            let response = self
                .agent
                .get(url)
                .call()
                .map_err(|e| HttpError::from((url, e)))?;
            Self::read_json(url, response)
        })
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError> {
        self.policy.run(&format!("POST {url}"), |_| {
            let response = self
                .agent
                .post(url)
                .send_json(body)
                .map_err(|e| HttpError::from((url, e)))?;
            Self::read_json(url, response)
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, HttpError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let part = part_path(dest);

        let result = self
            .policy
            .run(&format!("download {url}"), |_| self.download_once(url, &part));

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = std::fs::remove_file(&part);
                return Err(err);
            }
        };

        if let Err(e) = std::fs::rename(&part, dest) {
            let _ = std::fs::remove_file(&part);
            return Err(io_err(dest, e));
        }
        tracing::debug!("downloaded {bytes} bytes to {}", dest.display());
        Ok(bytes)
    }
}
