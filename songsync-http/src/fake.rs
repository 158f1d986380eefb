//! Scripted in-memory [`Transport`] for tests.
//!
//! Replies are keyed by exact URL. Each URL holds a queue of replies; the last
//! one repeats once the queue is drained. Unknown URLs answer HTTP 404.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::client::Transport;
use crate::error::{io_err, HttpError};

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Bytes(Vec<u8>),
    Status(u16),
}

#[derive(Debug, Default)]
struct State {
    replies: HashMap<String, VecDeque<Reply>>,
    calls: HashMap<String, u32>,
    posted: HashMap<String, Vec<Value>>,
    downloads: u32,
}

/// A [`Transport`] that serves canned replies and counts calls.
#[derive(Debug, Default)]
pub struct FakeTransport {
    state: Mutex<State>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply for `url` (GET or POST).
    pub fn reply_json(&self, url: impl Into<String>, body: Value) {
        self.push(url.into(), Reply::Json(body));
    }

    /// Queue a download body for `url`.
    pub fn reply_bytes(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.push(url.into(), Reply::Bytes(body.into()));
    }

    /// Queue an HTTP error status for `url`.
    pub fn reply_status(&self, url: impl Into<String>, status: u16) {
        self.push(url.into(), Reply::Status(status));
    }

    /// Number of requests made to `url`.
    pub fn calls(&self, url: &str) -> u32 {
        self.lock().calls.get(url).copied().unwrap_or(0)
    }

    /// Number of successful downloads across all URLs.
    pub fn downloads(&self) -> u32 {
        self.lock().downloads
    }

    /// JSON bodies POSTed to `url`, in order.
    pub fn posted(&self, url: &str) -> Vec<Value> {
        self.lock().posted.get(url).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, url: String, reply: Reply) {
        self.lock().replies.entry(url).or_default().push_back(reply);
    }

    fn next(&self, url: &str) -> Option<Reply> {
        let mut state = self.lock();
        *state.calls.entry(url.to_string()).or_default() += 1;
        let queue = state.replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn json_reply(&self, url: &str) -> Result<Value, HttpError> {
        match self.next(url) {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(status_err(url, status)),
            Some(Reply::Bytes(bytes)) => {
                serde_json::from_slice(&bytes).map_err(|source| HttpError::MalformedJson {
                    url: url.to_string(),
                    source,
                })
            }
            None => Err(status_err(url, 404)),
        }
    }
}

fn status_err(url: &str, status: u16) -> HttpError {
    HttpError::Status {
        url: url.to_string(),
        status,
    }
}

impl Transport for FakeTransport {
    fn get_json(&self, url: &str) -> Result<Value, HttpError> {
        self.json_reply(url)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError> {
        self.lock()
            .posted
            .entry(url.to_string())
            .or_default()
            .push(body.clone());
        self.json_reply(url)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, HttpError> {
        let bytes = match self.next(url) {
            Some(Reply::Bytes(bytes)) => bytes,
            Some(Reply::Json(value)) => value.to_string().into_bytes(),
            Some(Reply::Status(status)) => return Err(status_err(url, status)),
            None => return Err(status_err(url, 404)),
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(dest, &bytes).map_err(|e| io_err(dest, e))?;
        self.lock().downloads += 1;
        Ok(bytes.len() as u64)
    }
}
