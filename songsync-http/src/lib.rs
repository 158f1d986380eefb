//! # songsync-http
//!
//! Resilient outbound HTTP for the sync engine.
//!
//! [`HttpClient`] wraps a blocking `ureq` agent in a [`RetryPolicy`] and
//! implements [`Transport`], the seam the resolver, writer and listing client
//! depend on. Tests swap in [`FakeTransport`] (feature `test-util`).

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod retry;

pub use client::{HttpClient, Transport};
pub use error::HttpError;
#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeTransport;
pub use retry::RetryPolicy;
