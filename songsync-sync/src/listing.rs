//! Authoritative record list.
//!
//! The record service exposes its tools over a single JSON endpoint:
//! `POST <base>/mcp` with `{"tool_name", "args"}` answers
//! `{"output": "<json>"}`, where the inner document is
//! `{"status": "success", "data": [{"artist", "song_name", ...}]}`.
//! The service caps each call at 100 rows, so the list is paged by offset.
//!
//! Paging is `LIMIT`/`OFFSET` over a query with no stable ordering. If the
//! service reorders rows between pages a record can be skipped, and a skipped
//! record's files are removed by that pass. Keep `page_size` at or above the
//! list length where possible so the whole list arrives in one page.

use serde::Deserialize;
use serde_json::{json, Value};

use songsync_core::{ConfigError, Record, SyncConfig};
use songsync_http::{HttpError, RetryPolicy, Transport};

use crate::error::{listing_err, SyncError};

const LIST_TOOL: &str = "list_music_data";
const SONGS_TABLE: &str = "songs";

/// Anything that can supply the authoritative record list for a pass.
pub trait RecordSource {
    fn fetch_records(&self) -> Result<Vec<Record>, SyncError>;
}

/// A fixed, in-memory record list.
#[derive(Debug, Clone, Default)]
pub struct StaticRecords(pub Vec<Record>);

impl RecordSource for StaticRecords {
    fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ToolOutput {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    song_name: Option<String>,
}

/// Records from one listing fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub records: Vec<Record>,
    /// The fetch stopped at `max_records` while more rows may exist.
    pub truncated: bool,
}

/// Result of one tool call, decided inside the retry loop.
enum Attempt {
    Reply(ToolOutput),
    Failed(SyncError),
}

/// Record list served by the record service's `list_music_data` tool.
pub struct McpListing<'a> {
    transport: &'a dyn Transport,
    endpoint: String,
    page_size: u32,
    max_records: u32,
    policy: RetryPolicy,
}

impl<'a> McpListing<'a> {
    pub fn new(transport: &'a dyn Transport, base_url: &str, page_size: u32, max_records: u32) -> Self {
        Self {
            transport,
            endpoint: format!("{}/mcp", base_url.trim_end_matches('/')),
            page_size: page_size.max(1),
            max_records,
            policy: RetryPolicy::default(),
        }
    }

    /// Retry budget for tool replies whose `output` is not valid JSON.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn from_config(transport: &'a dyn Transport, config: &SyncConfig) -> Result<Self, SyncError> {
        let base_url = config
            .listing_url()
            .ok_or(ConfigError::Missing("listing.base_url"))?;
        Ok(Self::new(
            transport,
            base_url,
            config.listing.page_size,
            config.listing.max_records,
        )
        .with_policy(RetryPolicy::from(&config.retry)))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fetch_page(&self, offset: usize, limit: u32) -> Result<Vec<Record>, SyncError> {
        let payload = json!({
            "tool_name": LIST_TOOL,
            "args": {
                "table_name": SONGS_TABLE,
                "limit": limit,
                "offset": offset,
            },
        });
        // The transport applies its own retries; only a garbled `output`
        // document is retried here.
        let attempt = self.policy.run(&format!("{LIST_TOOL} at offset {offset}"), |_| {
            match self.transport.post_json(&self.endpoint, &payload) {
                Ok(reply) => parse_tool_output(&self.endpoint, &reply),
                Err(err) => Ok(Attempt::Failed(listing_err(err.to_string()))),
            }
        });
        let output = match attempt {
            Ok(Attempt::Reply(output)) => output,
            Ok(Attempt::Failed(err)) => return Err(err),
            Err(err) => return Err(listing_err(err.to_string())),
        };

        if output.status != "success" {
            return Err(listing_err(format!(
                "{LIST_TOOL} returned status '{}': {}",
                output.status,
                output.message.unwrap_or_default()
            )));
        }

        Ok(output
            .data
            .into_iter()
            .map(|row| Record::from_columns(row.artist, row.song_name))
            .collect())
    }

    /// Fetch every page, up to `max_records`.
    pub fn fetch_listing(&self) -> Result<Listing, SyncError> {
        let max = self.max_records as usize;
        if max == 0 {
            return Err(listing_err("max_records is 0; refusing an empty list"));
        }
        let mut records = Vec::new();
        let mut complete = false;

        while records.len() < max {
            let limit = self.page_size.min((max - records.len()) as u32);
            let page = self.fetch_page(records.len(), limit)?;
            let got = page.len();
            tracing::debug!("listing page at offset {}: {got} rows", records.len());
            records.extend(page);

            // A short page is the last one; an oversized page means the
            // service ignored paging and already sent everything.
            if got != limit as usize {
                complete = true;
                break;
            }
        }

        let truncated = !complete || records.len() > max;
        records.truncate(max);
        Ok(Listing { records, truncated })
    }
}

impl RecordSource for McpListing<'_> {
    fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        let listing = self.fetch_listing()?;
        if listing.truncated {
            tracing::warn!(
                "record list stopped at max_records = {}; files of any further records will be deleted",
                self.max_records
            );
        }
        Ok(listing.records)
    }
}

/// Unwrap the tool reply. A missing `output` is a listing failure; an
/// `output` that does not decode is retryable.
fn parse_tool_output(endpoint: &str, reply: &Value) -> Result<Attempt, HttpError> {
    let Some(output) = reply.get("output") else {
        return Ok(Attempt::Failed(listing_err("response has no 'output' field")));
    };
    let parsed = match output {
        Value::String(inner) => serde_json::from_str(inner),
        other => serde_json::from_value(other.clone()),
    };
    parsed
        .map(Attempt::Reply)
        .map_err(|source| HttpError::MalformedJson {
            url: endpoint.to_string(),
            source,
        })
}
