//! Record → remote resource resolution.
//!
//! Three lookups against the music API, all sharing the envelope
//! `{"code": 200, "data": ...}`:
//!
//! 1. `GET <base>?word=<query>`: search; the first hit wins.
//! 2. `GET <base>/geturl?id=<id>`: media URL and format (required).
//! 3. `GET <base>/lyric?id=<id>`: lyric and translation (best effort).
//!
//! Matching is first-result-only: no ranking is applied to search hits.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use songsync_core::{sanitize_filename, Record, RemoteId, ResolvedResource};
use songsync_http::Transport;

use crate::error::SyncError;

const SUCCESS_CODE: i64 = 200;
const DEFAULT_FORMAT: &str = "mp3";

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    song: String,
    singer: String,
    id: RemoteId,
}

#[derive(Debug, Deserialize)]
struct Details {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Lyrics {
    #[serde(default)]
    lrc: Option<String>,
    #[serde(default)]
    trans: Option<String>,
}

/// Build the search query for a record: `"<artist> <title>"` with hyphens
/// turned into spaces.
pub fn normalize_query(artist: &str, title: &str) -> String {
    format!("{artist} {title}").replace('-', " ").trim().to_string()
}

/// Resolves records against the music API.
pub struct Resolver<'a> {
    transport: &'a dyn Transport,
    base_url: String,
}

impl<'a> Resolver<'a> {
    pub fn new(transport: &'a dyn Transport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}?word={}", self.base_url, urlencoding::encode(query))
    }

    pub fn details_url(&self, id: &RemoteId) -> String {
        format!("{}/geturl?id={}", self.base_url, urlencoding::encode(&id.0))
    }

    pub fn lyrics_url(&self, id: &RemoteId) -> String {
        format!("{}/lyric?id={}", self.base_url, urlencoding::encode(&id.0))
    }

    /// Resolve `record` to a concrete resource.
    ///
    /// Fails with [`SyncError::NoMatch`] when the search has no hits and
    /// [`SyncError::DetailsUnavailable`] when no media URL comes back. Lyric
    /// lookup failures are logged and leave the lyric fields empty.
    pub fn resolve(&self, record: &Record) -> Result<ResolvedResource, SyncError> {
        let query = normalize_query(&record.artist, &record.title);

        let hits: Vec<SearchHit> = self
            .fetch("search", &self.search_url(&query))?
            .unwrap_or_default();
        let Some(hit) = hits.into_iter().next() else {
            return Err(SyncError::NoMatch { query });
        };
        tracing::info!(
            "matched '{}' → {} - {} (id {})",
            record,
            hit.song,
            hit.singer,
            hit.id
        );

        let details: Option<Details> = self.fetch("details", &self.details_url(&hit.id))?;
        let (media_url, format) = match details {
            Some(Details {
                url: Some(url),
                format,
            }) if !url.trim().is_empty() => (url, format),
            _ => {
                return Err(SyncError::DetailsUnavailable {
                    id: hit.id.0.clone(),
                })
            }
        };

        let lyrics = match self.fetch::<Lyrics>("lyrics", &self.lyrics_url(&hit.id)) {
            Ok(lyrics) => lyrics.unwrap_or_default(),
            Err(err) => {
                tracing::warn!("lyrics unavailable for '{}': {err}", record);
                Lyrics::default()
            }
        };

        Ok(ResolvedResource {
            matched_title: hit.song,
            matched_artist: hit.singer,
            remote_id: hit.id,
            media_url,
            media_format: normalize_format(format.as_deref()),
            lyric: non_empty(lyrics.lrc),
            translation: non_empty(lyrics.trans),
        })
    }

    /// GET `url` and unwrap its envelope. `Ok(None)` means the API answered
    /// with a non-success code or no data.
    fn fetch<T: DeserializeOwned>(&self, endpoint: &'static str, url: &str) -> Result<Option<T>, SyncError> {
        let body = self.transport.get_json(url)?;
        let envelope: Envelope = serde_json::from_value(body)
            .map_err(|source| SyncError::UnexpectedShape { endpoint, source })?;

        if envelope.code != SUCCESS_CODE {
            tracing::debug!("{endpoint} returned code {}", envelope.code);
            return Ok(None);
        }
        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => serde_json::from_value(data)
                .map(Some)
                .map_err(|source| SyncError::UnexpectedShape { endpoint, source }),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// Media format reported by the API, made safe for use as an extension.
fn normalize_format(format: Option<&str>) -> String {
    let cleaned = sanitize_filename(format.unwrap_or_default())
        .trim_start_matches('.')
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        DEFAULT_FORMAT.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;
    use songsync_http::FakeTransport;

    use super::*;

    const BASE: &str = "http://music.local/api";

    fn script(fake: &FakeTransport, search: Value, details: Value, lyrics: Value) {
        let r = Resolver::new(fake, BASE);
        fake.reply_json(r.search_url("A X"), search);
        fake.reply_json(r.details_url(&RemoteId::from("1")), details);
        fake.reply_json(r.lyrics_url(&RemoteId::from("1")), lyrics);
    }

    fn one_hit() -> Value {
        json!({"code": 200, "data": [
            {"song": "X", "singer": "A", "id": 1},
            {"song": "X (live)", "singer": "A", "id": 2}
        ]})
    }

    #[rstest]
    #[case("A", "X", "A X")]
    #[case("Jay-Z", "Run-This-Town", "Jay Z Run This Town")]
    #[case("  A", "X  ", "A X")]
    fn builds_normalized_query(#[case] artist: &str, #[case] title: &str, #[case] expected: &str) {
        assert_eq!(normalize_query(artist, title), expected);
    }

    #[test]
    fn search_url_is_percent_encoded() {
        let fake = FakeTransport::new();
        let r = Resolver::new(&fake, "http://music.local/api/");
        assert_eq!(
            r.search_url("周杰伦 晴天"),
            "http://music.local/api?word=%E5%91%A8%E6%9D%B0%E4%BC%A6%20%E6%99%B4%E5%A4%A9"
        );
    }

    #[test]
    fn resolves_first_hit_with_lyrics() {
        let fake = FakeTransport::new();
        script(
            &fake,
            one_hit(),
            json!({"code": 200, "data": {"url": "http://x/media.flac", "format": "FLAC"}}),
            json!({"code": 200, "data": {"lrc": "[00:01]la", "trans": "  "}}),
        );

        let resolved = Resolver::new(&fake, BASE)
            .resolve(&Record::new("A", "X"))
            .expect("resolve");
        assert_eq!(resolved.matched_title, "X");
        assert_eq!(resolved.matched_artist, "A");
        assert_eq!(resolved.remote_id, RemoteId::from("1"));
        assert_eq!(resolved.media_url, "http://x/media.flac");
        assert_eq!(resolved.media_format, "flac");
        assert_eq!(resolved.lyric.as_deref(), Some("[00:01]la"));
        assert_eq!(resolved.translation, None, "whitespace-only is absent");
    }

    #[test]
    fn missing_format_defaults_to_mp3() {
        let fake = FakeTransport::new();
        script(
            &fake,
            one_hit(),
            json!({"code": 200, "data": {"url": "http://x/media"}}),
            json!({"code": 200, "data": {}}),
        );
        let resolved = Resolver::new(&fake, BASE)
            .resolve(&Record::new("A", "X"))
            .unwrap();
        assert_eq!(resolved.media_format, "mp3");
    }

    #[rstest]
    #[case("empty_data", json!({"code": 200, "data": []}))]
    #[case("error_code", json!({"code": 404, "data": [{"song": "X", "singer": "A", "id": 1}]}))]
    #[case("null_data", json!({"code": 200, "data": null}))]
    fn no_usable_hit_is_no_match(#[case] label: &str, #[case] search: Value) {
        let fake = FakeTransport::new();
        script(&fake, search, json!({}), json!({}));
        let err = Resolver::new(&fake, BASE)
            .resolve(&Record::new("A", "X"))
            .unwrap_err();
        assert!(matches!(err, SyncError::NoMatch { .. }), "[{label}] got: {err}");
    }

    #[rstest]
    #[case("no_url", json!({"code": 200, "data": {"format": "mp3"}}))]
    #[case("empty_url", json!({"code": 200, "data": {"url": "", "format": "mp3"}}))]
    #[case("error_code", json!({"code": 500, "data": {"url": "http://x"}}))]
    fn missing_media_url_is_details_unavailable(#[case] label: &str, #[case] details: Value) {
        let fake = FakeTransport::new();
        script(&fake, one_hit(), details, json!({}));
        let err = Resolver::new(&fake, BASE)
            .resolve(&Record::new("A", "X"))
            .unwrap_err();
        assert!(
            matches!(err, SyncError::DetailsUnavailable { ref id } if id == "1"),
            "[{label}] got: {err}"
        );
    }

    #[test]
    fn lyric_failure_does_not_fail_resolution() {
        let fake = FakeTransport::new();
        let r = Resolver::new(&fake, BASE);
        fake.reply_json(r.search_url("A X"), one_hit());
        fake.reply_json(
            r.details_url(&RemoteId::from("1")),
            json!({"code": 200, "data": {"url": "http://x/media.mp3", "format": "mp3"}}),
        );
        fake.reply_status(r.lyrics_url(&RemoteId::from("1")), 500);

        let resolved = r.resolve(&Record::new("A", "X")).expect("resolve");
        assert_eq!(resolved.lyric, None);
        assert_eq!(resolved.translation, None);
    }

    #[test]
    fn search_transport_failure_propagates() {
        let fake = FakeTransport::new();
        let r = Resolver::new(&fake, BASE);
        fake.reply_status(r.search_url("A X"), 503);
        let err = r.resolve(&Record::new("A", "X")).unwrap_err();
        assert!(matches!(err, SyncError::Http(_)));
    }

    #[test]
    fn search_hit_without_id_is_unexpected_shape() {
        let fake = FakeTransport::new();
        script(
            &fake,
            json!({"code": 200, "data": [{"song": "X", "singer": "A"}]}),
            json!({}),
            json!({}),
        );
        let err = Resolver::new(&fake, BASE)
            .resolve(&Record::new("A", "X"))
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnexpectedShape {
                endpoint: "search",
                ..
            }
        ));
    }

    #[rstest]
    #[case(Some("mp3"), "mp3")]
    #[case(Some(".M4A"), "m4a")]
    #[case(Some("../../etc"), "_.._etc")]
    #[case(Some(""), "mp3")]
    #[case(None, "mp3")]
    fn format_is_safe_as_extension(#[case] raw: Option<&str>, #[case] expected: &str) {
        assert_eq!(normalize_format(raw), expected);
    }
}
