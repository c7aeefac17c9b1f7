//! HTTP client for the track library API.
//!
//! All calls are blocking and are expected to run on the API worker thread,
//! never on the UI thread. Non-2xx responses are turned into a single
//! human-readable message: the JSON `message` field when the server sends
//! one, the status line otherwise.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use trackdeck_types::{
    BulkDeleteRequest, BulkDeleteResult, SortField, SortOrder, Track, TrackInput, TrackPage,
};
use ureq::http::StatusCode;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Uploads can take longer than metadata calls.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Static file prefix the server serves uploaded audio under.
const FILES_PREFIX: &str = "/api/files/";

const UPLOAD_BOUNDARY: &str = "----trackdeck-multipart-boundary";

/// Filter and pagination parameters for `GET /tracks`.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TrackQuery {
    pub(crate) search: Option<String>,
    pub(crate) genre: Option<String>,
    pub(crate) artist: Option<String>,
    pub(crate) sort: Option<(SortField, SortOrder)>,
    pub(crate) page: u32,
    pub(crate) limit: u32,
}

impl TrackQuery {
    /// Encode as a query string, omitting empty or absent filters. Sort field
    /// and order are emitted together or not at all.
    pub(crate) fn to_query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        if let Some(search) = self.search.as_deref()
            && !search.is_empty()
        {
            pairs.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(genre) = self.genre.as_deref()
            && !genre.is_empty()
        {
            pairs.push(format!("genre={}", urlencoding::encode(genre)));
        }
        if let Some(artist) = self.artist.as_deref()
            && !artist.is_empty()
        {
            pairs.push(format!("artist={}", urlencoding::encode(artist)));
        }
        if let Some((field, order)) = self.sort {
            pairs.push(format!("sort={}", field.as_query()));
            pairs.push(format!("order={}", order.as_query()));
        }
        pairs.push(format!("page={}", self.page));
        pairs.push(format!("limit={}", self.limit));
        pairs.join("&")
    }
}

fn api_base(server: &str) -> String {
    format!("{}/api", server.trim_end_matches('/'))
}

pub(crate) fn list_tracks(server: &str, query: &TrackQuery) -> Result<TrackPage> {
    let url = format!("{}/tracks?{}", api_base(server), query.to_query_string());
    let resp = ureq::get(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request /tracks")?;
    read_json(resp, "tracks")
}

pub(crate) fn get_track(server: &str, id: &str) -> Result<Track> {
    let url = format!("{}/tracks/{}", api_base(server), urlencoding::encode(id));
    let resp = ureq::get(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request /tracks/:id")?;
    read_json(resp, "tracks/:id")
}

pub(crate) fn create_track(server: &str, input: &TrackInput) -> Result<Track> {
    let url = format!("{}/tracks", api_base(server));
    let resp = ureq::post(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .send_json(input)
        .context("request POST /tracks")?;
    read_json(resp, "tracks")
}

pub(crate) fn update_track(server: &str, id: &str, input: &TrackInput) -> Result<Track> {
    let url = format!("{}/tracks/{}", api_base(server), urlencoding::encode(id));
    let resp = ureq::put(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .send_json(input)
        .context("request PUT /tracks/:id")?;
    read_json(resp, "tracks/:id")
}

pub(crate) fn delete_track(server: &str, id: &str) -> Result<()> {
    let url = format!("{}/tracks/{}", api_base(server), urlencoding::encode(id));
    let resp = ureq::delete(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request DELETE /tracks/:id")?;
    expect_success(resp, "tracks/:id")
}

pub(crate) fn bulk_delete_tracks(server: &str, ids: Vec<String>) -> Result<BulkDeleteResult> {
    let url = format!("{}/tracks/delete", api_base(server));
    let resp = ureq::post(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .send_json(BulkDeleteRequest { ids })
        .context("request /tracks/delete")?;
    read_json(resp, "tracks/delete")
}

pub(crate) fn genres(server: &str) -> Result<Vec<String>> {
    let url = format!("{}/genres", api_base(server));
    let resp = ureq::get(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request /genres")?;
    read_json(resp, "genres")
}

/// The API has no artists endpoint; artists are derived from a wide page-1
/// fetch, deduplicated and sorted.
pub(crate) fn artists(server: &str) -> Result<Vec<String>> {
    let query = TrackQuery {
        page: 1,
        limit: 999,
        ..TrackQuery::default()
    };
    let page = list_tracks(server, &query)?;
    let mut names: Vec<String> = page
        .data
        .into_iter()
        .map(|track| track.artist)
        .filter(|artist| !artist.is_empty())
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

pub(crate) fn upload_audio(
    server: &str,
    id: &str,
    file_name: &str,
    mime: &str,
    bytes: &[u8],
) -> Result<Track> {
    let url = format!(
        "{}/tracks/{}/upload",
        api_base(server),
        urlencoding::encode(id)
    );
    let body = multipart_file("file", file_name, mime, bytes, UPLOAD_BOUNDARY);
    let resp = ureq::post(&url)
        .config()
        .timeout_per_call(Some(UPLOAD_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={UPLOAD_BOUNDARY}"),
        )
        .send(&body[..])
        .context("request /tracks/:id/upload")?;
    read_json(resp, "tracks/:id/upload")
}

pub(crate) fn remove_audio(server: &str, id: &str) -> Result<Track> {
    let url = format!(
        "{}/tracks/{}/file",
        api_base(server),
        urlencoding::encode(id)
    );
    let resp = ureq::delete(&url)
        .config()
        .timeout_per_call(Some(CALL_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request DELETE /tracks/:id/file")?;
    read_json(resp, "tracks/:id/file")
}

/// URL for the stored audio file behind the static file prefix.
pub(crate) fn audio_url(server: &str, audio_file: &str) -> String {
    format!(
        "{}{}{}",
        server.trim_end_matches('/'),
        FILES_PREFIX,
        urlencoding::encode(audio_file)
    )
}

/// Fetch raw audio bytes for decoding. Runs on the engine thread.
pub(crate) fn fetch_audio(url: &str) -> Result<Vec<u8>> {
    let mut resp = ureq::get(url)
        .config()
        .timeout_per_call(Some(UPLOAD_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .call()
        .context("request audio file")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("audio file fetch failed with {status}");
    }
    resp.body_mut()
        .with_config()
        .limit(64 * 1024 * 1024)
        .read_to_vec()
        .context("read audio file body")
}

fn read_json<T: DeserializeOwned>(
    mut resp: ureq::http::Response<ureq::Body>,
    label: &str,
) -> Result<T> {
    let status = resp.status();
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read /{label} response body"))?;
    if !status.is_success() {
        anyhow::bail!("{}", error_message(status, &body));
    }
    serde_json::from_str(&body).with_context(|| format!("decode /{label} response"))
}

fn expect_success(mut resp: ureq::http::Response<ureq::Body>, label: &str) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read /{label} response body"))?;
    anyhow::bail!("{}", error_message(status, &body));
}

fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) if !err.message.is_empty() => err.message,
        _ => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string()),
    }
}

fn multipart_file(
    field: &str,
    file_name: &str,
    mime: &str,
    bytes: &[u8],
    boundary: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
