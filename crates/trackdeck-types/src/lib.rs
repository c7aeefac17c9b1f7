use serde::{Deserialize, Serialize};

/// A track metadata record managed by the remote library API.
///
/// The client treats a track as an immutable snapshot between fetches; the
/// only local mutation is the best-effort replace after a successful edit,
/// which the next refetch overwrites anyway.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Server-assigned identifier.
    pub id: String,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Album name, if any.
    #[serde(default)]
    pub album: Option<String>,
    /// Genre labels. Order is not meaningful for display; duplicates are not
    /// meaningful at all.
    #[serde(default)]
    pub genres: Vec<String>,
    /// URL-friendly identifier derived from the title by the server.
    #[serde(default)]
    pub slug: String,
    /// Cover image URL, if any.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Stored audio file name on the server, if an upload exists.
    #[serde(default)]
    pub audio_file: Option<String>,
    /// Creation timestamp (RFC 3339), opaque to the client.
    #[serde(default)]
    pub created_at: String,
    /// Last-update timestamp (RFC 3339), opaque to the client.
    #[serde(default)]
    pub updated_at: String,
}

impl Track {
    /// `true` when the track has an uploaded audio file to play.
    pub fn has_audio(&self) -> bool {
        self.audio_file.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// Pagination metadata echoed by the server on list responses.
///
/// `total` is the authoritative item count; `total_pages` is informational
/// and the client always re-derives it from `total` and its own page size.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// 1-based page number this response covers.
    pub page: u32,
    /// Page size the server applied.
    pub limit: u32,
    /// Total items matching the query across all pages.
    pub total: u64,
    /// Total pages as computed by the server.
    pub total_pages: u32,
}

/// One page of tracks plus its pagination metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackPage {
    /// Tracks on this page.
    pub data: Vec<Track>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Payload for creating a track or replacing its editable fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInput {
    /// Track title (required).
    pub title: String,
    /// Artist name (required).
    pub artist: String,
    /// Album name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Genre labels.
    pub genres: Vec<String>,
    /// Cover image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

/// Request body for `POST /tracks/delete`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    /// Track ids to delete.
    pub ids: Vec<String>,
}

/// Per-id outcome of a bulk delete.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkDeleteResult {
    /// Ids that were deleted.
    pub success: Vec<String>,
    /// Ids the server could not delete.
    pub failed: Vec<String>,
}

/// Sort fields accepted by the list endpoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    Artist,
    Album,
    CreatedAt,
}

impl SortField {
    /// Wire value for the `sort` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Artist => "artist",
            SortField::Album => "album",
            SortField::CreatedAt => "createdAt",
        }
    }
}

/// Sort direction accepted by the list endpoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Wire value for the `order` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_decodes_camel_case_wire_names() {
        let json = r#"{
            "id": "t1",
            "title": "Song",
            "artist": "Band",
            "album": "LP",
            "genres": ["rock"],
            "slug": "song",
            "coverImage": "http://x/cover.png",
            "audioFile": "t1.mp3",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.cover_image.as_deref(), Some("http://x/cover.png"));
        assert_eq!(track.audio_file.as_deref(), Some("t1.mp3"));
        assert!(track.has_audio());
    }

    #[test]
    fn track_tolerates_missing_optional_fields() {
        let json = r#"{"id": "t1", "title": "Song", "artist": "Band"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.album, None);
        assert!(track.genres.is_empty());
        assert!(!track.has_audio());
    }

    #[test]
    fn input_omits_absent_optionals() {
        let input = TrackInput {
            title: "Song".into(),
            artist: "Band".into(),
            album: None,
            genres: vec!["rock".into()],
            cover_image: None,
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("album"));
        assert!(!json.contains("coverImage"));
    }

    #[test]
    fn sort_wire_values() {
        assert_eq!(SortField::CreatedAt.as_query(), "createdAt");
        assert_eq!(SortOrder::Desc.as_query(), "desc");
    }
}
