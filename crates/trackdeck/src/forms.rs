//! Form state for the create/edit and upload modals, plus client-side
//! validation.

use std::fs;
use std::path::PathBuf;

use trackdeck_types::{Track, TrackInput};
use tui_input::Input;

/// Upload size limit enforced before any network call.
pub(crate) const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FormMode {
    Create,
    Edit { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FormField {
    Title,
    Artist,
    Album,
    Genres,
    CoverImage,
}

impl FormField {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Artist => "Artist",
            FormField::Album => "Album",
            FormField::Genres => "Genres (comma-separated)",
            FormField::CoverImage => "Cover image URL",
        }
    }

    const ORDER: [FormField; 5] = [
        FormField::Title,
        FormField::Artist,
        FormField::Album,
        FormField::Genres,
        FormField::CoverImage,
    ];
}

/// State of the create/edit track form.
pub(crate) struct TrackFormState {
    pub(crate) mode: FormMode,
    pub(crate) title: Input,
    pub(crate) artist: Input,
    pub(crate) album: Input,
    pub(crate) genres: Input,
    pub(crate) cover_image: Input,
    pub(crate) focus: FormField,
    pub(crate) error: Option<String>,
    pub(crate) in_flight: bool,
}

impl TrackFormState {
    pub(crate) fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: Input::default(),
            artist: Input::default(),
            album: Input::default(),
            genres: Input::default(),
            cover_image: Input::default(),
            focus: FormField::Title,
            error: None,
            in_flight: false,
        }
    }

    pub(crate) fn edit(track: &Track) -> Self {
        Self {
            mode: FormMode::Edit {
                id: track.id.clone(),
            },
            title: Input::new(track.title.clone()),
            artist: Input::new(track.artist.clone()),
            album: Input::new(track.album.clone().unwrap_or_default()),
            genres: Input::new(track.genres.join(", ")),
            cover_image: Input::new(track.cover_image.clone().unwrap_or_default()),
            focus: FormField::Title,
            error: None,
            in_flight: false,
        }
    }

    pub(crate) fn focus_next(&mut self) {
        let idx = FormField::ORDER.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = FormField::ORDER[(idx + 1) % FormField::ORDER.len()];
    }

    pub(crate) fn focus_prev(&mut self) {
        let idx = FormField::ORDER.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = FormField::ORDER[(idx + FormField::ORDER.len() - 1) % FormField::ORDER.len()];
    }

    pub(crate) fn focused_input_mut(&mut self) -> &mut Input {
        match self.focus {
            FormField::Title => &mut self.title,
            FormField::Artist => &mut self.artist,
            FormField::Album => &mut self.album,
            FormField::Genres => &mut self.genres,
            FormField::CoverImage => &mut self.cover_image,
        }
    }

    pub(crate) fn field_value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => self.title.value(),
            FormField::Artist => self.artist.value(),
            FormField::Album => self.album.value(),
            FormField::Genres => self.genres.value(),
            FormField::CoverImage => self.cover_image.value(),
        }
    }

    /// Required-field validation plus genre parsing. Duplicate genres are
    /// dropped, first occurrence wins.
    pub(crate) fn validate(&self) -> Result<TrackInput, String> {
        let title = self.title.value().trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        let artist = self.artist.value().trim();
        if artist.is_empty() {
            return Err("Artist is required".to_string());
        }
        let album = non_empty(self.album.value());
        let cover_image = non_empty(self.cover_image.value());
        let mut genres: Vec<String> = Vec::new();
        for genre in self.genres.value().split(',') {
            let genre = genre.trim();
            if !genre.is_empty() && !genres.iter().any(|g| g == genre) {
                genres.push(genre.to_string());
            }
        }
        Ok(TrackInput {
            title: title.to_string(),
            artist: artist.to_string(),
            album,
            genres,
            cover_image,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A locally validated audio file ready to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AudioFileSelection {
    pub(crate) path: PathBuf,
    pub(crate) file_name: String,
    pub(crate) mime: &'static str,
}

/// Validate an upload candidate before any network call: the file must
/// exist, be MP3 or WAV, and stay under [`MAX_UPLOAD_BYTES`].
pub(crate) fn validate_audio_path(raw: &str) -> Result<AudioFileSelection, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Enter the path of an audio file".to_string());
    }
    let path = PathBuf::from(raw);
    let meta = fs::metadata(&path).map_err(|_| format!("File not found: {raw}"))?;
    if !meta.is_file() {
        return Err(format!("Not a file: {raw}"));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => return Err("Invalid file type: only MP3 or WAV files are accepted".to_string()),
    };
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err("File too large: the limit is 10 MB".to_string());
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(AudioFileSelection {
        path,
        file_name,
        mime,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UploadFlight {
    Idle,
    Uploading,
    Removing,
}

/// State of the upload/replace/remove audio modal.
pub(crate) struct UploadState {
    pub(crate) track: Track,
    pub(crate) path: Input,
    pub(crate) error: Option<String>,
    pub(crate) flight: UploadFlight,
}

impl UploadState {
    pub(crate) fn new(track: Track) -> Self {
        Self {
            track,
            path: Input::default(),
            error: None,
            flight: UploadFlight::Idle,
        }
    }

    /// While a transfer is in flight the modal refuses to close.
    pub(crate) fn busy(&self) -> bool {
        self.flight != UploadFlight::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn validate_requires_title_and_artist() {
        let mut form = TrackFormState::create();
        assert_eq!(form.validate().unwrap_err(), "Title is required");
        form.title = Input::new("Song".to_string());
        assert_eq!(form.validate().unwrap_err(), "Artist is required");
        form.artist = Input::new("Band".to_string());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn validate_parses_and_dedups_genres() {
        let mut form = TrackFormState::create();
        form.title = Input::new("Song".to_string());
        form.artist = Input::new("Band".to_string());
        form.genres = Input::new("rock, jazz , rock,,  ".to_string());
        let input = form.validate().unwrap();
        assert_eq!(input.genres, vec!["rock".to_string(), "jazz".to_string()]);
        assert_eq!(input.album, None);
        assert_eq!(input.cover_image, None);
    }

    #[test]
    fn edit_form_prefills_from_track() {
        let track = Track {
            id: "t1".to_string(),
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: Some("LP".to_string()),
            genres: vec!["rock".to_string(), "jazz".to_string()],
            ..Track::default()
        };
        let form = TrackFormState::edit(&track);
        assert_eq!(form.mode, FormMode::Edit { id: "t1".to_string() });
        assert_eq!(form.genres.value(), "rock, jazz");
    }

    #[test]
    fn upload_rejects_wrong_extension_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();
        let err = validate_audio_path(path.to_str().unwrap()).unwrap_err();
        assert!(err.contains("Invalid file type"), "{err}");
    }

    #[test]
    fn upload_rejects_missing_file() {
        let err = validate_audio_path("/no/such/file.mp3").unwrap_err();
        assert!(err.contains("File not found"), "{err}");
    }

    #[test]
    fn upload_accepts_small_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.MP3");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 128]).unwrap();
        let sel = validate_audio_path(path.to_str().unwrap()).unwrap();
        assert_eq!(sel.mime, "audio/mpeg");
        assert_eq!(sel.file_name, "song.MP3");
    }
}
