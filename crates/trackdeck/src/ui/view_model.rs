//! UI view-models for the TUI.
//!
//! This module converts `App` state into render-ready strings, labels,
//! and modal payloads so `render.rs` stays layout-focused.

use std::time::Duration;

use crate::forms::{FormField, FormMode, UploadFlight};
use crate::playback::PlaybackPhase;
use crate::query::{QueryStatus, PAGE_SIZE};
use crate::ui::app::{App, Modal};

pub(crate) struct UiView {
    pub(crate) header_lines: Vec<String>,
    pub(crate) summary_line: String,
    pub(crate) list_title: String,
    pub(crate) list_error: Option<String>,
    pub(crate) track_labels: Vec<String>,
    pub(crate) player: Option<PlayerPanel>,
    pub(crate) status_line: String,
    pub(crate) keys_line: String,
    pub(crate) active_modal: Option<UiModal>,
}

pub(crate) struct PlayerPanel {
    pub(crate) title: String,
    pub(crate) line: String,
    pub(crate) gauge: Option<(f64, String)>,
    pub(crate) error: Option<String>,
}

pub(crate) enum UiModal {
    Form { title: String, lines: Vec<String>, error: Option<String>, busy: bool, layout: ModalLayout },
    Confirm { title: String, body: String, layout: ModalLayout },
    Upload { title: String, body: String, error: Option<String>, busy: bool, layout: ModalLayout },
    Help { title: String, body: String, layout: ModalLayout },
    Logs { title: String, empty: bool, layout: ModalLayout },
}

pub(crate) struct ModalLayout {
    pub(crate) width_pct: u16,
    pub(crate) height_pct: u16,
}

impl UiView {
    pub(crate) fn from_app(app: &App) -> Self {
        let header_lines = vec![
            format!("trackdeck  →  {}", app.server),
            build_filter_line(app),
        ];
        let summary_line = build_summary_line(app);
        let list_title = build_list_title(app);
        let list_error = app
            .query
            .error()
            .map(|message| format!("Failed to load tracks: {message} (press r to retry)"));
        let track_labels = build_track_labels(app);
        let player = build_player_panel(app);
        let status_line = format!("status: {}", app.status);
        let keys_line = "keys: ↑/↓ select | ←/→ page | / search | g genre | a artist | s sort | Enter play/pause | p pause/resume | x stop | v select | c new | e edit | d delete | u upload | r refresh | l logs | h help | q quit".to_string();
        let active_modal = build_active_modal(app);

        Self {
            header_lines,
            summary_line,
            list_title,
            list_error,
            track_labels,
            player,
            status_line,
            keys_line,
            active_modal,
        }
    }
}

fn build_filter_line(app: &App) -> String {
    let search = if app.search_focused {
        format!("{}▏", app.search_input.value())
    } else if app.query.search().is_empty() {
        "-".to_string()
    } else {
        app.query.search().to_string()
    };
    let genre = app.query.genre().unwrap_or("-");
    let artist = app.query.artist().unwrap_or("-");
    let sort = match app.query.sort() {
        Some((field, order)) => format!("{} {}", field.as_query(), order.as_query()),
        None => "-".to_string(),
    };
    format!("search: {search} | genre: {genre} | artist: {artist} | sort: {sort}")
}

fn build_summary_line(app: &App) -> String {
    match app.query.status() {
        QueryStatus::Loading => "Loading tracks...".to_string(),
        QueryStatus::Refreshing => "Updating results...".to_string(),
        QueryStatus::Error => "No results".to_string(),
        QueryStatus::Ready => showing_line(app.query.page(), app.query.total()),
    }
}

fn showing_line(page: u32, total: u64) -> String {
    if total == 0 {
        return "No tracks found".to_string();
    }
    let page = page as u64;
    let size = PAGE_SIZE as u64;
    let first = ((page - 1) * size + 1).min(total);
    let last = (page * size).min(total);
    let noun = if total == 1 { "track" } else { "tracks" };
    format!("Showing {first}-{last} of {total} {noun}")
}

fn build_list_title(app: &App) -> String {
    let selected = app.selection.is_active().then(|| app.selection.count());
    list_title(app.query.page(), app.query.total_pages(), app.query.total(), selected)
}

fn list_title(page: u32, total_pages: u32, total: u64, selected: Option<usize>) -> String {
    let mut title = "Tracks".to_string();
    // The pager only shows up once there is more than one page.
    if total > PAGE_SIZE as u64 {
        title = format!("Tracks (page {page}/{total_pages})");
    }
    if let Some(count) = selected {
        title.push_str(&format!("  [selection: {count}]"));
    }
    title
}

fn build_track_labels(app: &App) -> Vec<String> {
    let tracks = app.query.tracks();
    let max_title_len = tracks.iter().map(|t| t.title.chars().count()).max().unwrap_or(0);
    let max_artist_len = tracks.iter().map(|t| t.artist.chars().count()).max().unwrap_or(0);

    tracks
        .iter()
        .map(|track| {
            let mut label = String::new();
            if app.selection.is_active() {
                label.push_str(if app.selection.contains(&track.id) {
                    "[x] "
                } else {
                    "[ ] "
                });
            }
            label.push_str(&format!(
                "{:<tw$}  {:<aw$}",
                track.title,
                track.artist,
                tw = max_title_len,
                aw = max_artist_len,
            ));
            if let Some(album) = track.album.as_deref().filter(|a| !a.is_empty()) {
                label.push_str(&format!("  {album}"));
            }
            if !track.genres.is_empty() {
                label.push_str(&format!("  [{}]", track.genres.join(", ")));
            }
            if !track.has_audio() {
                label.push_str("  [no audio]");
            } else if app.link.is_degraded(&track.id) {
                label.push_str("  [unplayable]");
            }
            if let Some(active) = app.playback.active()
                && active.id == track.id
            {
                label.push_str(if app.playback.is_playing() {
                    "  [playing]"
                } else {
                    "  [paused]"
                });
            }
            label
        })
        .collect()
}

fn build_player_panel(app: &App) -> Option<PlayerPanel> {
    let active = app.playback.active()?;
    let state = if app.player_error.is_some() {
        "error"
    } else {
        match app.playback.phase() {
            PlaybackPhase::Playing => "playing",
            _ => "paused",
        }
    };
    let line = format!("{} - {} [{state}]", active.title, active.artist);
    let gauge = match (app.elapsed, app.duration) {
        (Some(elapsed), Some(total)) if total > Duration::ZERO => {
            let ratio = (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0);
            Some((
                ratio,
                format!(" {} / {}", format_duration(elapsed), format_duration(total)),
            ))
        }
        (Some(elapsed), _) => Some((0.0, format!(" {}", format_duration(elapsed)))),
        _ => None,
    };
    Some(PlayerPanel {
        title: "Player (x to close)".to_string(),
        line,
        gauge,
        error: app.player_error.clone(),
    })
}

fn build_active_modal(app: &App) -> Option<UiModal> {
    match app.modal.as_ref()? {
        Modal::TrackForm(form) => {
            let title = match &form.mode {
                FormMode::Create => "New Track (Tab next field, Enter save, Esc cancel)",
                FormMode::Edit { .. } => "Edit Track (Tab next field, Enter save, Esc cancel)",
            };
            let lines = [
                FormField::Title,
                FormField::Artist,
                FormField::Album,
                FormField::Genres,
                FormField::CoverImage,
            ]
            .iter()
            .map(|field| {
                let marker = if *field == form.focus { "> " } else { "  " };
                format!("{marker}{}: {}", field.label(), form.field_value(*field))
            })
            .collect();
            Some(UiModal::Form {
                title: title.to_string(),
                lines,
                error: form.error.clone(),
                busy: form.in_flight,
                layout: ModalLayout { width_pct: 60, height_pct: 50 },
            })
        }
        Modal::ConfirmDelete { track, in_flight } => {
            let body = if *in_flight {
                "Deleting...".to_string()
            } else {
                format!(
                    "Delete \"{}\" by {}?\n\nPress y to confirm, n to cancel",
                    track.title, track.artist
                )
            };
            Some(UiModal::Confirm {
                title: "Delete Track".to_string(),
                body,
                layout: ModalLayout { width_pct: 40, height_pct: 25 },
            })
        }
        Modal::ConfirmBulkDelete { ids, in_flight } => {
            let body = if *in_flight {
                "Deleting...".to_string()
            } else {
                format!(
                    "Delete {} selected tracks?\n\nPress y to confirm, n to cancel",
                    ids.len()
                )
            };
            Some(UiModal::Confirm {
                title: "Delete Selected Tracks".to_string(),
                body,
                layout: ModalLayout { width_pct: 40, height_pct: 25 },
            })
        }
        Modal::Upload(upload) => {
            let current = upload
                .track
                .audio_file
                .as_deref()
                .filter(|f| !f.is_empty())
                .unwrap_or("-");
            let body = match upload.flight {
                UploadFlight::Uploading => "Uploading...".to_string(),
                UploadFlight::Removing => "Removing...".to_string(),
                UploadFlight::Idle => format!(
                    "Track: {}\nCurrent audio: {current}\n\nPath: {}▏\n\nEnter upload (MP3/WAV, max 10 MB) | Del remove audio | Esc close",
                    upload.track.title,
                    upload.path.value(),
                ),
            };
            Some(UiModal::Upload {
                title: "Upload Audio".to_string(),
                body,
                error: upload.error.clone(),
                busy: upload.busy(),
                layout: ModalLayout { width_pct: 60, height_pct: 40 },
            })
        }
        Modal::Help => Some(UiModal::Help {
            title: "Help".to_string(),
            body: build_help_lines().join("\n"),
            layout: ModalLayout { width_pct: 70, height_pct: 70 },
        }),
        Modal::Logs => Some(UiModal::Logs {
            title: "Logs (Esc to close, ↑/↓ scroll)".to_string(),
            empty: app.logs.is_empty(),
            layout: ModalLayout { width_pct: 90, height_pct: 80 },
        }),
    }
}

fn build_help_lines() -> Vec<String> {
    vec![
        "Browse".to_string(),
        "  ↑/↓          select track".to_string(),
        "  ←/→          previous/next page".to_string(),
        "  /            search (Enter or Esc to leave)".to_string(),
        "  g / a / s    cycle genre / artist / sort".to_string(),
        "  r            refresh (retries after an error)".to_string(),
        "".to_string(),
        "Playback".to_string(),
        "  Enter        play/pause selected track".to_string(),
        "  p            pause/resume the playing track".to_string(),
        "  x            close the player".to_string(),
        "".to_string(),
        "Editing".to_string(),
        "  c            create track".to_string(),
        "  e            edit selected track".to_string(),
        "  d            delete (bulk in selection mode)".to_string(),
        "  u            upload/replace/remove audio".to_string(),
        "".to_string(),
        "Selection".to_string(),
        "  v            selection mode on/off".to_string(),
        "  Space        mark/unmark selected track".to_string(),
        "  A            mark/unmark whole page".to_string(),
        "".to_string(),
        "Other".to_string(),
        "  l            logs".to_string(),
        "  h or ?       help".to_string(),
        "  q            quit".to_string(),
        "  Esc          close modal / leave selection mode".to_string(),
    ]
}

pub(crate) fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}
