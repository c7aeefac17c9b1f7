use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    widgets::ListState,
    Terminal,
};
use trackdeck_types::{SortField, SortOrder, Track};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::forms::{self, FormMode, TrackFormState, UploadFlight, UploadState};
use crate::player::{self, EngineCmd, EngineEvent, EngineLink};
use crate::playback::PlaybackController;
use crate::query::{FilterPatch, QueryController, QueryReq};
use crate::selection::SelectionController;
use crate::worker::{self, ApiEvent, Job};

use super::render;

/// The modal currently covering the track list, if any.
pub(crate) enum Modal {
    TrackForm(TrackFormState),
    ConfirmDelete { track: Track, in_flight: bool },
    ConfirmBulkDelete { ids: Vec<String>, in_flight: bool },
    Upload(UploadState),
    Help,
    Logs,
}

/// Sort states cycled by the `s` key, unsorted first.
const SORT_CYCLE: [Option<(SortField, SortOrder)>; 9] = [
    None,
    Some((SortField::Title, SortOrder::Asc)),
    Some((SortField::Title, SortOrder::Desc)),
    Some((SortField::Artist, SortOrder::Asc)),
    Some((SortField::Artist, SortOrder::Desc)),
    Some((SortField::Album, SortOrder::Asc)),
    Some((SortField::Album, SortOrder::Desc)),
    Some((SortField::CreatedAt, SortOrder::Desc)),
    Some((SortField::CreatedAt, SortOrder::Asc)),
];

/// Launch the TUI, spawn the API worker and audio engine threads, and drive
/// the event loop.
pub(crate) fn run_tui(server: String, log_rx: Receiver<String>) -> Result<()> {
    let (job_tx, job_rx) = unbounded::<Job>();
    let (api_tx, api_rx) = unbounded::<ApiEvent>();
    let (engine_cmd_tx, engine_cmd_rx) = unbounded::<EngineCmd>();
    let (engine_evt_tx, engine_evt_rx) = unbounded::<EngineEvent>();

    std::thread::spawn({
        let server = server.clone();
        move || worker::worker_main(server, job_rx, api_tx)
    });
    std::thread::spawn(move || player::engine_main(engine_cmd_rx, engine_evt_tx));

    let mut app = App::new(server, job_tx, api_rx, engine_cmd_tx, engine_evt_rx, log_rx);

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);
    app.shutdown_engine();

    restore_terminal(&mut term)?;
    result
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App {
    pub(crate) server: String,
    pub(crate) query: QueryController,
    pub(crate) playback: PlaybackController,
    pub(crate) selection: SelectionController,
    pub(crate) link: EngineLink,
    pub(crate) list_state: ListState,

    pub(crate) genres: Vec<String>,
    pub(crate) artists: Vec<String>,

    pub(crate) search_input: Input,
    pub(crate) search_focused: bool,

    pub(crate) modal: Option<Modal>,
    pub(crate) status: String,

    pub(crate) elapsed: Option<Duration>,
    pub(crate) duration: Option<Duration>,
    pub(crate) player_error: Option<String>,

    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    last_status_snapshot: String,

    job_tx: Sender<Job>,
    query_req_rx: Receiver<QueryReq>,
    api_rx: Receiver<ApiEvent>,
    engine_rx: Receiver<EngineEvent>,
    log_rx: Receiver<String>,
    should_quit: bool,
}

impl App {
    fn new(
        server: String,
        job_tx: Sender<Job>,
        api_rx: Receiver<ApiEvent>,
        engine_cmd_tx: Sender<EngineCmd>,
        engine_rx: Receiver<EngineEvent>,
        log_rx: Receiver<String>,
    ) -> Self {
        let (req_tx, query_req_rx) = unbounded::<QueryReq>();
        let query = QueryController::new(req_tx);
        let link = EngineLink::new(server.clone(), engine_cmd_tx);

        let mut app = Self {
            server,
            query,
            playback: PlaybackController::new(),
            selection: SelectionController::new(),
            link,
            list_state: ListState::default(),
            genres: Vec::new(),
            artists: Vec::new(),
            search_input: Input::default(),
            search_focused: false,
            modal: None,
            status: "Loading tracks...".into(),
            elapsed: None,
            duration: None,
            player_error: None,
            logs: VecDeque::new(),
            logs_scroll: 0,
            last_status_snapshot: String::new(),
            job_tx,
            query_req_rx,
            api_rx,
            engine_rx,
            log_rx,
            should_quit: false,
        };
        app.send_job(Job::Genres);
        app.send_job(Job::Artists);
        app
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub(crate) fn selected_track(&self) -> Option<&Track> {
        self.list_state
            .selected()
            .and_then(|i| self.query.tracks().get(i))
    }

    fn send_job(&mut self, job: Job) {
        if self.job_tx.send(job).is_err() {
            self.status = "API worker is not available".into();
        }
    }

    fn shutdown_engine(&self) {
        self.link.shutdown();
    }

    /// Drain every channel and converge the audio engine. Runs once per UI
    /// tick, before drawing.
    pub(crate) fn pump(&mut self, now: Instant) {
        while let Ok(event) = self.api_rx.try_recv() {
            self.handle_api_event(event);
        }
        while let Ok(event) = self.engine_rx.try_recv() {
            self.handle_engine_event(event);
        }
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
        self.query.tick(now);
        while let Ok(req) = self.query_req_rx.try_recv() {
            self.send_job(Job::List(req));
        }
        self.link.sync(self.playback.desired());
        self.note_status_change();
    }

    pub(crate) fn handle_api_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Page(resp) => {
                if self.query.apply(resp) {
                    self.selection.retain_visible(self.query.tracks());
                    self.clamp_row();
                }
            }
            ApiEvent::Fetched(Ok(track)) => {
                self.query.merge_track(&track);
                if self.modal.is_none() {
                    self.modal = Some(Modal::TrackForm(TrackFormState::edit(&track)));
                    self.status = format!("Editing \"{}\"", track.title);
                }
            }
            ApiEvent::Fetched(Err(message)) => {
                self.status = format!("Failed to load track: {message}");
            }
            ApiEvent::Genres(Ok(genres)) => self.genres = genres,
            ApiEvent::Genres(Err(message)) => {
                tracing::warn!(%message, "failed to load genre list");
            }
            ApiEvent::Artists(Ok(artists)) => self.artists = artists,
            ApiEvent::Artists(Err(message)) => {
                tracing::warn!(%message, "failed to load artist list");
            }
            ApiEvent::Created(Ok(track)) => {
                self.modal = None;
                self.status = format!("Created \"{}\"", track.title);
                self.query.refetch();
            }
            ApiEvent::Created(Err(message)) => self.form_failed(message),
            ApiEvent::Updated(Ok(track)) => {
                self.query.merge_track(&track);
                self.modal = None;
                self.status = format!("Updated \"{}\"", track.title);
                self.query.refetch();
            }
            ApiEvent::Updated(Err(message)) => self.form_failed(message),
            ApiEvent::Deleted(result) => {
                self.modal = None;
                match result {
                    Ok(()) => {
                        self.status = "Track deleted".into();
                        self.query.refetch();
                    }
                    Err(message) => self.status = format!("Delete failed: {message}"),
                }
            }
            ApiEvent::BulkDeleted(result) => {
                self.modal = None;
                self.selection.clear();
                match result {
                    Ok(outcome) => {
                        self.status = format!(
                            "Bulk delete: {} deleted, {} failed",
                            outcome.success.len(),
                            outcome.failed.len()
                        );
                        self.query.refetch();
                    }
                    Err(message) => self.status = format!("Bulk delete failed: {message}"),
                }
            }
            ApiEvent::Uploaded(result) => self.transfer_settled(result, "Audio uploaded"),
            ApiEvent::AudioRemoved(result) => {
                if let Ok(track) = &result
                    && self.playback.active().is_some_and(|t| t.id == track.id)
                {
                    // The active track lost its audio; close the player.
                    self.stop_playback();
                }
                self.transfer_settled(result, "Audio file removed");
            }
        }
    }

    /// Outcome of an upload or remove transfer. Success clears the modal's
    /// inputs and refreshes; failure surfaces in the modal, which stays open.
    fn transfer_settled(&mut self, result: Result<Track, String>, ok_status: &str) {
        match result {
            Ok(track) => {
                self.query.merge_track(&track);
                if let Some(Modal::Upload(upload)) = &mut self.modal {
                    upload.track = track;
                    upload.flight = UploadFlight::Idle;
                    upload.error = None;
                    upload.path.reset();
                }
                self.status = ok_status.to_string();
                self.query.refetch();
            }
            Err(message) => {
                if let Some(Modal::Upload(upload)) = &mut self.modal {
                    upload.flight = UploadFlight::Idle;
                    upload.error = Some(message);
                } else {
                    self.status = format!("Transfer failed: {message}");
                }
            }
        }
    }

    fn form_failed(&mut self, message: String) {
        if let Some(Modal::TrackForm(form)) = &mut self.modal {
            form.in_flight = false;
            form.error = Some(message);
        } else {
            self.status = format!("Save failed: {message}");
        }
    }

    pub(crate) fn handle_engine_event(&mut self, event: EngineEvent) {
        self.link.on_event(&event);
        match event {
            EngineEvent::Loaded { duration, .. } => {
                self.duration = duration;
                self.elapsed = Some(Duration::ZERO);
                self.player_error = None;
            }
            EngineEvent::Progress { elapsed } => self.elapsed = Some(elapsed),
            EngineEvent::Finished { track_id } => {
                if self.playback.active().is_some_and(|t| t.id == track_id) {
                    self.playback.finished();
                    self.elapsed = self.duration;
                }
            }
            EngineEvent::Failed { track_id, message } => {
                if self.playback.active().is_some_and(|t| t.id == track_id) {
                    self.playback.finished();
                    self.player_error = Some(message);
                }
            }
        }
    }

    fn clamp_row(&mut self) {
        let len = self.query.tracks().len();
        if len == 0 {
            self.list_state.select(None);
        } else {
            let row = self.list_state.selected().unwrap_or(0).min(len - 1);
            self.list_state.select(Some(row));
        }
    }

    fn select_next(&mut self) {
        let len = self.query.tracks().len();
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some((i + 1).min(len - 1)));
    }

    fn select_prev(&mut self) {
        if self.query.tracks().is_empty() {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(i.saturating_sub(1)));
    }

    /// Move to another page. The selection set never survives a page change.
    fn set_page(&mut self, page: u32) {
        self.query.set_page(page);
        self.selection.clear();
        self.list_state.select(Some(0));
    }

    pub(crate) fn next_page(&mut self) {
        let page = self.query.page();
        if page < self.query.total_pages() {
            self.set_page(page + 1);
        }
    }

    pub(crate) fn prev_page(&mut self) {
        let page = self.query.page();
        if page > 1 {
            self.set_page(page - 1);
        }
    }

    fn cycle_genre(&mut self, now: Instant) {
        let next = next_option(self.query.genre(), &self.genres);
        self.query.update_filters(
            FilterPatch {
                genre: Some(next),
                ..FilterPatch::default()
            },
            now,
        );
    }

    fn cycle_artist(&mut self, now: Instant) {
        let next = next_option(self.query.artist(), &self.artists);
        self.query.update_filters(
            FilterPatch {
                artist: Some(next),
                ..FilterPatch::default()
            },
            now,
        );
    }

    fn cycle_sort(&mut self, now: Instant) {
        let idx = SORT_CYCLE
            .iter()
            .position(|s| *s == self.query.sort())
            .unwrap_or(0);
        let next = SORT_CYCLE[(idx + 1) % SORT_CYCLE.len()];
        self.query.update_filters(
            FilterPatch {
                sort: Some(next),
                ..FilterPatch::default()
            },
            now,
        );
    }

    fn toggle_playback_selected(&mut self) {
        let Some(track) = self.selected_track().cloned() else {
            return;
        };
        if !track.has_audio() {
            self.status = format!("\"{}\" has no audio file (press u to upload)", track.title);
            return;
        }
        let switching = self.playback.active().is_none_or(|t| t.id != track.id);
        if switching {
            self.elapsed = None;
            self.duration = None;
            self.player_error = None;
        }
        self.playback.toggle(&track);
    }

    /// Pause/resume the track in the player, wherever its row is. The
    /// active track may be off the current page entirely.
    fn toggle_playback_active(&mut self) {
        let Some(track) = self.playback.active().cloned() else {
            return;
        };
        self.playback.toggle(&track);
    }

    fn stop_playback(&mut self) {
        self.playback.stop();
        self.elapsed = None;
        self.duration = None;
        self.player_error = None;
    }

    fn mark_selected_row(&mut self) {
        let Some(id) = self.selected_track().map(|t| t.id.clone()) else {
            return;
        };
        self.selection.toggle(&id, self.query.tracks());
    }

    /// The row may be stale; fetch a fresh snapshot and open the form when
    /// it arrives.
    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_track().map(|t| t.id.clone()) else {
            return;
        };
        self.status = "Opening editor...".into();
        self.send_job(Job::Get { id });
    }

    fn open_delete_confirm(&mut self) {
        if self.selection.is_active() {
            let ids = self.selection.ids();
            if ids.is_empty() {
                self.status = "No tracks selected".into();
                return;
            }
            self.modal = Some(Modal::ConfirmBulkDelete {
                ids,
                in_flight: false,
            });
        } else if let Some(track) = self.selected_track().cloned() {
            self.modal = Some(Modal::ConfirmDelete {
                track,
                in_flight: false,
            });
        }
    }

    fn on_search_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.search_focused = false,
            _ => {
                let before = self.search_input.value().to_string();
                self.search_input.handle_event(&CEvent::Key(key));
                let after = self.search_input.value().to_string();
                if after != before {
                    self.query.update_filters(
                        FilterPatch {
                            search: Some(after),
                            ..FilterPatch::default()
                        },
                        now,
                    );
                }
            }
        }
    }

    fn on_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.modal.take() else {
            return;
        };
        let mut keep = true;
        match &mut modal {
            Modal::Help => match key.code {
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?') => keep = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Modal::Logs => match key.code {
                KeyCode::Esc | KeyCode::Char('l') => {
                    keep = false;
                    self.logs_scroll = 0;
                }
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            },
            Modal::TrackForm(form) => {
                if form.in_flight {
                    // A save is on the wire; ignore input until it settles.
                } else {
                    match key.code {
                        KeyCode::Esc => keep = false,
                        KeyCode::Tab | KeyCode::Down => form.focus_next(),
                        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
                        KeyCode::Enter => match form.validate() {
                            Ok(input) => {
                                form.in_flight = true;
                                form.error = None;
                                let job = match &form.mode {
                                    FormMode::Create => Job::Create(input),
                                    FormMode::Edit { id } => Job::Update {
                                        id: id.clone(),
                                        input,
                                    },
                                };
                                self.send_job(job);
                            }
                            Err(message) => form.error = Some(message),
                        },
                        _ => {
                            form.focused_input_mut().handle_event(&CEvent::Key(key));
                        }
                    }
                }
            }
            Modal::ConfirmDelete { track, in_flight } => {
                if !*in_flight {
                    match key.code {
                        KeyCode::Char('y') | KeyCode::Enter => {
                            *in_flight = true;
                            let id = track.id.clone();
                            self.send_job(Job::Delete { id });
                        }
                        KeyCode::Char('n') | KeyCode::Esc => keep = false,
                        _ => {}
                    }
                }
            }
            Modal::ConfirmBulkDelete { ids, in_flight } => {
                if !*in_flight {
                    match key.code {
                        KeyCode::Char('y') | KeyCode::Enter => {
                            *in_flight = true;
                            let ids = ids.clone();
                            self.send_job(Job::BulkDelete { ids });
                        }
                        KeyCode::Char('n') | KeyCode::Esc => keep = false,
                        _ => {}
                    }
                }
            }
            Modal::Upload(upload) => {
                if upload.busy() {
                    if key.code == KeyCode::Esc {
                        self.status = "Transfer in progress, wait for it to finish".into();
                    }
                } else {
                    match key.code {
                        KeyCode::Esc => keep = false,
                        KeyCode::Enter => match forms::validate_audio_path(upload.path.value()) {
                            Ok(selection) => {
                                upload.flight = UploadFlight::Uploading;
                                upload.error = None;
                                let id = upload.track.id.clone();
                                self.send_job(Job::Upload {
                                    id,
                                    path: selection.path,
                                    file_name: selection.file_name,
                                    mime: selection.mime,
                                });
                            }
                            Err(message) => {
                                upload.error = Some(message);
                                upload.path.reset();
                            }
                        },
                        KeyCode::Delete => {
                            if upload.track.has_audio() {
                                upload.flight = UploadFlight::Removing;
                                upload.error = None;
                                let id = upload.track.id.clone();
                                self.send_job(Job::RemoveAudio { id });
                            } else {
                                upload.error = Some("Track has no audio file".into());
                            }
                        }
                        _ => {
                            upload.path.handle_event(&CEvent::Key(key));
                        }
                    }
                }
            }
        }
        if keep {
            self.modal = Some(modal);
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent, now: Instant) {
        if self.modal.is_some() {
            self.on_modal_key(key);
            return;
        }
        if self.search_focused {
            self.on_search_key(key, now);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => self.search_focused = true,
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Left => self.prev_page(),
            KeyCode::Right => self.next_page(),
            KeyCode::Enter => self.toggle_playback_selected(),
            KeyCode::Char(' ') => {
                if self.selection.is_active() {
                    self.mark_selected_row();
                } else {
                    self.toggle_playback_selected();
                }
            }
            KeyCode::Char('p') => self.toggle_playback_active(),
            KeyCode::Char('x') => self.stop_playback(),
            KeyCode::Char('v') => self.selection.toggle_mode(),
            KeyCode::Char('A') => {
                if self.selection.is_active() {
                    self.selection.toggle_all(self.query.tracks());
                }
            }
            KeyCode::Char('c') => self.modal = Some(Modal::TrackForm(TrackFormState::create())),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') => self.open_delete_confirm(),
            KeyCode::Char('u') => {
                if let Some(track) = self.selected_track().cloned() {
                    self.modal = Some(Modal::Upload(UploadState::new(track)));
                }
            }
            KeyCode::Char('g') => self.cycle_genre(now),
            KeyCode::Char('a') => self.cycle_artist(now),
            KeyCode::Char('s') => self.cycle_sort(now),
            KeyCode::Char('r') => {
                self.query.refetch();
                self.status = "Refreshing...".into();
            }
            KeyCode::Char('l') => self.modal = Some(Modal::Logs),
            KeyCode::Char('h') | KeyCode::Char('?') => self.modal = Some(Modal::Help),
            KeyCode::Esc => {
                if self.selection.is_active() {
                    self.selection.toggle_mode();
                }
            }
            _ => {}
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn push_log_line(&mut self, line: String) {
        const LOG_CAP: usize = 500;
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn note_status_change(&mut self) {
        if self.last_status_snapshot == self.status {
            return;
        }
        let line = self.status.clone();
        self.last_status_snapshot = self.status.clone();
        self.push_log_line(line);
    }
}

fn next_option(current: Option<&str>, options: &[String]) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    match current {
        None => Some(options[0].clone()),
        Some(current) => match options.iter().position(|o| o == current) {
            Some(i) if i + 1 < options.len() => Some(options[i + 1].clone()),
            _ => None,
        },
    }
}

fn ui_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    loop {
        app.pump(Instant::now());
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let CEvent::Key(key) = event::read().context("read terminal event")? {
                app.on_key(key, Instant::now());
            }
        }

        if app.should_quit() {
            return Ok(());
        }
        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryResp, PAGE_SIZE};
    use crossterm::event::KeyModifiers;
    use trackdeck_types::{BulkDeleteResult, PageMeta, TrackPage};

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            audio_file: Some(format!("{id}.mp3")),
            ..Track::default()
        }
    }

    fn test_app() -> (App, Receiver<Job>) {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (_api_tx, api_rx) = unbounded::<ApiEvent>();
        let (engine_cmd_tx, _engine_cmd_rx) = unbounded::<EngineCmd>();
        let (_engine_evt_tx, engine_rx) = unbounded::<EngineEvent>();
        let (_log_tx, log_rx) = unbounded::<String>();
        let app = App::new(
            "http://localhost:8000".to_string(),
            job_tx,
            api_rx,
            engine_cmd_tx,
            engine_rx,
            log_rx,
        );
        (app, job_rx)
    }

    fn drain_jobs(job_rx: &Receiver<Job>) -> Vec<Job> {
        let mut out = Vec::new();
        while let Ok(job) = job_rx.try_recv() {
            out.push(job);
        }
        out
    }

    fn apply_page(app: &mut App, ids: &[&str], total: u64) {
        // Matches the most recent request for the forwarded query channel.
        let seq = {
            let mut seq = 0;
            while let Ok(req) = app.query_req_rx.try_recv() {
                seq = req.seq;
            }
            seq
        };
        app.handle_api_event(ApiEvent::Page(QueryResp {
            seq,
            result: Ok(TrackPage {
                data: ids.iter().map(|id| track(id)).collect(),
                meta: PageMeta {
                    page: 1,
                    limit: PAGE_SIZE,
                    total,
                    total_pages: (total.div_ceil(PAGE_SIZE as u64)) as u32,
                },
            }),
        }));
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn startup_requests_filter_lists_then_first_page() {
        let (mut app, job_rx) = test_app();
        let jobs = drain_jobs(&job_rx);
        assert!(matches!(jobs[0], Job::Genres));
        assert!(matches!(jobs[1], Job::Artists));

        app.pump(Instant::now());
        let jobs = drain_jobs(&job_rx);
        assert!(matches!(&jobs[0], Job::List(req) if req.query.page == 1));
    }

    #[test]
    fn page_change_clears_the_selection_set() {
        let (mut app, _job_rx) = test_app();
        apply_page(&mut app, &["a", "b"], 25);
        app.on_key(key(KeyCode::Char('v')), Instant::now());
        app.on_key(key(KeyCode::Char(' ')), Instant::now());
        assert_eq!(app.selection.count(), 1);

        app.on_key(key(KeyCode::Right), Instant::now());
        assert_eq!(app.query.page(), 2);
        assert_eq!(app.selection.count(), 0);
    }

    #[test]
    fn next_page_is_clamped_to_total_pages() {
        let (mut app, _job_rx) = test_app();
        apply_page(&mut app, &["a"], 5);
        app.next_page();
        assert_eq!(app.query.page(), 1);
        app.prev_page();
        assert_eq!(app.query.page(), 1);
    }

    #[test]
    fn bulk_delete_reports_partial_failure_and_refetches() {
        let (mut app, job_rx) = test_app();
        apply_page(&mut app, &["a", "b", "c"], 3);
        app.selection.toggle_mode();
        app.selection.toggle("a", app.query.tracks());
        app.modal = Some(Modal::ConfirmBulkDelete {
            ids: vec!["a".into(), "b".into(), "c".into()],
            in_flight: true,
        });
        drain_jobs(&job_rx);

        app.handle_api_event(ApiEvent::BulkDeleted(Ok(BulkDeleteResult {
            success: vec!["a".into(), "b".into()],
            failed: vec!["c".into()],
        })));
        assert_eq!(app.status, "Bulk delete: 2 deleted, 1 failed");
        assert_eq!(app.selection.count(), 0);
        assert!(app.modal.is_none());

        app.pump(Instant::now());
        let jobs = drain_jobs(&job_rx);
        assert!(matches!(&jobs[0], Job::List(_)));
    }

    #[test]
    fn edit_key_fetches_a_fresh_snapshot_then_opens_the_form() {
        let (mut app, job_rx) = test_app();
        apply_page(&mut app, &["a"], 1);
        drain_jobs(&job_rx);

        app.on_key(key(KeyCode::Char('e')), Instant::now());
        let jobs = drain_jobs(&job_rx);
        assert!(matches!(&jobs[0], Job::Get { id } if id == "a"));
        assert!(app.modal.is_none());

        let mut fresh = track("a");
        fresh.title = "Renamed Elsewhere".to_string();
        app.handle_api_event(ApiEvent::Fetched(Ok(fresh)));
        match &app.modal {
            Some(Modal::TrackForm(form)) => {
                assert_eq!(form.title.value(), "Renamed Elsewhere");
                assert_eq!(form.mode, FormMode::Edit { id: "a".to_string() });
            }
            _ => panic!("edit form should open"),
        }
        assert_eq!(app.query.tracks()[0].title, "Renamed Elsewhere");
    }

    #[test]
    fn save_failure_keeps_the_form_open_with_the_message() {
        let (mut app, _job_rx) = test_app();
        let mut form = TrackFormState::create();
        form.in_flight = true;
        app.modal = Some(Modal::TrackForm(form));

        app.handle_api_event(ApiEvent::Created(Err("Title already exists".into())));
        match &app.modal {
            Some(Modal::TrackForm(form)) => {
                assert!(!form.in_flight);
                assert_eq!(form.error.as_deref(), Some("Title already exists"));
            }
            _ => panic!("form should stay open"),
        }
    }

    #[test]
    fn invalid_upload_path_never_reaches_the_worker() {
        let (mut app, job_rx) = test_app();
        apply_page(&mut app, &["a"], 1);
        drain_jobs(&job_rx);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"not audio").unwrap();

        let mut upload = UploadState::new(track("a"));
        upload.path = Input::new(file.to_string_lossy().into_owned());
        app.modal = Some(Modal::Upload(upload));

        app.on_key(key(KeyCode::Enter), Instant::now());
        match &app.modal {
            Some(Modal::Upload(upload)) => {
                assert!(upload.error.as_deref().unwrap().contains("Invalid file type"));
                assert_eq!(upload.path.value(), "");
                assert_eq!(upload.flight, UploadFlight::Idle);
            }
            _ => panic!("upload modal should stay open"),
        }
        assert!(drain_jobs(&job_rx).is_empty());
    }

    #[test]
    fn upload_modal_refuses_to_close_while_busy() {
        let (mut app, _job_rx) = test_app();
        let mut upload = UploadState::new(track("a"));
        upload.flight = UploadFlight::Uploading;
        app.modal = Some(Modal::Upload(upload));

        app.on_key(key(KeyCode::Esc), Instant::now());
        assert!(matches!(app.modal, Some(Modal::Upload(_))));
    }

    #[test]
    fn finished_event_pauses_the_active_track() {
        let (mut app, _job_rx) = test_app();
        apply_page(&mut app, &["a"], 1);
        app.list_state.select(Some(0));
        app.on_key(key(KeyCode::Enter), Instant::now());
        assert!(app.playback.is_playing());

        app.handle_engine_event(EngineEvent::Finished {
            track_id: "a".to_string(),
        });
        assert!(!app.playback.is_playing());
        assert_eq!(app.playback.active().unwrap().id, "a");
    }

    #[test]
    fn pause_key_controls_the_player_from_any_page() {
        let (mut app, _job_rx) = test_app();
        apply_page(&mut app, &["a", "b"], 25);
        app.list_state.select(Some(0));
        app.on_key(key(KeyCode::Enter), Instant::now());
        assert!(app.playback.is_playing());

        // The active track's row is left behind by the page change, but
        // the player still pauses and resumes.
        app.on_key(key(KeyCode::Right), Instant::now());
        app.on_key(key(KeyCode::Char('p')), Instant::now());
        assert!(!app.playback.is_playing());
        assert_eq!(app.playback.active().unwrap().id, "a");

        app.on_key(key(KeyCode::Char('p')), Instant::now());
        assert!(app.playback.is_playing());
    }

    #[test]
    fn finished_event_for_a_stale_track_is_ignored() {
        let (mut app, _job_rx) = test_app();
        apply_page(&mut app, &["a", "b"], 2);
        app.list_state.select(Some(1));
        app.on_key(key(KeyCode::Enter), Instant::now());

        app.handle_engine_event(EngineEvent::Finished {
            track_id: "a".to_string(),
        });
        assert!(app.playback.is_playing());
        assert_eq!(app.playback.active().unwrap().id, "b");
    }

    #[test]
    fn track_without_audio_does_not_open_the_player() {
        let (mut app, _job_rx) = test_app();
        let bare = Track {
            id: "x".to_string(),
            title: "Bare".to_string(),
            artist: "Artist".to_string(),
            ..Track::default()
        };
        app.handle_api_event(ApiEvent::Page(QueryResp {
            seq: {
                let mut seq = 0;
                while let Ok(req) = app.query_req_rx.try_recv() {
                    seq = req.seq;
                }
                seq
            },
            result: Ok(TrackPage {
                data: vec![bare],
                meta: PageMeta {
                    page: 1,
                    limit: PAGE_SIZE,
                    total: 1,
                    total_pages: 1,
                },
            }),
        }));
        app.list_state.select(Some(0));
        app.on_key(key(KeyCode::Enter), Instant::now());
        assert!(app.playback.active().is_none());
        assert!(app.status.contains("no audio file"));
    }

    #[test]
    fn search_keystrokes_are_routed_to_the_debounced_filter() {
        let (mut app, _job_rx) = test_app();
        app.on_key(key(KeyCode::Char('/')), Instant::now());
        assert!(app.search_focused);
        app.on_key(key(KeyCode::Char('j')), Instant::now());
        app.on_key(key(KeyCode::Char('o')), Instant::now());
        assert_eq!(app.search_input.value(), "jo");
        assert_eq!(app.query.search(), "jo");
        app.on_key(key(KeyCode::Esc), Instant::now());
        assert!(!app.search_focused);
    }

    #[test]
    fn genre_cycle_walks_options_and_wraps_to_none() {
        let (mut app, _job_rx) = test_app();
        app.handle_api_event(ApiEvent::Genres(Ok(vec![
            "jazz".to_string(),
            "rock".to_string(),
        ])));
        let now = Instant::now();
        app.cycle_genre(now);
        assert_eq!(app.query.genre(), Some("jazz"));
        app.cycle_genre(now);
        assert_eq!(app.query.genre(), Some("rock"));
        app.cycle_genre(now);
        assert_eq!(app.query.genre(), None);
    }
}
