//! Audio engine and the bridge that keeps it matching the playback
//! controller.
//!
//! The engine owns rodio on a dedicated thread and is commanded over a
//! channel; it fetches audio bytes from the server's static file endpoint and
//! decodes them in memory. [`EngineLink`] is the presentation-side bridge: it
//! diffs the controller's desired `(active, playing)` state against what the
//! engine was last told and sends only the commands needed to converge.
//!
//! While a `Load` is outstanding the link suppresses conflicting
//! pause/resume commands and re-applies the desired state once the load
//! settles. Without the guard a pause can hit the engine mid-transition and
//! leave it stuck.

use std::io::Cursor;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use trackdeck_types::Track;

use crate::server_api;

#[derive(Clone, Debug)]
pub(crate) enum EngineCmd {
    /// Fetch, decode, and start playing a track's audio.
    Load { track_id: String, url: String },
    Play,
    Pause,
    Stop,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) enum EngineEvent {
    /// Audio decoded and playback started.
    Loaded {
        track_id: String,
        duration: Option<Duration>,
    },
    /// Periodic playback position while a track is loaded.
    Progress { elapsed: Duration },
    /// Natural end of the loaded audio.
    Finished { track_id: String },
    /// Fetch or decode failure for a track.
    Failed { track_id: String, message: String },
}

/// Engine thread entry point. Exits when the command channel closes.
pub(crate) fn engine_main(cmd_rx: Receiver<EngineCmd>, evt_tx: Sender<EngineEvent>) {
    let mut stream: Option<OutputStream> = None;
    let mut sink: Option<Sink> = None;
    let mut current: Option<String> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(EngineCmd::Load { track_id, url }) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                current = None;
                match load_and_play(&mut stream, &url) {
                    Ok((new_sink, duration)) => {
                        sink = Some(new_sink);
                        current = Some(track_id.clone());
                        let _ = evt_tx.send(EngineEvent::Loaded { track_id, duration });
                    }
                    Err(message) => {
                        tracing::warn!(%track_id, %message, "audio load failed");
                        let _ = evt_tx.send(EngineEvent::Failed { track_id, message });
                    }
                }
            }
            Ok(EngineCmd::Play) => {
                if let Some(s) = sink.as_ref() {
                    s.play();
                }
            }
            Ok(EngineCmd::Pause) => {
                if let Some(s) = sink.as_ref() {
                    s.pause();
                }
            }
            Ok(EngineCmd::Stop) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                current = None;
            }
            Ok(EngineCmd::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let Some(s) = sink.as_ref() else { continue };
                let Some(track_id) = current.clone() else {
                    continue;
                };
                if !s.is_paused() && s.empty() {
                    sink = None;
                    current = None;
                    let _ = evt_tx.send(EngineEvent::Finished { track_id });
                } else {
                    let _ = evt_tx.send(EngineEvent::Progress {
                        elapsed: s.get_pos(),
                    });
                }
            }
        }
    }

    if let Some(s) = sink.take() {
        s.stop();
    }
}

fn load_and_play(stream: &mut Option<OutputStream>, url: &str) -> Result<(Sink, Option<Duration>), String> {
    if stream.is_none() {
        let mut opened = OutputStreamBuilder::open_default_stream()
            .map_err(|e| format!("no audio output device: {e}"))?;
        // rodio logs to stderr when OutputStream is dropped; noisy for a TUI.
        opened.log_on_drop(false);
        *stream = Some(opened);
    }
    let stream = stream.as_ref().ok_or_else(|| "no audio output".to_string())?;

    let bytes = server_api::fetch_audio(url).map_err(|e| format!("{e:#}"))?;
    let source = Decoder::new(Cursor::new(bytes)).map_err(|e| format!("decode audio: {e}"))?;
    let duration = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.play();
    Ok((sink, duration))
}

/// Presentation-side bridge between the playback controller and the engine.
pub(crate) struct EngineLink {
    server: String,
    cmd_tx: Sender<EngineCmd>,
    /// Track the engine currently holds decoded audio for.
    loaded: Option<String>,
    /// Track a `Load` was sent for, not yet settled by `Loaded`/`Failed`.
    pending_load: Option<String>,
    /// Play/pause state last sent to the engine.
    engine_playing: bool,
    /// Track whose load failed; its controls stay inert until the active
    /// track changes or the player closes.
    failed: Option<String>,
}

impl EngineLink {
    pub(crate) fn new(server: String, cmd_tx: Sender<EngineCmd>) -> Self {
        Self {
            server,
            cmd_tx,
            loaded: None,
            pending_load: None,
            engine_playing: false,
            failed: None,
        }
    }

    pub(crate) fn is_degraded(&self, track_id: &str) -> bool {
        self.failed.as_deref() == Some(track_id)
    }

    /// Ask the engine thread to exit.
    pub(crate) fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCmd::Quit);
    }

    /// Converge the engine toward the desired `(track, playing)` state.
    /// Idempotent; safe to call every UI tick.
    pub(crate) fn sync(&mut self, desired: Option<(&Track, bool)>) {
        let Some((track, playing)) = desired else {
            if self.loaded.is_some() || self.pending_load.is_some() {
                let _ = self.cmd_tx.send(EngineCmd::Stop);
            }
            self.loaded = None;
            self.pending_load = None;
            self.engine_playing = false;
            self.failed = None;
            return;
        };

        if self.failed.as_deref() == Some(track.id.as_str()) {
            return;
        }
        if self.pending_load.as_deref() == Some(track.id.as_str()) {
            // Pending-play guard: the conflicting command is re-applied by
            // the next sync after the load settles.
            return;
        }
        if self.loaded.as_deref() == Some(track.id.as_str()) {
            if playing != self.engine_playing {
                let cmd = if playing {
                    EngineCmd::Play
                } else {
                    EngineCmd::Pause
                };
                if self.cmd_tx.send(cmd).is_ok() {
                    self.engine_playing = playing;
                }
            }
            return;
        }

        // Nothing loaded for this track. Only start a load when the desired
        // state is actually playing; a paused track with no decoded audio
        // (e.g. right after it finished) stays idle until resumed.
        if !playing {
            return;
        }
        self.failed = None;
        let Some(file) = track.audio_file.as_deref().filter(|f| !f.is_empty()) else {
            self.failed = Some(track.id.clone());
            return;
        };
        let url = server_api::audio_url(&self.server, file);
        self.pending_load = Some(track.id.clone());
        self.engine_playing = true;
        let _ = self.cmd_tx.send(EngineCmd::Load {
            track_id: track.id.clone(),
            url,
        });
    }

    /// Record an engine event. Callers follow up with [`EngineLink::sync`]
    /// so deferred intent (a pause suppressed by the guard) is re-applied.
    pub(crate) fn on_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Loaded { track_id, .. } => {
                if self.pending_load.as_deref() == Some(track_id.as_str()) {
                    self.pending_load = None;
                    self.loaded = Some(track_id.clone());
                    self.engine_playing = true;
                }
            }
            EngineEvent::Failed { track_id, .. } => {
                if self.pending_load.as_deref() == Some(track_id.as_str()) {
                    self.pending_load = None;
                }
                // The engine drops any previous sink before attempting a
                // load, so after a failure it holds nothing at all.
                self.loaded = None;
                self.failed = Some(track_id.clone());
                self.engine_playing = false;
            }
            EngineEvent::Finished { track_id } => {
                if self.loaded.as_deref() == Some(track_id.as_str()) {
                    self.loaded = None;
                    self.engine_playing = false;
                }
            }
            EngineEvent::Progress { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn track_with_audio(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            audio_file: Some(format!("{id}.mp3")),
            ..Track::default()
        }
    }

    fn link() -> (EngineLink, Receiver<EngineCmd>) {
        let (cmd_tx, cmd_rx) = unbounded();
        (EngineLink::new("http://localhost:8000".to_string(), cmd_tx), cmd_rx)
    }

    fn drain(rx: &Receiver<EngineCmd>) -> Vec<EngineCmd> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    #[test]
    fn desired_play_issues_a_load_with_encoded_url() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        link.sync(Some((&a, true)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            EngineCmd::Load { track_id, url } => {
                assert_eq!(track_id, "a");
                assert_eq!(url, "http://localhost:8000/api/files/a.mp3");
            }
            other => panic!("expected Load, got {other:?}"),
        }
    }

    #[test]
    fn pause_during_pending_load_is_deferred_until_loaded() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        link.sync(Some((&a, true)));
        drain(&rx);

        // User pauses before the engine reports Loaded: suppressed.
        link.sync(Some((&a, false)));
        assert!(drain(&rx).is_empty());

        // Load settles; the following sync re-applies the pause.
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        link.sync(Some((&a, false)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], EngineCmd::Pause));
    }

    #[test]
    fn sync_is_idempotent_once_converged() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        link.sync(Some((&a, true)));
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        drain(&rx);
        link.sync(Some((&a, true)));
        link.sync(Some((&a, true)));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn switching_tracks_loads_the_new_one() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        let b = track_with_audio("b");
        link.sync(Some((&a, true)));
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        drain(&rx);

        link.sync(Some((&b, true)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], EngineCmd::Load { track_id, .. } if track_id == "b"));
    }

    #[test]
    fn closing_the_player_stops_the_engine() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        link.sync(Some((&a, true)));
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        drain(&rx);

        link.sync(None);
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], EngineCmd::Stop));
    }

    #[test]
    fn finished_track_is_not_reloaded_while_paused() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        link.sync(Some((&a, true)));
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        drain(&rx);

        link.on_event(&EngineEvent::Finished {
            track_id: "a".to_string(),
        });
        // Controller maps finish to Paused; no load until the user resumes.
        link.sync(Some((&a, false)));
        assert!(drain(&rx).is_empty());

        link.sync(Some((&a, true)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], EngineCmd::Load { track_id, .. } if track_id == "a"));
    }

    #[test]
    fn failed_track_controls_stay_inert_until_track_changes() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        let b = track_with_audio("b");
        link.sync(Some((&a, true)));
        drain(&rx);
        link.on_event(&EngineEvent::Failed {
            track_id: "a".to_string(),
            message: "decode audio: bad header".to_string(),
        });

        assert!(link.is_degraded("a"));
        link.sync(Some((&a, true)));
        assert!(drain(&rx).is_empty());

        link.sync(Some((&b, true)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], EngineCmd::Load { track_id, .. } if track_id == "b"));
    }

    #[test]
    fn resume_after_a_failed_switch_reloads_the_old_track() {
        let (mut link, rx) = link();
        let a = track_with_audio("a");
        let b = track_with_audio("b");
        link.sync(Some((&a, true)));
        link.on_event(&EngineEvent::Loaded {
            track_id: "a".to_string(),
            duration: None,
        });
        drain(&rx);

        // Switching to b evicts a's sink even though the load then fails.
        link.sync(Some((&b, true)));
        drain(&rx);
        link.on_event(&EngineEvent::Failed {
            track_id: "b".to_string(),
            message: "decode audio: bad header".to_string(),
        });

        // Going back to a must load afresh, not replay Play into an
        // engine that holds nothing.
        link.sync(Some((&a, true)));
        let cmds = drain(&rx);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], EngineCmd::Load { track_id, .. } if track_id == "a"));
    }

    #[test]
    fn track_without_audio_degrades_instead_of_loading() {
        let (mut link, rx) = link();
        let bare = Track {
            id: "x".to_string(),
            title: "No audio".to_string(),
            artist: "Artist".to_string(),
            ..Track::default()
        };
        link.sync(Some((&bare, true)));
        assert!(drain(&rx).is_empty());
        assert!(link.is_degraded("x"));
    }
}
