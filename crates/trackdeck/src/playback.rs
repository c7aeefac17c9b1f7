//! Playback controller: which single track, if any, is active, and whether
//! it is playing.
//!
//! This is a pure state holder with no reference to the audio engine; the
//! engine bridge in [`crate::player`] observes `(active, playing)` and drives
//! rodio to match.

use trackdeck_types::Track;

/// Observable playback phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlaybackPhase {
    Idle,
    Playing,
    Paused,
}

#[derive(Default)]
pub(crate) struct PlaybackController {
    active: Option<Track>,
    playing: bool,
}

impl PlaybackController {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn active(&self) -> Option<&Track> {
        self.active.as_ref()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing
    }

    pub(crate) fn phase(&self) -> PlaybackPhase {
        match (&self.active, self.playing) {
            (None, _) => PlaybackPhase::Idle,
            (Some(_), true) => PlaybackPhase::Playing,
            (Some(_), false) => PlaybackPhase::Paused,
        }
    }

    /// The desired engine state: `(track, playing)` while a track is active.
    pub(crate) fn desired(&self) -> Option<(&Track, bool)> {
        self.active.as_ref().map(|track| (track, self.playing))
    }

    /// Play `track`, or flip the playing flag when it is already active.
    /// Switching tracks always starts playing.
    pub(crate) fn toggle(&mut self, track: &Track) {
        match &self.active {
            Some(active) if active.id == track.id => {
                self.playing = !self.playing;
            }
            _ => {
                self.active = Some(track.clone());
                self.playing = true;
            }
        }
    }

    /// Close the player: active track and playing flag are cleared together.
    pub(crate) fn stop(&mut self) {
        self.active = None;
        self.playing = false;
    }

    /// Natural end of audio. Behaves like `toggle(current)` while playing:
    /// the track stays active, paused at the end.
    pub(crate) fn finished(&mut self) {
        if self.active.is_some() {
            self.playing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: "Artist".to_string(),
            ..Track::default()
        }
    }

    #[test]
    fn toggle_from_idle_starts_playing() {
        let mut ctl = PlaybackController::new();
        assert_eq!(ctl.phase(), PlaybackPhase::Idle);
        ctl.toggle(&track("a"));
        assert_eq!(ctl.phase(), PlaybackPhase::Playing);
        assert_eq!(ctl.active().unwrap().id, "a");
    }

    #[test]
    fn toggle_same_track_flips_pause_and_back() {
        let mut ctl = PlaybackController::new();
        let a = track("a");
        ctl.toggle(&a);
        ctl.toggle(&a);
        assert_eq!(ctl.phase(), PlaybackPhase::Paused);
        assert_eq!(ctl.active().unwrap().id, "a");
        ctl.toggle(&a);
        assert_eq!(ctl.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn toggle_other_track_switches_and_plays() {
        let mut ctl = PlaybackController::new();
        ctl.toggle(&track("a"));
        ctl.toggle(&track("a"));
        ctl.toggle(&track("b"));
        assert_eq!(ctl.phase(), PlaybackPhase::Playing);
        assert_eq!(ctl.active().unwrap().id, "b");
    }

    #[test]
    fn stop_clears_both_fields() {
        let mut ctl = PlaybackController::new();
        ctl.toggle(&track("a"));
        ctl.stop();
        assert_eq!(ctl.phase(), PlaybackPhase::Idle);
        assert!(ctl.active().is_none());
        assert!(!ctl.is_playing());
    }

    #[test]
    fn finished_pauses_but_keeps_track_active() {
        let mut ctl = PlaybackController::new();
        ctl.toggle(&track("a"));
        ctl.finished();
        assert_eq!(ctl.phase(), PlaybackPhase::Paused);
        assert_eq!(ctl.active().unwrap().id, "a");
    }

    #[test]
    fn finished_in_idle_is_a_no_op() {
        let mut ctl = PlaybackController::new();
        ctl.finished();
        assert_eq!(ctl.phase(), PlaybackPhase::Idle);
    }
}
