use crate::error::CommandError;
use serenity::all::ChannelId;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_VOLUME: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub title: String,
    pub duration: Option<Duration>,
    pub uploader: Option<String>,
}

/// A transition that could not be taken from the current state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("nothing is playing")]
    NotPlaying,
    #[error("nothing is paused")]
    NotPaused,
    #[error("no active audio source")]
    NoSource,
    #[error("volume {0} out of range")]
    VolumeOutOfRange(i64),
}

impl From<TransitionError> for CommandError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotPlaying => {
                CommandError::ResourceNotFound("Nothing is currently playing.".to_string())
            }
            TransitionError::NotPaused => {
                CommandError::ResourceNotFound("Nothing is currently paused.".to_string())
            }
            TransitionError::NoSource => CommandError::ResourceNotFound(
                "No audio is currently playing or volume control not available.".to_string(),
            ),
            TransitionError::VolumeOutOfRange(_) => {
                CommandError::BadArguments("Volume must be between 0 and 100.".to_string())
            }
        }
    }
}

/// The per-guild session state machine: playback transitions plus the
/// idle-watch generation counter. Deliberately knows nothing about the
/// driver so every transition rule is testable in isolation.
#[derive(Debug)]
pub struct SessionState {
    pub channel_id: ChannelId,
    pub playback: PlaybackState,
    pub volume: u8,
    pub now_playing: Option<TrackInfo>,
    watch_generation: u64,
    play_generation: u64,
}

impl SessionState {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            playback: PlaybackState::Idle,
            volume: DEFAULT_VOLUME,
            now_playing: None,
            watch_generation: 0,
            play_generation: 0,
        }
    }

    /// A new stream starts; valid from any state since the previous stream
    /// is stopped first. Returns this stream's generation so that end
    /// notifications from a superseded stream can be told apart.
    pub fn begin(&mut self, track: TrackInfo) -> u64 {
        self.playback = PlaybackState::Playing;
        self.now_playing = Some(track);
        self.play_generation += 1;
        self.play_generation
    }

    pub fn play_is_current(&self, generation: u64) -> bool {
        self.play_generation == generation
    }

    /// The stream ended, naturally or not.
    pub fn finish(&mut self) {
        self.playback = PlaybackState::Idle;
        self.now_playing = None;
    }

    pub fn stop(&mut self) -> Result<(), TransitionError> {
        match self.playback {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.finish();
                Ok(())
            }
            PlaybackState::Idle => Err(TransitionError::NotPlaying),
        }
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        match self.playback {
            PlaybackState::Playing => {
                self.playback = PlaybackState::Paused;
                Ok(())
            }
            _ => Err(TransitionError::NotPlaying),
        }
    }

    pub fn resume(&mut self) -> Result<(), TransitionError> {
        match self.playback {
            PlaybackState::Paused => {
                self.playback = PlaybackState::Playing;
                Ok(())
            }
            _ => Err(TransitionError::NotPaused),
        }
    }

    /// Out-of-range input is an error, never clamped; a volume change also
    /// requires an active source.
    pub fn set_volume(&mut self, volume: i64) -> Result<u8, TransitionError> {
        if !(0..=100).contains(&volume) {
            return Err(TransitionError::VolumeOutOfRange(volume));
        }
        if self.now_playing.is_none() {
            return Err(TransitionError::NoSource);
        }
        self.volume = volume as u8;
        Ok(self.volume)
    }

    /// Records an occupancy observation, invalidating any pending grace
    /// timer. Returns the generation to arm a new timer with when the
    /// channel has just been seen empty.
    pub fn observe_occupancy(&mut self, humans: usize) -> Option<u64> {
        self.watch_generation += 1;
        (humans == 0).then_some(self.watch_generation)
    }

    pub fn watch_is_current(&self, generation: u64) -> bool {
        self.watch_generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TrackInfo {
        TrackInfo {
            title: "test track".to_string(),
            duration: Some(Duration::from_secs(225)),
            uploader: None,
        }
    }

    fn state() -> SessionState {
        SessionState::new(ChannelId::new(1))
    }

    #[test]
    fn test_new_session_is_idle_at_full_volume() {
        let state = state();
        assert_eq!(state.playback, PlaybackState::Idle);
        assert_eq!(state.volume, DEFAULT_VOLUME);
        assert!(state.now_playing.is_none());
    }

    #[test]
    fn test_begin_moves_to_playing_from_any_state() {
        let mut state = state();
        state.begin(track());
        assert_eq!(state.playback, PlaybackState::Playing);

        state.pause().unwrap();
        state.begin(track());
        assert_eq!(state.playback, PlaybackState::Playing);
    }

    #[test]
    fn test_pause_only_from_playing() {
        let mut state = state();
        assert_eq!(state.pause(), Err(TransitionError::NotPlaying));

        state.begin(track());
        assert_eq!(state.pause(), Ok(()));
        assert_eq!(state.playback, PlaybackState::Paused);
        assert_eq!(state.pause(), Err(TransitionError::NotPlaying));
    }

    #[test]
    fn test_resume_only_from_paused() {
        let mut state = state();
        assert_eq!(state.resume(), Err(TransitionError::NotPaused));

        state.begin(track());
        assert_eq!(state.resume(), Err(TransitionError::NotPaused));

        state.pause().unwrap();
        assert_eq!(state.resume(), Ok(()));
        assert_eq!(state.playback, PlaybackState::Playing);
    }

    #[test]
    fn test_stop_clears_track_from_playing_or_paused() {
        let mut state = state();
        assert_eq!(state.stop(), Err(TransitionError::NotPlaying));

        state.begin(track());
        assert_eq!(state.stop(), Ok(()));
        assert_eq!(state.playback, PlaybackState::Idle);
        assert!(state.now_playing.is_none());

        state.begin(track());
        state.pause().unwrap();
        assert_eq!(state.stop(), Ok(()));
        assert_eq!(state.playback, PlaybackState::Idle);
    }

    #[test]
    fn test_volume_out_of_range_is_rejected_not_clamped() {
        let mut state = state();
        state.begin(track());
        assert_eq!(state.set_volume(150), Err(TransitionError::VolumeOutOfRange(150)));
        assert_eq!(state.set_volume(-1), Err(TransitionError::VolumeOutOfRange(-1)));
        assert_eq!(state.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn test_volume_requires_active_source() {
        let mut state = state();
        assert_eq!(state.set_volume(50), Err(TransitionError::NoSource));

        state.begin(track());
        assert_eq!(state.set_volume(50), Ok(50));
        assert_eq!(state.volume, 50);

        // Paused still counts as an active source.
        state.pause().unwrap();
        assert_eq!(state.set_volume(75), Ok(75));
    }

    #[test]
    fn test_superseded_stream_generation_is_stale() {
        let mut state = state();
        let first = state.begin(track());
        let second = state.begin(track());
        assert!(!state.play_is_current(first));
        assert!(state.play_is_current(second));
    }

    #[test]
    fn test_stop_keeps_the_stream_generation_current() {
        let mut state = state();
        let generation = state.begin(track());
        state.stop().unwrap();
        // A manual stop still ends with the driver reporting this stream.
        assert!(state.play_is_current(generation));
    }

    #[test]
    fn test_occupancy_zero_arms_a_timer_generation() {
        let mut state = state();
        assert_eq!(state.observe_occupancy(0), Some(1));
        assert!(state.watch_is_current(1));
    }

    #[test]
    fn test_occupancy_recovery_invalidates_pending_timer() {
        let mut state = state();
        let armed = state.observe_occupancy(0).unwrap();
        assert_eq!(state.observe_occupancy(2), None);
        assert!(!state.watch_is_current(armed));
    }

    #[test]
    fn test_repeated_empty_observations_supersede_older_timers() {
        let mut state = state();
        let first = state.observe_occupancy(0).unwrap();
        let second = state.observe_occupancy(0).unwrap();
        assert!(!state.watch_is_current(first));
        assert!(state.watch_is_current(second));
    }
}
