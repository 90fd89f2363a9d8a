use crate::time::DurationExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One observation of the player: position plus transport state, taken at `at`.
///
/// Samples arrive from a poll loop or an animation frame; the rate is up to the
/// embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSample {
    /// Whether music is currently playing
    pub is_playing: bool,
    /// Playback position within the track
    pub position: Duration,
    /// When the sample was taken (drives dwell and grace timing)
    pub at: Instant,
}

impl PlaybackSample {
    /// Create a sample taken now
    #[must_use]
    pub fn new(is_playing: bool, position: Duration) -> Self {
        Self::at(is_playing, position, Instant::now())
    }

    /// Create a sample taken at a given instant
    #[must_use]
    pub const fn at(is_playing: bool, position: Duration, at: Instant) -> Self {
        Self {
            is_playing,
            position,
            at,
        }
    }

    /// Position in milliseconds, signed for delta arithmetic
    #[must_use]
    pub fn position_ms(&self) -> i64 {
        self.position.as_millis_i64()
    }

    /// Position in fractional seconds, the unit of lyric timestamps
    #[must_use]
    pub fn position_secs(&self) -> f64 {
        self.position.as_secs_f64()
    }

    /// Project this sample forward to `now`, advancing the position by the elapsed
    /// time while playing. Used to feed animation frames between polls.
    #[must_use]
    pub fn extrapolate_to(&self, now: Instant) -> Self {
        if !self.is_playing {
            return Self { at: now, ..*self };
        }
        let elapsed = now.saturating_duration_since(self.at);
        Self {
            position: self.position + elapsed,
            at: now,
            ..*self
        }
    }
}

/// Serializable form of a sample for traces: wall clock and position in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub wall_ms: u64,
    pub position_ms: u64,
    pub is_playing: bool,
}

impl SampleRecord {
    /// Materialize the record against a base instant
    #[must_use]
    pub fn to_sample(&self, base: Instant) -> PlaybackSample {
        PlaybackSample::at(
            self.is_playing,
            Duration::from_millis(self.position_ms),
            base + Duration::from_millis(self.wall_ms),
        )
    }
}
