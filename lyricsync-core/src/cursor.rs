//! Live cursor tracking: turns a noisy stream of playback samples into a stable
//! active-line index.
//!
//! The naive "last line at or before the position" answer flickers under polling
//! jitter and jumps after a pause. The tracker commits a new line only when:
//!
//! - moving forward: on a seek, on a multi-line catch-up inside the resume grace
//!   window, or once the position has reached the line and the minimum dwell since
//!   the last change has passed;
//! - moving backward: on a seek that is not a small reverse, or once the position
//!   has fallen well behind the current line's start.
//!
//! One tracker belongs to one loaded song. Dropping it is the only cleanup.

use crate::config::TrackerConfig;
use crate::playback::PlaybackSample;
use crate::time::secs_to_millis;
use std::time::{Duration, Instant};
use tracing::debug;

fn signed_ms(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy)]
struct CursorState {
    stable_index: Option<usize>,
    last_change_at: Option<Instant>,
    last_position_ms: Option<i64>,
    resume_grace_until: Option<Instant>,
    was_paused: bool,
    last_was_seek: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            stable_index: None,
            last_change_at: None,
            last_position_ms: None,
            resume_grace_until: None,
            // A fresh session starts from a stopped transport
            was_paused: true,
            last_was_seek: false,
        }
    }
}

/// Stateful position -> active line resolver for one song
#[derive(Debug, Clone)]
pub struct CursorTracker {
    /// `(line index, start in ms)` for every line that has a time
    anchors: Vec<(usize, i64)>,
    line_count: usize,
    config: TrackerConfig,
    state: CursorState,
}

impl CursorTracker {
    /// Create a tracker over line times in seconds. Lines without a time are never
    /// selected.
    #[must_use]
    pub fn new(line_times: &[Option<f64>], config: TrackerConfig) -> Self {
        let anchors = line_times
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.filter(|t| t.is_finite()).map(|t| (i, secs_to_millis(t))))
            .collect();

        Self {
            anchors,
            line_count: line_times.len(),
            config,
            state: CursorState::default(),
        }
    }

    /// Number of lines the tracker was built over, timed or not
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_count
    }

    /// The committed active line
    #[must_use]
    pub const fn stable_index(&self) -> Option<usize> {
        self.state.stable_index
    }

    /// Whether the most recent sample was classified as a seek
    #[must_use]
    pub const fn last_was_seek(&self) -> bool {
        self.state.last_was_seek
    }

    #[must_use]
    pub const fn auto_follow(&self) -> bool {
        self.config.auto_follow
    }

    /// Enable or disable following. While disabled every sample yields `None`.
    pub fn set_auto_follow(&mut self, enabled: bool) {
        self.config.auto_follow = enabled;
    }

    /// Forget all history, as if the song had just been loaded
    pub fn reset(&mut self) {
        self.state = CursorState::default();
    }

    /// Last timed line starting at or before `position_ms` whose next timed line
    /// starts after it.
    #[must_use]
    pub fn naive_index(&self, position_ms: i64) -> Option<usize> {
        self.anchors
            .iter()
            .enumerate()
            .rev()
            .find(|&(k, &(_, start))| {
                start <= position_ms
                    && self
                        .anchors
                        .get(k + 1)
                        .map_or(true, |&(_, next)| next > position_ms)
            })
            .map(|(_, &(index, _))| index)
    }

    fn line_start_ms(&self, index: usize) -> Option<i64> {
        self.anchors
            .iter()
            .find(|(i, _)| *i == index)
            .map(|&(_, start)| start)
    }

    /// Feed one sample and get the active line, `None` while paused, while not
    /// following, or before the first timed line.
    pub fn update(&mut self, sample: &PlaybackSample) -> Option<usize> {
        self.state.last_was_seek = false;
        if !sample.is_playing {
            self.state.was_paused = true;
            return None;
        }
        if !self.config.auto_follow {
            return None;
        }

        let position_ms = sample.position_ms();
        let delta_ms = self
            .state
            .last_position_ms
            .map_or(0, |last| position_ms - last);
        self.state.last_position_ms = Some(position_ms);

        if self.state.was_paused {
            self.state.was_paused = false;
            self.state.resume_grace_until = sample
                .at
                .checked_add(Duration::from_millis(self.config.resume_grace_ms));
            debug!(position_ms, "Playback resumed, opening grace window");
        }

        let in_grace = self
            .state
            .resume_grace_until
            .is_some_and(|deadline| sample.at < deadline);
        let is_seek = delta_ms.abs() > signed_ms(self.config.seek_threshold_ms) && !in_grace;
        if is_seek {
            debug!(position_ms, delta_ms, "Seek detected");
        }
        self.state.last_was_seek = is_seek;

        let target = self.naive_index(position_ms)?;

        let Some(stable) = self.state.stable_index else {
            self.commit(target, sample.at);
            return Some(target);
        };

        if target == stable {
            return Some(stable);
        }

        let accept = if target > stable {
            self.accept_forward(stable, target, position_ms, sample.at, is_seek, in_grace)
        } else {
            self.accept_backward(stable, position_ms, delta_ms, is_seek)
        };

        if accept {
            self.commit(target, sample.at);
            Some(target)
        } else {
            Some(stable)
        }
    }

    fn accept_forward(
        &self,
        stable: usize,
        target: usize,
        position_ms: i64,
        at: Instant,
        is_seek: bool,
        in_grace: bool,
    ) -> bool {
        if is_seek {
            return true;
        }
        // Audio already moved on during the pause, catch up in one step
        if in_grace && target - stable > 1 {
            return true;
        }

        let reached = self.line_start_ms(target).is_some_and(|start| {
            position_ms >= start - signed_ms(self.config.forward_margin_ms)
        });
        let dwelled = self.state.last_change_at.map_or(true, |changed| {
            at.saturating_duration_since(changed) >= Duration::from_millis(self.config.min_dwell_ms)
        });

        reached && dwelled
    }

    fn accept_backward(&self, stable: usize, position_ms: i64, delta_ms: i64, is_seek: bool) -> bool {
        let small_reverse =
            delta_ms < 0 && delta_ms.unsigned_abs() < self.config.jitter_reverse_ms;
        if is_seek && !small_reverse {
            return true;
        }

        self.line_start_ms(stable).is_some_and(|start| {
            position_ms < start - signed_ms(self.config.backward_margin_ms)
        })
    }

    fn commit(&mut self, index: usize, at: Instant) {
        debug!(from = ?self.state.stable_index, to = index, "Active line changed");
        self.state.stable_index = Some(index);
        self.state.last_change_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: [Option<f64>; 4] = [Some(0.0), Some(2.0), Some(4.0), Some(6.0)];

    struct Driver {
        tracker: CursorTracker,
        base: Instant,
    }

    impl Driver {
        fn new(lines: &[Option<f64>]) -> Self {
            Self {
                tracker: CursorTracker::new(lines, TrackerConfig::default()),
                base: Instant::now(),
            }
        }

        /// Sample at wall-clock `wall_ms` after start with position `position_ms`
        fn play(&mut self, wall_ms: u64, position_ms: u64) -> Option<usize> {
            self.sample(wall_ms, position_ms, true)
        }

        fn pause(&mut self, wall_ms: u64, position_ms: u64) -> Option<usize> {
            self.sample(wall_ms, position_ms, false)
        }

        fn sample(&mut self, wall_ms: u64, position_ms: u64, playing: bool) -> Option<usize> {
            let sample = PlaybackSample::at(
                playing,
                Duration::from_millis(position_ms),
                self.base + Duration::from_millis(wall_ms),
            );
            self.tracker.update(&sample)
        }
    }

    #[test]
    fn test_naive_index() {
        let tracker = CursorTracker::new(&LINES, TrackerConfig::default());
        assert_eq!(tracker.naive_index(-5), None);
        assert_eq!(tracker.naive_index(0), Some(0));
        assert_eq!(tracker.naive_index(1999), Some(0));
        assert_eq!(tracker.naive_index(2000), Some(1));
        assert_eq!(tracker.naive_index(60_000), Some(3));
    }

    #[test]
    fn test_naive_index_skips_untimed_lines() {
        let tracker = CursorTracker::new(&[Some(1.0), None, Some(3.0)], TrackerConfig::default());
        assert_eq!(tracker.naive_index(2000), Some(0));
        assert_eq!(tracker.naive_index(3000), Some(2));
        assert_eq!(tracker.naive_index(500), None);
    }

    #[test]
    fn test_near_boundary_jitter_hysteresis() {
        let mut d = Driver::new(&LINES);
        let out: Vec<_> = [0, 1900, 2050, 2080]
            .into_iter()
            .map(|ms| d.play(ms, ms))
            .collect();
        assert_eq!(out, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_resume_grace_snaps_multiple_lines() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(2050, 2050), Some(1));
        assert_eq!(d.pause(5800, 5800), None);
        // Resume lands in line 3: one jump, not 1 -> 2 -> 3
        assert_eq!(d.play(6100, 6050), Some(3));
        assert_eq!(d.tracker.stable_index(), Some(3));
    }

    #[test]
    fn test_paused_output_is_none_and_state_frozen() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 2100), Some(1));
        assert_eq!(d.pause(100, 4100), None);
        assert_eq!(d.tracker.stable_index(), Some(1));
    }

    #[test]
    fn test_min_dwell_holds_rapid_lines() {
        let lines = [Some(0.0), Some(2.0), Some(2.05), Some(4.0)];
        let mut d = Driver::new(&lines);
        assert_eq!(d.play(0, 0), Some(0));
        // Outside grace, a 2s jump is a seek: immediate
        assert_eq!(d.play(2000, 2000), Some(1));
        // Line 2 has started but only 60ms passed since the last change
        assert_eq!(d.play(2060, 2060), Some(1));
        assert_eq!(d.play(2130, 2130), Some(2));
    }

    #[test]
    fn test_forward_waits_for_line_start() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        for ms in (200..2000).step_by(200) {
            assert_eq!(d.play(ms, ms), Some(0), "at {ms}");
        }
        assert_eq!(d.play(2000, 2000), Some(1));
    }

    #[test]
    fn test_small_reverse_jitter_ignored() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(2050, 2050), Some(1));
        // Position sample dips back under the line start
        assert_eq!(d.play(2150, 1900), Some(1));
        assert_eq!(d.play(2250, 2150), Some(1));
    }

    #[test]
    fn test_seek_back_moves_immediately() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(4500, 4500), Some(2));
        assert_eq!(d.play(4600, 300), Some(0));
    }

    #[test]
    fn test_gradual_backward_drift_needs_margin() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(4100, 4100), Some(2));
        let mut wall = 4100;
        let mut out = Vec::new();
        for pos in [3800, 3500, 3200, 2900] {
            wall += 100;
            out.push(d.play(wall, pos));
        }
        // Only once 1000ms behind line 2's start (4000ms) does it step back
        assert_eq!(out, vec![Some(2), Some(2), Some(2), Some(1)]);
    }

    #[test]
    fn test_large_jump_inside_grace_is_not_seek() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(2050, 2050), Some(1));
        assert_eq!(d.pause(3000, 2100), None);
        // Resume, then a backward jump of 1.5s within the grace window
        assert_eq!(d.play(3100, 2200), Some(1));
        assert_eq!(d.play(3200, 700), Some(1));
    }

    #[test]
    fn test_last_was_seek_tracks_latest_sample() {
        let mut d = Driver::new(&LINES);
        d.play(0, 0);
        assert!(!d.tracker.last_was_seek());
        d.play(2050, 2050);
        assert!(d.tracker.last_was_seek());
        d.play(2150, 2150);
        assert!(!d.tracker.last_was_seek());
        d.pause(5800, 5800);
        assert!(!d.tracker.last_was_seek());
        // Resume catch-up inside grace moves the line without being a seek
        assert_eq!(d.play(6100, 6050), Some(3));
        assert!(!d.tracker.last_was_seek());
    }

    #[test]
    fn test_oversized_grace_does_not_overflow() {
        let config = TrackerConfig {
            resume_grace_ms: u64::MAX,
            ..TrackerConfig::default()
        };
        let mut tracker = CursorTracker::new(&LINES, config);
        let sample = PlaybackSample::at(true, Duration::from_millis(2500), Instant::now());
        assert_eq!(tracker.update(&sample), Some(1));
    }

    #[test]
    fn test_single_step_inside_grace_still_needs_dwell() {
        let lines = [Some(0.0), Some(2.0), Some(2.05), Some(6.0)];
        let mut d = Driver::new(&lines);
        assert_eq!(d.play(0, 0), Some(0));
        assert_eq!(d.play(2000, 2000), Some(1));
        assert_eq!(d.pause(2010, 2010), None);
        // Gap of one line in grace: regular rule, and dwell since 2000 is only 50ms
        assert_eq!(d.play(2050, 2060), Some(1));
        assert_eq!(d.play(2200, 2200), Some(2));
    }

    #[test]
    fn test_before_first_line_is_none() {
        let mut d = Driver::new(&[Some(5.0), Some(8.0)]);
        assert_eq!(d.play(0, 1000), None);
        assert_eq!(d.tracker.stable_index(), None);
        assert_eq!(d.play(4000, 5000), Some(0));
    }

    #[test]
    fn test_auto_follow_disabled() {
        let mut d = Driver::new(&LINES);
        d.tracker.set_auto_follow(false);
        assert!(!d.tracker.auto_follow());
        assert_eq!(d.play(0, 2500), None);
        d.tracker.set_auto_follow(true);
        assert_eq!(d.play(100, 2600), Some(1));
    }

    #[test]
    fn test_no_timed_lines() {
        let mut d = Driver::new(&[None, None]);
        assert_eq!(d.play(0, 1000), None);
        assert_eq!(d.tracker.line_count(), 2);
    }

    #[test]
    fn test_reset() {
        let mut d = Driver::new(&LINES);
        assert_eq!(d.play(0, 4500), Some(2));
        d.tracker.reset();
        assert_eq!(d.tracker.stable_index(), None);
        assert_eq!(d.play(10, 500), Some(0));
    }
}
