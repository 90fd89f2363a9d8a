//! Time and duration conversion utilities.
//!
//! Lyric timestamps are carried as `f64` seconds. Rounding is round-half-up on the
//! scaled value with a small epsilon so that decimal inputs such as `1.005` round
//! the way they read rather than the way they are stored in binary.

use std::time::Duration;

const ROUNDING_EPSILON: f64 = 1e-9;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as i64, saturating at `i64::MAX`.
    ///
    /// Used for signed position deltas. In practice this never saturates because
    /// `i64::MAX` milliseconds is roughly 292 million years.
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Round `value` to `decimals` places, half-up.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5 + ROUNDING_EPSILON).floor() / factor
}

/// Round to centiseconds, the precision of line-level stamps.
#[must_use]
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round to milliseconds, the precision of word-level stamps.
#[must_use]
pub fn round3(value: f64) -> f64 {
    round_to(value, 3)
}

/// Format seconds as `MM:SS.ff`.
///
/// Minutes are zero-padded to at least two digits and grow past two digits from
/// 100 minutes on. Negative and non-finite inputs format as `00:00.00`.
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    let centis = if seconds.is_finite() && seconds > 0.0 {
        // Non-negative and finite, checked above
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let c = (seconds * 100.0 + 0.5 + ROUNDING_EPSILON).floor() as u64;
        c
    } else {
        0
    };

    let minutes = centis / 6000;
    let secs = (centis % 6000) / 100;
    let frac = centis % 100;
    format!("{minutes:02}:{secs:02}.{frac:02}")
}

/// Convert seconds to whole milliseconds, rounding half-up. Negative values clamp to 0.
#[must_use]
pub fn secs_to_millis(seconds: f64) -> i64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    // Lyric timestamps are far below i64::MAX milliseconds
    #[allow(clippy::cast_possible_truncation)]
    let ms = (seconds * 1000.0 + 0.5).floor() as i64;
    ms
}
