//! Gap filling for line and word timestamps.
//!
//! Known timestamps are anchors. Line gaps between anchors are filled linearly;
//! leading and trailing gaps are extrapolated from the nearest pair of anchors.
//! Every computed value is rounded to centiseconds, anchors are returned as given.

use crate::config::InterpolationConfig;
use crate::time::round2;

/// Smallest gap kept between a word and the end of its line.
const WORD_END_GUARD_SECS: f64 = 0.01;

fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

/// Fill missing line times with the default configuration.
#[must_use]
pub fn fill_line_times(times: &[Option<f64>]) -> Vec<f64> {
    fill_line_times_with(times, &InterpolationConfig::default())
}

/// Fill missing line times.
///
/// With no anchor at all the result is a ladder `gap, 2*gap, ...`. Extrapolated
/// values never go below zero.
#[must_use]
pub fn fill_line_times_with(times: &[Option<f64>], config: &InterpolationConfig) -> Vec<f64> {
    let anchors: Vec<(usize, f64)> = times
        .iter()
        .enumerate()
        .filter_map(|(i, t)| known(*t).map(|t| (i, t)))
        .collect();

    let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
        return (1..=times.len())
            .map(|i| round2(config.default_line_gap_secs * as_f64(i)))
            .collect();
    };

    let mut filled: Vec<f64> = times.iter().map(|t| known(*t).unwrap_or(f64::NAN)).collect();

    // Leading run
    let lead_delta = anchors
        .get(1)
        .map_or(config.default_line_gap_secs, |&second| per_line_delta(first, second))
        .max(config.min_extrapolation_secs);
    for (k, slot) in filled.iter_mut().enumerate().take(first.0) {
        let value = first.1 - lead_delta * as_f64(first.0 - k);
        *slot = round2(value.max(0.0));
    }

    // Interior runs
    for pair in anchors.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let span = as_f64(b.0 - a.0);
        for (k, slot) in filled.iter_mut().enumerate().take(b.0).skip(a.0 + 1) {
            let ratio = as_f64(k - a.0) / span;
            *slot = round2(a.1 + (b.1 - a.1) * ratio);
        }
    }

    // Trailing run
    let trail_delta = anchors
        .len()
        .checked_sub(2)
        .and_then(|i| anchors.get(i))
        .map_or(config.default_line_gap_secs, |&prev| per_line_delta(prev, last))
        .max(config.min_extrapolation_secs);
    for (k, slot) in filled.iter_mut().enumerate().skip(last.0 + 1) {
        *slot = round2(last.1 + trail_delta * as_f64(k - last.0));
    }

    filled
}

fn per_line_delta(a: (usize, f64), b: (usize, f64)) -> f64 {
    (b.1 - a.1) / as_f64(b.0 - a.0)
}

/// Fill missing word times within one line using the default configuration.
#[must_use]
pub fn fill_word_times(line_start: f64, line_end: Option<f64>, words: &[Option<f64>]) -> Vec<f64> {
    fill_word_times_with(line_start, line_end, words, &InterpolationConfig::default())
}

/// Fill missing word times within `[line_start, line_end)`.
///
/// `line_end` is the next line's start, or `None` for the last line. Known times
/// are kept (rounded), unknown ones are spread by word index across the line. All
/// values are clamped into the line. A final pass lifts interpolated values that
/// fall behind their predecessor; known values are never moved by that pass.
#[must_use]
pub fn fill_word_times_with(
    line_start: f64,
    line_end: Option<f64>,
    words: &[Option<f64>],
    config: &InterpolationConfig,
) -> Vec<f64> {
    let start = if line_start.is_finite() { line_start } else { 0.0 };
    let end = known(line_end).unwrap_or(start + config.last_line_secs);
    let upper = (end - WORD_END_GUARD_SECS).max(start);
    let count = as_f64(words.len());

    let mut filled: Vec<f64> = words
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let value = known(*t).unwrap_or_else(|| start + (end - start) * as_f64(i) / count);
            round2(value.max(start).min(upper))
        })
        .collect();

    for i in 1..filled.len() {
        if known(words[i]).is_none() && filled[i] < filled[i - 1] {
            filled[i] = filled[i - 1];
        }
    }

    filled
}
