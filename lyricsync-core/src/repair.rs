//! Regenerate synced lyrics after a text correction.
//!
//! Given corrected text and the previously saved line-level and enhanced LRC
//! strings, [`repair`] keeps as many of the old timestamps as it can, fills the
//! rest by interpolation and re-encodes both formats. The result is validated
//! before it is returned; a rejected repair yields [`CoreError::RepairValidation`]
//! and no output at all.

use crate::config::InterpolationConfig;
use crate::error::{CoreError, Result};
use crate::interpolate::{fill_line_times_with, fill_word_times_with};
use crate::lrc::{encode_enhanced, encode_lines, Line, LrcDocument, Word, WordTimes};
use crate::matcher::{align_indices, match_line_times};
use crate::text::{extract_lines, normalize_word, tokenize, Token};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Word times within this many seconds count as unchanged
const WORD_TIME_TOLERANCE_SECS: f64 = 0.001;

/// Repaired strings plus a summary of what changed. Nothing is persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairPreview {
    pub repaired_synced: String,
    /// Present when a previous word-synced string was supplied
    pub repaired_word_synced: Option<String>,
    /// Whether line times were carried over 1:1 because the line count was unchanged
    pub positional: bool,
    pub diff: DiffSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub lines: Vec<LineDiff>,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub words: Vec<WordPreservation>,
}

/// Before/after text at one position. `None` on the side where the line does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    pub index: usize,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// How many words of a repaired line took their time from a matching old word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPreservation {
    pub line: usize,
    pub preserved: usize,
    pub total: usize,
}

/// Repair with the default interpolation parameters.
///
/// # Errors
///
/// Returns [`CoreError::EmptyLyrics`] if the corrected text has no lines, or
/// [`CoreError::RepairValidation`] if the regenerated output is not fully stamped
/// or does not decode back to the corrected lines.
pub fn repair(
    corrected: &str,
    old_synced: &str,
    old_word_synced: Option<&str>,
) -> Result<RepairPreview> {
    repair_with(
        corrected,
        old_synced,
        old_word_synced,
        &InterpolationConfig::default(),
    )
}

/// Repair synced and enhanced LRC against corrected text (plain or HTML).
///
/// # Errors
///
/// See [`repair`].
pub fn repair_with(
    corrected: &str,
    old_synced: &str,
    old_word_synced: Option<&str>,
    config: &InterpolationConfig,
) -> Result<RepairPreview> {
    let new_lines = extract_lines(corrected);
    if new_lines.is_empty() {
        return Err(CoreError::EmptyLyrics);
    }

    let old_doc = LrcDocument::parse(old_synced);
    let positional = old_doc.lines.len() == new_lines.len();
    info!(
        old_lines = old_doc.lines.len(),
        new_lines = new_lines.len(),
        positional,
        "Repairing synced lyrics"
    );

    let line_times = realign_line_times(&new_lines, &old_doc, positional, config);
    let lines: Vec<Line> = new_lines
        .iter()
        .zip(&line_times)
        .map(|(text, time)| Line::new(text.clone(), Some(*time)))
        .collect();

    let repaired_synced = encode_lines(&lines);
    let old_word_doc = old_word_synced.map(LrcDocument::parse_enhanced);
    let realigned = old_word_doc
        .as_ref()
        .map(|doc| realign_word_times(&lines, doc, config));
    let repaired_word_synced = realigned
        .as_ref()
        .map(|(word_times, _)| encode_enhanced(&lines, word_times));

    if let Err(err) = validate(
        &lines,
        &line_times,
        &repaired_synced,
        repaired_word_synced.as_deref(),
    ) {
        warn!(error = %err, "Repair rejected");
        return Err(err);
    }

    let preservation = realigned.map(|(_, words)| words).unwrap_or_default();
    let diff = summarize(&old_doc, &new_lines, preservation);
    info!(
        added = diff.added,
        removed = diff.removed,
        changed = diff.changed,
        "Repair complete"
    );

    Ok(RepairPreview {
        repaired_synced,
        repaired_word_synced,
        positional,
        diff,
    })
}

fn realign_line_times(
    new_lines: &[String],
    old_doc: &LrcDocument,
    positional: bool,
    config: &InterpolationConfig,
) -> Vec<f64> {
    let aligned = if positional {
        old_doc.line_times()
    } else {
        match_line_times(new_lines, &old_doc.lines)
    };

    if aligned.iter().all(Option::is_some) {
        aligned.into_iter().flatten().collect()
    } else {
        fill_line_times_with(&aligned, config)
    }
}

/// Old line each new line takes its words from
fn word_sources(lines: &[Line], old_word_doc: &LrcDocument) -> Vec<Option<usize>> {
    if old_word_doc.lines.len() == lines.len() {
        (0..lines.len()).map(Some).collect()
    } else {
        let old_texts: Vec<&str> = old_word_doc.lines.iter().map(|l| l.text.as_str()).collect();
        let new_texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        align_indices(&new_texts, &old_texts)
    }
}

/// Returns the explicit time of every word, keyed for the encoder, plus how many
/// words per line kept a matched old time through interpolation.
fn realign_word_times(
    lines: &[Line],
    old_word_doc: &LrcDocument,
    config: &InterpolationConfig,
) -> (WordTimes, Vec<WordPreservation>) {
    let sources = word_sources(lines, old_word_doc);
    let mut word_times = WordTimes::new();
    let mut preservation = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let start = line.time.unwrap_or_default();
        let end = lines.get(i + 1).and_then(|next| next.time);
        let tokens = tokenize(&line.text);
        let old_words = sources[i]
            .and_then(|j| old_word_doc.lines.get(j))
            .map_or(&[][..], |l| l.words.as_slice());

        let known = match_words(&tokens, old_words);
        let filled = fill_word_times_with(start, end, &known, config);

        let mut preserved = 0;
        for (k, (matched, time)) in known.iter().zip(filled).enumerate() {
            word_times.insert((i, k), time);
            // Clamping into the line can still move a matched time
            if matched.is_some_and(|old| (time - old).abs() <= WORD_TIME_TOLERANCE_SECS) {
                preserved += 1;
            }
        }
        preservation.push(WordPreservation {
            line: i,
            preserved,
            total: tokens.len(),
        });
    }

    (word_times, preservation)
}

/// Carry old word times over to new tokens.
///
/// A forward-only cursor walks the old words; each token takes the first exact
/// match at or after the cursor, else the first normalized match. Duplicate words
/// therefore resolve to the earliest candidate.
fn match_words(tokens: &[Token<'_>], old_words: &[Word]) -> Vec<Option<f64>> {
    let mut cursor = 0;

    tokens
        .iter()
        .map(|token| {
            let remaining = old_words.get(cursor..).unwrap_or_default();
            let normalized = normalize_word(token.text);
            let found = remaining
                .iter()
                .position(|w| w.text == token.text)
                .or_else(|| {
                    remaining
                        .iter()
                        .position(|w| normalize_word(&w.text) == normalized)
                })?;

            cursor += found + 1;
            Some(remaining[found].time)
        })
        .collect()
}

fn validate(
    lines: &[Line],
    line_times: &[f64],
    synced: &str,
    word_synced: Option<&str>,
) -> Result<()> {
    if let Some(i) = line_times.iter().position(|t| !t.is_finite()) {
        return Err(CoreError::repair_validation(format!(
            "line {} has no valid timestamp",
            i + 1
        )));
    }

    let decoded = LrcDocument::parse(synced);
    if decoded.lines.len() != lines.len() {
        return Err(CoreError::repair_validation(format!(
            "synced output decodes to {} lines, expected {}",
            decoded.lines.len(),
            lines.len()
        )));
    }

    let Some(word_synced) = word_synced else {
        return Ok(());
    };
    let enhanced = LrcDocument::parse_enhanced(word_synced);
    let expected_words: usize = lines.iter().map(|l| tokenize(&l.text).len()).sum();
    let decoded_words: usize = enhanced.lines.iter().map(|l| l.words.len()).sum();
    if enhanced.lines.len() != lines.len() || decoded_words != expected_words {
        return Err(CoreError::repair_validation(format!(
            "word-synced output decodes to {} lines and {decoded_words} words, expected {} and {expected_words}",
            enhanced.lines.len(),
            lines.len()
        )));
    }

    Ok(())
}

fn summarize(
    old_doc: &LrcDocument,
    new_lines: &[String],
    words: Vec<WordPreservation>,
) -> DiffSummary {
    let old_count = old_doc.lines.len();
    let new_count = new_lines.len();

    let lines: Vec<LineDiff> = (0..old_count.max(new_count))
        .map(|index| LineDiff {
            index,
            before: old_doc.lines.get(index).map(|l| l.text.clone()),
            after: new_lines.get(index).cloned(),
        })
        .collect();

    let changed = lines
        .iter()
        .filter(|d| d.before.is_some() && d.after.is_some() && d.before != d.after)
        .count();

    DiffSummary {
        lines,
        added: new_count.saturating_sub(old_count),
        removed: old_count.saturating_sub(new_count),
        changed,
        words,
    }
}
