//! LRC codec: line-level `[mm:ss.xx]text` and enhanced `[mm:ss.xx]<mm:ss.xx>word ...`.
//!
//! Decoding never fails. Malformed tags are not tags, lines without a timestamp
//! tag are dropped (metadata lines are captured separately), and the result is
//! stably sorted by line time.

use crate::text::tokenize;
use crate::time::{format_timestamp, round3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Explicit word timings for enhanced encoding, keyed by `(line index, word index)`.
pub type WordTimes = HashMap<(usize, usize), f64>;

/// One lyric line as edited: text plus an optional line timestamp in seconds.
///
/// Lines are positional; two lines with the same text are distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    pub time: Option<f64>,
}

impl Line {
    #[must_use]
    pub fn new(text: impl Into<String>, time: Option<f64>) -> Self {
        Self {
            text: text.into(),
            time,
        }
    }
}

/// Word-level timing. `start..end` is the byte span of the word in its line's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub time: f64,
    pub start: usize,
    pub end: usize,
}

/// A decoded, timed lyric line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    pub line_time: f64,
    pub text: String,
    /// Empty for line-level decodes
    pub words: Vec<Word>,
}

/// Decoded LRC document, lines sorted ascending by `line_time`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LrcDocument {
    pub metadata: BTreeMap<String, String>,
    pub lines: Vec<TimedLine>,
}

impl LrcDocument {
    /// Decode line-level LRC. Word tags inside a line are stripped.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        decode(input, false)
    }

    /// Decode enhanced LRC, deriving a word list for every line.
    #[must_use]
    pub fn parse_enhanced(input: &str) -> Self {
        decode(input, true)
    }

    /// Line times as consumed by the cursor tracker
    #[must_use]
    pub fn line_times(&self) -> Vec<Option<f64>> {
        self.lines.iter().map(|l| Some(l.line_time)).collect()
    }

    /// Convert to editable lines, every one stamped
    #[must_use]
    pub fn to_lines(&self) -> Vec<Line> {
        self.lines
            .iter()
            .map(|l| Line::new(l.text.clone(), Some(l.line_time)))
            .collect()
    }

    /// Encode as line-level LRC
    #[must_use]
    pub fn to_lrc_string(&self) -> String {
        encode_lines(&self.to_lines())
    }

    /// Encode as enhanced LRC with every word's time tagged
    #[must_use]
    pub fn to_enhanced_string(&self) -> String {
        let mut word_times = WordTimes::new();
        for (i, line) in self.lines.iter().enumerate() {
            for (k, word) in line.words.iter().enumerate() {
                word_times.insert((i, k), word.time);
            }
        }
        encode_enhanced(&self.to_lines(), &word_times)
    }
}

impl TimedLine {
    /// Index of the word being sung at `position_secs`: the last word whose time is
    /// at or before the position.
    #[must_use]
    pub fn active_word(&self, position_secs: f64) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| w.time <= position_secs)
            .map(|(i, _)| i)
    }
}

/// Encode lines as `[MM:SS.ff] text`, one per line.
///
/// Lines without a time are omitted; a partially stamped list does not round-trip.
#[must_use]
pub fn encode_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .filter_map(|line| line.time.map(|t| format!("[{}] {}", format_timestamp(t), line.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Encode lines as enhanced LRC.
///
/// Each stamped line becomes `[MM:SS.ff]` followed directly by its text, with
/// `<MM:SS.ff>` inserted before every word that has an entry in `word_times`.
/// Whitespace between words is kept as written.
#[must_use]
pub fn encode_enhanced(lines: &[Line], word_times: &WordTimes) -> String {
    let mut out = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let Some(time) = line.time else {
            continue;
        };

        let mut encoded = format!("[{}]", format_timestamp(time));
        let mut cursor = 0;
        for (k, token) in tokenize(&line.text).iter().enumerate() {
            encoded.push_str(&line.text[cursor..token.start]);
            if let Some(word_time) = word_times.get(&(i, k)) {
                encoded.push('<');
                encoded.push_str(&format_timestamp(*word_time));
                encoded.push('>');
            }
            encoded.push_str(token.text);
            cursor = token.end;
        }
        encoded.push_str(&line.text[cursor..]);
        out.push(encoded);
    }

    out.join("\n")
}

/// A timestamp tag located in a raw line, `start..end` being its byte span.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tag {
    time: f64,
    start: usize,
    end: usize,
}

fn decode(input: &str, with_words: bool) -> LrcDocument {
    let mut metadata = BTreeMap::new();
    let mut lines = Vec::new();
    let mut dropped = 0usize;

    for raw in input.lines() {
        let tags = scan_line_tags(raw);

        if tags.is_empty() {
            if let Some((key, value)) = parse_metadata(raw) {
                metadata.entry(key).or_insert(value);
            } else if !raw.trim().is_empty() {
                dropped += 1;
            }
            continue;
        }

        for (i, tag) in tags.iter().enumerate() {
            let span_end = tags.get(i + 1).map_or(raw.len(), |next| next.start);
            let span = &raw[tag.end..span_end];
            lines.push(decode_segment(tag.time, span, with_words));
        }
    }

    if dropped > 0 {
        debug!(dropped, "Skipped lines without timestamp tags");
    }

    // Stable: lines sharing a timestamp keep their input order
    lines.sort_by(|a: &TimedLine, b: &TimedLine| a.line_time.total_cmp(&b.line_time));

    LrcDocument { metadata, lines }
}

fn decode_segment(line_time: f64, span: &str, with_words: bool) -> TimedLine {
    let text = strip_word_tags(span).trim().to_string();
    let words = if with_words {
        derive_words(line_time, span, &text)
    } else {
        Vec::new()
    };

    TimedLine {
        line_time,
        text,
        words,
    }
}

/// Build the word list of one line.
///
/// Only the first whitespace-separated token after each `<time>` tag carries that
/// time. The clean text's tokens are walked in order against those timed tokens by
/// exact text; matches take the explicit time, everything else falls back to the
/// line time.
fn derive_words(line_time: f64, span: &str, text: &str) -> Vec<Word> {
    let explicit = explicit_word_times(span);
    let mut next_explicit = 0;

    tokenize(text)
        .into_iter()
        .map(|token| {
            let time = match explicit.get(next_explicit) {
                Some((word, time)) if *word == token.text => {
                    next_explicit += 1;
                    *time
                }
                _ => line_time,
            };
            Word {
                text: token.text.to_string(),
                time,
                start: token.start,
                end: token.end,
            }
        })
        .collect()
}

fn explicit_word_times(span: &str) -> Vec<(&str, f64)> {
    let tags = scan_word_tags(span);
    let mut timed = Vec::with_capacity(tags.len());

    for (i, tag) in tags.iter().enumerate() {
        let until = tags.get(i + 1).map_or(span.len(), |next| next.start);
        if let Some(first) = tokenize(&span[tag.end..until]).first() {
            timed.push((first.text, round3(tag.time)));
        }
    }

    timed
}

/// Find every `[digits:digits(.digits)?]` tag in a raw line, left to right.
fn scan_line_tags(raw: &str) -> Vec<Tag> {
    let bytes = raw.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some((time, end)) = parse_line_tag(bytes, i) {
                tags.push(Tag {
                    time,
                    start: i,
                    end,
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }

    tags
}

/// Find every `<(digits:)?digits(.digits)?>` tag in a span.
fn scan_word_tags(span: &str) -> Vec<Tag> {
    let bytes = span.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some((time, end)) = parse_word_tag(bytes, i) {
                tags.push(Tag {
                    time,
                    start: i,
                    end,
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }

    tags
}

fn strip_word_tags(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut cursor = 0;
    for tag in scan_word_tags(span) {
        out.push_str(&span[cursor..tag.start]);
        cursor = tag.end;
    }
    out.push_str(&span[cursor..]);
    out
}

/// Length of the ASCII digit run starting at `at`.
fn digit_run(bytes: &[u8], at: usize) -> usize {
    bytes
        .get(at..)
        .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
}

/// Parse `digits(.digits)?` at `at`; returns the value and the index past it.
fn parse_seconds(bytes: &[u8], at: usize) -> Option<(f64, usize)> {
    let whole = digit_run(bytes, at);
    if whole == 0 {
        return None;
    }
    let mut end = at + whole;

    if bytes.get(end) == Some(&b'.') {
        let frac = digit_run(bytes, end + 1);
        if frac > 0 {
            end += 1 + frac;
        }
    }

    let value = std::str::from_utf8(&bytes[at..end]).ok()?.parse::<f64>().ok()?;
    value.is_finite().then_some((value, end))
}

fn parse_minutes(bytes: &[u8], at: usize) -> Option<(f64, usize)> {
    let len = digit_run(bytes, at);
    if len == 0 {
        return None;
    }
    let value = std::str::from_utf8(&bytes[at..at + len])
        .ok()?
        .parse::<f64>()
        .ok()?;
    value.is_finite().then_some((value, at + len))
}

/// `[` at `at`, then `mm:ss(.ff)?]`
fn parse_line_tag(bytes: &[u8], at: usize) -> Option<(f64, usize)> {
    let (minutes, after_minutes) = parse_minutes(bytes, at + 1)?;
    if bytes.get(after_minutes) != Some(&b':') {
        return None;
    }
    let (seconds, after_seconds) = parse_seconds(bytes, after_minutes + 1)?;
    if bytes.get(after_seconds) != Some(&b']') {
        return None;
    }
    Some((minutes * 60.0 + seconds, after_seconds + 1))
}

/// `<` at `at`, then `(mm:)?ss(.ff)?>`
fn parse_word_tag(bytes: &[u8], at: usize) -> Option<(f64, usize)> {
    let (first, after_first) = parse_minutes(bytes, at + 1)?;

    let (time, end) = if bytes.get(after_first) == Some(&b':') {
        let (seconds, after_seconds) = parse_seconds(bytes, after_first + 1)?;
        (first * 60.0 + seconds, after_seconds)
    } else {
        parse_seconds(bytes, at + 1)?
    };

    if bytes.get(end) != Some(&b'>') {
        return None;
    }
    Some((time, end + 1))
}

/// Parse a `[key:value]` metadata tag; the key is ASCII letters only.
fn parse_metadata(raw: &str) -> Option<(String, String)> {
    let bytes = raw.as_bytes();

    for (open, _) in raw.match_indices('[') {
        let key_len = bytes[open + 1..]
            .iter()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let colon = open + 1 + key_len;
        if key_len == 0 || bytes.get(colon) != Some(&b':') {
            continue;
        }
        // Value runs to the last `]` and holds at least one char
        let Some(close) = raw.rfind(']') else {
            continue;
        };
        if close <= colon + 1 {
            continue;
        }
        let key = raw[open + 1..colon].to_string();
        let value = raw[colon + 1..close].trim().to_string();
        return Some((key, value));
    }

    None
}
