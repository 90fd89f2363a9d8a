use std::time::{Duration, Instant};

use lyricsync_core::{
    fill_line_times, match_line_times, repair, CursorTracker, LrcDocument, LyricSession,
    PlaybackSample, SessionEvent, TrackerConfig,
};

const LINE_TIMES: [Option<f64>; 4] = [Some(0.0), Some(2.0), Some(4.0), Some(6.0)];

fn playing(base: Instant, ms: u64) -> PlaybackSample {
    PlaybackSample::at(true, Duration::from_millis(ms), base + Duration::from_millis(ms))
}

#[test]
fn decode_encode_is_stable() {
    let input = "[ar:Someone]\n[00:12.34] first\n[01:02.05][00:05.00] chorus\nnot a lyric\n[00:30.50]last";
    let doc = LrcDocument::parse(input);
    assert_eq!(doc.metadata.get("ar").map(String::as_str), Some("Someone"));

    let texts: Vec<_> = doc.lines.iter().map(|l| l.text.as_str()).collect();
    // The first of two adjacent tags owns the empty span between them
    assert_eq!(texts, ["chorus", "first", "last", ""]);

    let again = LrcDocument::parse(&doc.to_lrc_string());
    assert_eq!(again.lines.len(), doc.lines.len());
    for (a, b) in again.lines.iter().zip(&doc.lines) {
        assert_eq!(a.text, b.text);
        assert!((a.line_time - b.line_time).abs() <= 0.01);
    }
}

#[test]
fn untagged_words_fall_back_to_line_time() {
    let doc = LrcDocument::parse_enhanced("[00:10.00]hello world");
    let times: Vec<f64> = doc.lines[0].words.iter().map(|w| w.time).collect();
    assert_eq!(times, [10.0, 10.0]);
}

#[test]
fn matcher_keeps_order_across_gaps() {
    let source = LrcDocument::parse("[00:01.00]A\n[00:03.00]C");
    assert_eq!(
        match_line_times(&["A", "B", "C"], &source.lines),
        [Some(1.0), None, Some(3.0)]
    );
}

#[test]
fn single_anchor_extrapolates_two_seconds_per_line() {
    assert_eq!(fill_line_times(&[None, None, Some(5.0), None]), [1.0, 3.0, 5.0, 7.0]);
}

#[test]
fn cursor_resists_boundary_jitter() {
    let mut tracker = CursorTracker::new(&LINE_TIMES, TrackerConfig::default());
    let base = Instant::now();
    let out: Vec<_> = [0, 1900, 2050, 2080]
        .into_iter()
        .map(|ms| tracker.update(&playing(base, ms)))
        .collect();
    assert_eq!(out, [Some(0), Some(0), Some(1), Some(1)]);
}

#[test]
fn cursor_catches_up_after_resume() {
    let mut tracker = CursorTracker::new(&LINE_TIMES, TrackerConfig::default());
    let base = Instant::now();
    assert_eq!(tracker.update(&playing(base, 0)), Some(0));
    assert_eq!(tracker.update(&playing(base, 2050)), Some(1));

    let paused = PlaybackSample::at(
        false,
        Duration::from_millis(5800),
        base + Duration::from_millis(5800),
    );
    assert_eq!(tracker.update(&paused), None);

    let resumed = PlaybackSample::at(
        true,
        Duration::from_millis(6050),
        base + Duration::from_millis(6100),
    );
    assert_eq!(tracker.update(&resumed), Some(3));
}

#[test]
fn repair_keeps_timestamps_when_line_count_unchanged() {
    let preview = repair("hello\nworld!", "[00:01.00] hello\n[00:03.00] world", None).unwrap();
    assert_eq!(preview.repaired_synced, "[00:01.00] hello\n[00:03.00] world!");
}

#[tokio::test]
async fn session_follows_repaired_lyrics() {
    let preview = repair(
        "one\ntwo\nthree\nfour",
        "[00:00.00] one\n[00:06.00] four",
        Some(""),
    )
    .unwrap();
    let enhanced = preview.repaired_word_synced.unwrap_or_default();

    let session = LyricSession::new();
    session.load(LrcDocument::parse_enhanced(&enhanced)).await;
    let mut rx = session.subscribe();
    let base = Instant::now();

    assert_eq!(session.push_sample(playing(base, 0)).await, Some(0));
    assert_eq!(session.push_sample(playing(base, 2100)).await, Some(1));
    assert_eq!(
        rx.try_recv().ok(),
        Some(SessionEvent::ActiveLineChanged { index: Some(0) })
    );
}
