//! Greedy chronological line matcher.
//!
//! Aligns plain target lines to time-sorted source lines with a single forward
//! cursor into the source. The cursor only advances on a match, so an unmatched
//! source line stays the candidate for the following target lines. Inserted or
//! deleted target lines are tolerated; reordered lines are not.

use crate::lrc::TimedLine;
use crate::text::normalize_line;

/// Whether two lines count as the same lyric.
///
/// Matches on exact text, on normalized text, or when either normalized text
/// contains the other. Empty normalized text is contained in everything, so an
/// instrumental line matches whichever target is tried against it.
#[must_use]
pub fn lines_match(target: &str, source: &str) -> bool {
    if target == source {
        return true;
    }

    let target = normalize_line(target);
    let source = normalize_line(source);
    if target == source {
        return true;
    }

    target.contains(&source) || source.contains(&target)
}

/// Align each target to a source index, `None` where no source line matched.
#[must_use]
pub fn align_indices<T, S>(targets: &[T], sources: &[S]) -> Vec<Option<usize>>
where
    T: AsRef<str>,
    S: AsRef<str>,
{
    let mut cursor = 0;

    targets
        .iter()
        .map(|target| {
            let source = sources.get(cursor)?;
            if lines_match(target.as_ref(), source.as_ref()) {
                cursor += 1;
                Some(cursor - 1)
            } else {
                None
            }
        })
        .collect()
}

/// Align target lines to decoded lines, copying the matched line times.
#[must_use]
pub fn match_line_times<T: AsRef<str>>(targets: &[T], source: &[TimedLine]) -> Vec<Option<f64>> {
    let texts: Vec<&str> = source.iter().map(|l| l.text.as_str()).collect();

    align_indices(targets, &texts)
        .into_iter()
        .map(|idx| idx.map(|i| source[i].line_time))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::LrcDocument;

    #[test]
    fn test_lines_match_rules() {
        assert!(lines_match("Hello", "Hello"));
        assert!(lines_match("Hello, world!", "hello world"));
        assert!(lines_match("hello world (yeah)", "Hello world"));
        assert!(lines_match("world", "hello world"));
        assert!(!lines_match("goodbye", "hello"));
    }

    #[test]
    fn test_empty_normalized_line_matches_anything() {
        assert!(lines_match("", ""));
        assert!(lines_match("...", "!"));
        assert!(lines_match("", "hello"));
        assert!(lines_match("hello", "--"));
    }

    #[test]
    fn test_instrumental_source_line_does_not_stall_cursor() {
        let source = LrcDocument::parse("[00:01.00]a\n[00:03.00]\n[00:05.00]b");
        let times = match_line_times(&["a", "b", "c", "d"], &source.lines);
        assert_eq!(times, vec![Some(1.0), Some(3.0), None, None]);
    }

    #[test]
    fn test_skipped_target_keeps_source_candidate() {
        let source = LrcDocument::parse("[00:01.00]A\n[00:03.00]C");
        let times = match_line_times(&["A", "B", "C"], &source.lines);
        assert_eq!(times, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_deleted_target_line_loses_the_rest() {
        // "B" was removed from the target; the cursor stays on "B" and nothing after
        // it can match
        let source = LrcDocument::parse("[00:01.00]A\n[00:02.00]B\n[00:03.00]C");
        let times = match_line_times(&["A", "C"], &source.lines);
        assert_eq!(times, vec![Some(1.0), None]);
    }

    #[test]
    fn test_typo_fix_still_matches() {
        let source = LrcDocument::parse("[00:01.00]I cant stop\n[00:02.00]Never");
        let times = match_line_times(&["I can't stop!", "never"], &source.lines);
        assert_eq!(times, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_reordered_lines_not_recovered() {
        let idx = align_indices(&["two", "one"], &["one", "two"]);
        assert_eq!(idx, vec![None, Some(0)]);
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(align_indices(&none, &["a"]).is_empty());
        assert_eq!(align_indices(&["a"], &none), vec![None]);
    }
}
