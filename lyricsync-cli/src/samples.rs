//! Plain-text inputs for the `replay` and `interpolate` commands.

use anyhow::{bail, Context, Result};
use lyricsync_core::SampleRecord;

/// Parse a playback trace: one `wall_ms position_ms playing` triple per line,
/// `playing` being `0` or `1`. Blank lines and `#` comments are skipped.
pub fn parse_trace(input: &str) -> Result<Vec<SampleRecord>> {
    let mut records = Vec::new();

    for (n, raw) in input.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [wall, position, playing] = fields.as_slice() else {
            bail!("line {}: expected `wall_ms position_ms playing`, got {line:?}", n + 1);
        };

        let is_playing = match *playing {
            "1" => true,
            "0" => false,
            other => bail!("line {}: playing flag must be 0 or 1, got {other:?}", n + 1),
        };

        records.push(SampleRecord {
            wall_ms: wall
                .parse()
                .with_context(|| format!("line {}: invalid wall_ms", n + 1))?,
            position_ms: position
                .parse()
                .with_context(|| format!("line {}: invalid position_ms", n + 1))?,
            is_playing,
        });
    }

    Ok(records)
}

/// Parse interpolation inputs, `-` standing for an unknown time.
pub fn parse_times(values: &[String]) -> Result<Vec<Option<f64>>> {
    values
        .iter()
        .map(|value| {
            if value == "-" {
                return Ok(None);
            }
            let time: f64 = value
                .parse()
                .with_context(|| format!("invalid time {value:?}"))?;
            if !time.is_finite() {
                bail!("invalid time {value:?}");
            }
            Ok(Some(time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let records = parse_trace("# wall pos playing\n0 0 1\n\n1900 1900 1 # jitter\n5800 5800 0\n")
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1],
            SampleRecord {
                wall_ms: 1900,
                position_ms: 1900,
                is_playing: true
            }
        );
        assert!(!records[2].is_playing);
    }

    #[test]
    fn test_parse_trace_rejects_bad_rows() {
        assert!(parse_trace("0 0").is_err());
        assert!(parse_trace("0 0 yes").is_err());
        assert!(parse_trace("x 0 1").is_err());
    }

    #[test]
    fn test_parse_times() {
        let values: Vec<String> = ["-", "5", "-"].iter().map(ToString::to_string).collect();
        assert_eq!(parse_times(&values).unwrap(), vec![None, Some(5.0), None]);
        assert!(parse_times(&["abc".to_string()]).is_err());
        assert!(parse_times(&["NaN".to_string()]).is_err());
    }
}
