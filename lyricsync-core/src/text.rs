//! Text helpers shared by the codec, matcher and repair paths.
//!
//! Offsets handed out here are byte offsets into the owning `str`, so
//! `&text[start..end]` always reproduces the token.

/// Punctuation ignored when comparing lyric lines.
const LINE_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '…', '"', '\'', '\u{2019}', '(', ')', '\u{2013}', '\u{2014}', '-',
];

/// A whitespace-delimited token and its byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Normalize a lyric line for fuzzy comparison: lowercase, strip the fixed
/// punctuation set, trim.
#[must_use]
pub fn normalize_line(line: &str) -> String {
    line.to_lowercase()
        .chars()
        .filter(|c| !LINE_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalize a single word: lowercase and keep alphanumerics only.
#[must_use]
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Split `text` on whitespace, keeping byte offsets.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: &text[s..i],
                    start: s,
                    end: i,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            start: s,
            end: text.len(),
        });
    }

    tokens
}

/// Whether `input` carries markup tags such as `<p>` or `<br/>`.
///
/// Word timing tags (`<00:12.34>`) do not count: a tag name must start with a
/// letter, optionally after a closing slash.
#[must_use]
pub fn looks_like_html(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b'<' {
            return false;
        }
        let rest = &bytes[i + 1..];
        let name = rest.strip_prefix(b"/").unwrap_or(rest);
        name.first().is_some_and(u8::is_ascii_alphabetic) && rest.contains(&b'>')
    })
}

/// Extract non-empty lyric lines from corrected input, plain text or HTML.
#[must_use]
pub fn extract_lines(input: &str) -> Vec<String> {
    if looks_like_html(input) {
        html_to_lines(input)
    } else {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Convert HTML lyrics to plain lines: `<br>` and `</p>` become line breaks, every
/// other tag is dropped, a fixed entity set is decoded, whitespace is collapsed and
/// empty lines are removed.
#[must_use]
pub fn html_to_lines(html: &str) -> Vec<String> {
    let stripped = strip_tags(html);
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            // Unterminated tag, keep it as text
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = after[..close].trim().to_ascii_lowercase();
        if is_line_break_tag(&inner) {
            out.push('\n');
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn is_line_break_tag(inner: &str) -> bool {
    if inner == "/p" {
        return true;
    }
    inner
        .strip_prefix("br")
        .is_some_and(|tail| tail.trim().trim_end_matches('/').trim().is_empty())
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;" and not "<"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
