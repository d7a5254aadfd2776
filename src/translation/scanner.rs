//! Lexical pass that separates executable SQL from regions no rewrite may touch:
//! string literals, quoted identifiers, comments and dollar-quoted bodies.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

const LITERAL_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';
const COMMENT_OPEN: char = '\u{E002}';
const NAMED_OPEN: char = '\u{E003}';

static MASK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\u{E000}\u{E002}\u{E003}](\\d+)\u{E001}").expect("static mask token pattern")
});

/// Pattern fragment matching a masked comment token.
pub(crate) const COMMENT_TOKEN: &str = "\u{E002}\\d+\u{E001}";
/// Pattern fragment matching a masked `@name` token.
pub(crate) const NAMED_TOKEN: &str = "\u{E003}\\d+\u{E001}";

enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

impl State {
    fn kind(&self) -> SegmentKind {
        match self {
            State::Normal => SegmentKind::Code,
            State::LineComment | State::BlockComment(_) => SegmentKind::Comment,
            State::SingleQuoted | State::DoubleQuoted | State::DollarQuoted(_) => {
                SegmentKind::Literal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Code,
    Literal,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub kind: SegmentKind,
    pub range: Range<usize>,
}

/// A `@name` placeholder found in executable SQL. `range` covers the `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NamedRef<'a> {
    pub name: &'a str,
    pub range: Range<usize>,
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `$tag$` opener at `start`; returns the tag and the index of its closing `$`.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        if !is_ident_byte(bytes[idx]) {
            return None;
        }
        idx += 1;
    }
    // `$1$` runs are positional markers, not a tag
    let tag = &bytes[start + 1..idx];
    if tag.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }

    if idx < bytes.len() {
        let tag = String::from_utf8(tag.to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len() && &bytes[idx + 1..end] == tag.as_bytes() && bytes[end] == b'$'
}

fn push(segments: &mut Vec<Segment>, kind: SegmentKind, range: Range<usize>) {
    if !range.is_empty() {
        segments.push(Segment { kind, range });
    }
}

/// Split `sql` into segments covering the whole input.
///
/// Unterminated literals or comments run to the end of the text.
pub(crate) fn split_segments(sql: &str) -> Vec<Segment> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut state = State::Normal;
    let mut seg_start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => {
                let opened = match b {
                    b'\'' => Some((State::SingleQuoted, idx)),
                    b'"' => Some((State::DoubleQuoted, idx)),
                    _ if is_line_comment_start(bytes, idx) => Some((State::LineComment, idx + 1)),
                    _ if is_block_comment_start(bytes, idx) => {
                        Some((State::BlockComment(1), idx + 1))
                    }
                    b'$' => try_start_dollar_quote(bytes, idx)
                        .map(|(tag, advance)| (State::DollarQuoted(tag), advance)),
                    _ => None,
                };
                if let Some((next, advance)) = opened {
                    push(&mut segments, SegmentKind::Code, seg_start..idx);
                    seg_start = idx;
                    state = next;
                    idx = advance;
                }
            }
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if matches!(state, State::SingleQuoted) {
                    b'\''
                } else {
                    b'"'
                };
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // escaped quote
                    } else {
                        push(&mut segments, SegmentKind::Literal, seg_start..idx + 1);
                        seg_start = idx + 1;
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    push(&mut segments, SegmentKind::Comment, seg_start..idx);
                    seg_start = idx;
                    state = State::Normal;
                    continue;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        push(&mut segments, SegmentKind::Comment, seg_start..idx + 1);
                        seg_start = idx + 1;
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    push(&mut segments, SegmentKind::Literal, seg_start..idx + 1);
                    seg_start = idx + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    push(&mut segments, state.kind(), seg_start..bytes.len());
    segments
}

/// Every `@name` placeholder in executable SQL, in textual order.
///
/// `@@name` system variables and `@` glued to a preceding identifier are skipped.
pub(crate) fn find_named(sql: &str) -> Vec<NamedRef<'_>> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    for segment in split_segments(sql) {
        if segment.kind != SegmentKind::Code {
            continue;
        }
        let mut idx = segment.range.start;
        while idx < segment.range.end {
            if bytes[idx] != b'@' {
                idx += 1;
                continue;
            }
            let prev_ok = idx == 0 || !(bytes[idx - 1] == b'@' || is_ident_byte(bytes[idx - 1]));
            let starts_ident = bytes
                .get(idx + 1)
                .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_');
            if !(prev_ok && starts_ident) {
                // skip the whole `@@name` run
                while idx < segment.range.end && bytes[idx] == b'@' {
                    idx += 1;
                }
                continue;
            }
            let mut end = idx + 1;
            while end < segment.range.end && is_ident_byte(bytes[end]) {
                end += 1;
            }
            found.push(NamedRef {
                name: &sql[idx + 1..end],
                range: idx..end,
            });
            idx = end;
        }
    }
    found
}

/// SQL with literals, comments and `@name` placeholders swapped for opaque tokens.
pub(crate) struct Masked {
    pub text: String,
    protected: Vec<String>,
}

fn push_token(text: &mut String, protected: &mut Vec<String>, open: char, original: &str) {
    text.push(open);
    text.push_str(&protected.len().to_string());
    text.push(TOKEN_CLOSE);
    protected.push(original.to_string());
}

pub(crate) fn mask(sql: &str) -> Masked {
    let mut text = String::with_capacity(sql.len());
    let mut protected = Vec::new();
    let mut named = find_named(sql).into_iter().peekable();

    for segment in split_segments(sql) {
        match segment.kind {
            SegmentKind::Code => {
                let mut cursor = segment.range.start;
                while let Some(found) = named.next_if(|n| n.range.start < segment.range.end) {
                    text.push_str(&sql[cursor..found.range.start]);
                    push_token(&mut text, &mut protected, NAMED_OPEN, &sql[found.range.clone()]);
                    cursor = found.range.end;
                }
                text.push_str(&sql[cursor..segment.range.end]);
            }
            SegmentKind::Literal => {
                push_token(&mut text, &mut protected, LITERAL_OPEN, &sql[segment.range]);
            }
            SegmentKind::Comment => {
                push_token(&mut text, &mut protected, COMMENT_OPEN, &sql[segment.range]);
            }
        }
    }
    Masked { text, protected }
}

impl Masked {
    /// Put the original literals, comments and placeholders back into `text`.
    pub(crate) fn restore(&self, text: &str) -> String {
        if self.protected.is_empty() {
            return text.to_string();
        }
        MASK_TOKEN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.protected.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
