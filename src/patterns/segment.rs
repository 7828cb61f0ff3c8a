// patterns/segment.rs
//! Compiles a single glob segment (one path portion, never containing `/`)
//! into a name matcher.
//!
//! Plain wildcards, character classes, and POSIX classes compile to the
//! `regex` crate. Extglob negation `!(…)` needs negative look-ahead, which
//! plain `regex` does not support, so those segments compile through
//! `fancy-regex` instead.

use crate::error::GlobError;

/// Options that affect how a segment compiles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentOpts {
    /// Allow wildcards to match names starting with `.`
    pub dot: bool,
    /// Case-insensitive matching
    pub nocase: bool,
    /// Treat extglob constructs as literal characters
    pub noext: bool,
}

impl SegmentOpts {
    pub(crate) fn cache_key(&self, source: &str) -> String {
        let mut key = String::with_capacity(source.len() + 4);
        key.push(if self.dot { 'd' } else { '-' });
        key.push(if self.nocase { 'i' } else { '-' });
        key.push(if self.noext { 'e' } else { '-' });
        key.push('\u{0}');
        key.push_str(source);
        key
    }
}

enum SegmentRe {
    Plain(regex::Regex),
    Lookaround(fancy_regex::Regex),
}

impl Clone for SegmentRe {
    fn clone(&self) -> Self {
        match self {
            SegmentRe::Plain(r) => SegmentRe::Plain(r.clone()),
            SegmentRe::Lookaround(r) => SegmentRe::Lookaround(r.clone()),
        }
    }
}

/// A compiled matcher for one wildcard path portion
#[derive(Clone)]
pub struct SegmentMatcher {
    source: String,
    guard_dot: bool,
    re: SegmentRe,
}

impl SegmentMatcher {
    /// Tests a single entry name.
    ///
    /// Wildcard segments never match `.` or `..`, and unless `dot` was set
    /// (or the glob text itself starts with a literal dot) they never match
    /// hidden names.
    pub fn is_match(&self, name: &str) -> bool {
        if name == "." || name == ".." {
            return false;
        }
        if self.guard_dot && name.starts_with('.') {
            return false;
        }
        match &self.re {
            SegmentRe::Plain(r) => r.is_match(name),
            SegmentRe::Lookaround(r) => r.is_match(name).unwrap_or(false),
        }
    }

    /// The original glob text of this segment
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for SegmentMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.guard_dot == other.guard_dot
    }
}

impl std::fmt::Debug for SegmentMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SegmentMatcher({:?})", self.source)
    }
}

/// Compiles a glob segment into a [`SegmentMatcher`].
pub fn compile_segment(segment: &str, opts: SegmentOpts) -> Result<SegmentMatcher, GlobError> {
    let chars: Vec<char> = segment.chars().collect();
    let mut body = String::with_capacity(segment.len() * 2);
    translate(&chars, 0, chars.len(), opts, &mut body)?;

    let mut full = String::with_capacity(body.len() + 8);
    if opts.nocase {
        full.push_str("(?i)");
    }
    full.push('^');
    full.push_str(&body);
    full.push('$');

    let re = if body.contains("(?!") {
        SegmentRe::Lookaround(fancy_regex::Regex::new(&full)?)
    } else {
        SegmentRe::Plain(regex::Regex::new(&full)?)
    };

    Ok(SegmentMatcher {
        source: segment.to_string(),
        guard_dot: !opts.dot && !segment.starts_with('.'),
        re,
    })
}

/// Whether a segment contains any unescaped wildcard construct
pub fn has_magic(segment: &str, noext: bool) -> bool {
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '*' | '?' | '[' => return true,
            '+' | '@' | '!' if !noext && matches!(chars.get(i + 1), Some('(')) => {
                return true;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Strips glob escapes from a literal segment
pub fn unescape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) => out.push(n),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn push_escaped(c: char, out: &mut String) {
    if matches!(
        c,
        '.' | '+' | '?' | '*' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    ) {
        out.push('\\');
    }
    out.push(c);
}

fn translate(
    chars: &[char],
    start: usize,
    end: usize,
    opts: SegmentOpts,
    out: &mut String,
) -> Result<(), GlobError> {
    let mut i = start;
    while i < end {
        let c = chars[i];
        match c {
            '\\' => {
                i += 1;
                if i < end {
                    push_escaped(chars[i], out);
                    i += 1;
                } else {
                    out.push_str("\\\\");
                }
            }
            '*' if !matches!(chars.get(i + 1), Some('(')) || opts.noext => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' if !matches!(chars.get(i + 1), Some('(')) || opts.noext => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => {
                i = translate_class(chars, i, end, out)?;
            }
            '?' | '*' | '+' | '@' | '!' if matches!(chars.get(i + 1), Some('(')) && !opts.noext => {
                let close = find_balanced(chars, i + 1, end).ok_or_else(|| {
                    GlobError::InvalidPattern("unbalanced parentheses in extglob".into())
                })?;
                let alternatives = split_alternatives(chars, i + 2, close);
                let mut alts = String::new();
                for (n, (a, b)) in alternatives.iter().enumerate() {
                    if n > 0 {
                        alts.push('|');
                    }
                    translate(chars, *a, *b, opts, &mut alts)?;
                }
                match c {
                    '?' => out.push_str(&format!("(?:{})?", alts)),
                    '*' => out.push_str(&format!("(?:{})*", alts)),
                    '+' => out.push_str(&format!("(?:{})+", alts)),
                    '@' => out.push_str(&format!("(?:{})", alts)),
                    '!' => {
                        // A whole-segment negation is an exact complement;
                        // an embedded one only refuses the alternatives at
                        // its own position.
                        if i == 0 && close + 1 == chars.len() {
                            out.push_str(&format!("(?!(?:{})$)[^/]*", alts));
                        } else {
                            out.push_str(&format!("(?:(?!(?:{}))[^/]*?)", alts));
                        }
                    }
                    _ => unreachable!(),
                }
                i = close + 1;
            }
            _ => {
                push_escaped(c, out);
                i += 1;
            }
        }
    }
    Ok(())
}

/// Translates a `[...]` class starting at `open`; returns the index just
/// past the closing bracket. An unterminated class is a literal `[`.
fn translate_class(
    chars: &[char],
    open: usize,
    end: usize,
    out: &mut String,
) -> Result<usize, GlobError> {
    let mut i = open + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let content_start = i;

    // Locate the closing bracket; a `]` in first position is a member.
    let mut j = i;
    let mut first = true;
    let close = loop {
        if j >= end {
            break None;
        }
        match chars[j] {
            ']' if !first => break Some(j),
            '\\' => j += 2,
            '[' if j + 1 < end && chars[j + 1] == ':' => {
                // skip a [:name:] class
                let mut k = j + 2;
                while k < end && chars[k] != ':' {
                    k += 1;
                }
                j = if k + 1 < end && chars[k + 1] == ']' {
                    k + 2
                } else {
                    j + 1
                };
            }
            _ => j += 1,
        }
        first = false;
    };

    let Some(close) = close else {
        out.push_str("\\[");
        return Ok(open + 1);
    };

    out.push('[');
    if negated {
        out.push('^');
    }
    i = content_start;
    while i < close {
        let c = chars[i];
        match c {
            '\\' => {
                i += 1;
                if i < close {
                    class_escape(chars[i], out);
                    i += 1;
                }
            }
            '[' if matches!(chars.get(i + 1), Some(':')) => {
                let mut k = i + 2;
                while k < close && chars[k] != ':' {
                    k += 1;
                }
                if matches!(chars.get(k + 1), Some(']')) {
                    let name: String = chars[i + 2..k].iter().collect();
                    out.push_str(posix_class(&name)?);
                    i = k + 2;
                } else {
                    out.push_str("\\[");
                    i += 1;
                }
            }
            '-' => {
                out.push('-');
                i += 1;
            }
            _ => {
                class_escape(c, out);
                i += 1;
            }
        }
    }
    out.push(']');
    Ok(close + 1)
}

fn class_escape(c: char, out: &mut String) {
    if matches!(c, '\\' | '^' | ']' | '[' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

/// Unicode-aware translations for `[:name:]` classes
fn posix_class(name: &str) -> Result<&'static str, GlobError> {
    Ok(match name {
        "alpha" => r"\p{L}",
        "digit" => r"\p{Nd}",
        "alnum" => r"\p{L}\p{Nd}",
        "upper" => r"\p{Lu}",
        "lower" => r"\p{Ll}",
        "space" => r"\s",
        "blank" => r"\t ",
        "punct" => r"\p{P}",
        "cntrl" => r"\p{Cc}",
        "graph" => r"\p{L}\p{M}\p{N}\p{P}\p{S}",
        "print" => r"\p{L}\p{M}\p{N}\p{P}\p{S}\p{Zs}",
        "word" => r"\w",
        "xdigit" => r"0-9A-Fa-f",
        other => {
            return Err(GlobError::InvalidPattern(format!(
                "unknown POSIX class [:{}:]",
                other
            )))
        }
    })
}

/// Index of the `)` balancing the `(` at `open`
fn find_balanced(chars: &[char], open: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < end {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Top-level `|` split of an extglob body, as (start, end) ranges
fn split_alternatives(chars: &[char], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut seg_start = start;
    let mut i = start;
    while i < end {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                out.push((seg_start, i));
                seg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    out.push((seg_start, end));
    out
}
