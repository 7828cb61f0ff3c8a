// patterns/brace.rs
use crate::error::GlobError;

/// Maximum number of expansions to prevent runaway patterns
const MAX_EXPANSIONS: usize = 1000;
/// Maximum nesting depth to prevent stack overflow
const MAX_DEPTH: usize = 10;

/// Expands brace patterns in a string.
///
/// Supports comma alternation `{a,b}`, nested braces, numeric ranges
/// `{1..3}` (negative bounds, descending order, `{01..03}` zero padding,
/// and an optional step as in `{1..10..2}`), and character ranges `{a..e}`.
/// A brace group without a top-level comma or range is literal text, as in
/// the shell: `a{b}c` stays `a{b}c`.
///
/// # Errors
///
/// Returns `GlobError::BraceExpansionDepth` if maximum depth is exceeded
/// and `GlobError::BraceExpansionCount` if maximum expansions are exceeded.
pub fn expand(input: &str) -> Result<Vec<String>, GlobError> {
    let mut out = Vec::new();
    expand_into(input, 0, &mut out)?;
    Ok(out)
}

fn expand_into(input: &str, depth: usize, out: &mut Vec<String>) -> Result<(), GlobError> {
    if depth > MAX_DEPTH {
        return Err(GlobError::BraceExpansionDepth);
    }

    let Some((open, close)) = find_brace(input) else {
        push_checked(out, input.to_string())?;
        return Ok(());
    };

    let before = &input[..open];
    let body = &input[open + 1..close];
    let after = &input[close + 1..];

    let alternatives = split_alternatives(body);
    let items: Vec<String> = if alternatives.len() > 1 {
        alternatives.into_iter().map(str::to_string).collect()
    } else if let Some(range) = parse_range(body)? {
        range
    } else {
        // no comma and no range: the braces are literal text
        let mut suffixes = Vec::new();
        expand_into(after, depth + 1, &mut suffixes)?;
        for suf in suffixes {
            push_checked(out, format!("{}{{{}}}{}", before, body, suf))?;
        }
        return Ok(());
    };

    for item in items {
        let mut mids = Vec::new();
        expand_into(&item, depth + 1, &mut mids)?;
        for mid in mids {
            let mut suffixes = Vec::new();
            expand_into(after, depth + 1, &mut suffixes)?;
            for suf in suffixes {
                push_checked(out, format!("{}{}{}", before, mid, suf))?;
            }
        }
    }

    Ok(())
}

fn push_checked(out: &mut Vec<String>, s: String) -> Result<(), GlobError> {
    if out.len() >= MAX_EXPANSIONS {
        return Err(GlobError::BraceExpansionCount);
    }
    out.push(s);
    Ok(())
}

/// Finds the first balanced top-level brace pair, honoring escapes
fn find_brace(s: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = None;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        return start.map(|st| (st, i));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a brace body on top-level commas
fn split_alternatives(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut seg_start = 0;
    let mut escaped = false;

    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&body[seg_start..i]);
                seg_start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&body[seg_start..]);
    out
}

/// Parses `a..b` and `a..b..step` range bodies, numeric or single-char
fn parse_range(body: &str) -> Result<Option<Vec<String>>, GlobError> {
    let parts: Vec<&str> = body.split("..").collect();
    let (a, b, step) = match parts.as_slice() {
        [a, b] => (*a, *b, 1u64),
        [a, b, s] => match s.parse::<i64>() {
            Ok(n) if n != 0 => (*a, *b, n.unsigned_abs()),
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };

    if let (Ok(lo), Ok(hi)) = (a.parse::<i64>(), b.parse::<i64>()) {
        let span = lo.abs_diff(hi) / step + 1;
        if span > MAX_EXPANSIONS as u64 {
            return Err(GlobError::BraceExpansionCount);
        }
        let width = if has_padding(a) || has_padding(b) {
            a.len().max(b.len())
        } else {
            0
        };
        let mut vals = Vec::with_capacity(span as usize);
        let mut v = lo;
        loop {
            vals.push(pad_number(v, width));
            if v == hi {
                break;
            }
            let next = if lo <= hi {
                v.saturating_add(step as i64)
            } else {
                v.saturating_sub(step as i64)
            };
            if (lo <= hi && next > hi) || (lo > hi && next < hi) {
                break;
            }
            v = next;
        }
        return Ok(Some(vals));
    }

    // single-character ranges such as {a..e}
    let (ac, bc) = match (single_char(a), single_char(b)) {
        (Some(ac), Some(bc)) => (ac, bc),
        _ => return Ok(None),
    };
    let (lo, hi) = (ac as u32, bc as u32);
    let span = lo.abs_diff(hi) as u64 / step + 1;
    if span > MAX_EXPANSIONS as u64 {
        return Err(GlobError::BraceExpansionCount);
    }
    let mut vals = Vec::with_capacity(span as usize);
    let mut v = lo;
    loop {
        if let Some(c) = char::from_u32(v) {
            vals.push(c.to_string());
        }
        if v == hi {
            break;
        }
        let next = if lo <= hi {
            v + step as u32
        } else {
            v.saturating_sub(step as u32)
        };
        if (lo <= hi && next > hi) || (lo > hi && next < hi) {
            break;
        }
        v = next;
    }
    Ok(Some(vals))
}

fn has_padding(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0')
}

fn pad_number(v: i64, width: usize) -> String {
    if width == 0 {
        return v.to_string();
    }
    if v < 0 {
        format!("-{:0w$}", v.unsigned_abs(), w = width.saturating_sub(1))
    } else {
        format!("{:0w$}", v, w = width)
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut it = s.chars();
    match (it.next(), it.next()) {
        (Some(c), None) if !c.is_ascii_digit() => Some(c),
        _ => None,
    }
}
