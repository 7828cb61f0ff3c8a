// patterns/mod.rs
//! Glob compilation: brace expansion, `/`-splitting with separator
//! coalescing, and per-segment classification into literal, wildcard, and
//! globstar tokens.

pub mod brace;
pub mod cache;
pub mod segment;

use crate::error::GlobError;
use crate::options::GlobOptions;
use crate::pattern::{Pattern, Token};
use crate::platform::{self, Platform};
use self::segment::SegmentOpts;
use std::sync::Arc;

/// Compiles one glob string into raw (token list, glob part list) pairs.
///
/// Brace expansion can fan a single source string out into several
/// patterns, so the result is a list. `dot` is taken as a parameter rather
/// than from the options because ignore patterns always compile with
/// `dot:true`.
pub fn compile_raw(
    pattern: &str,
    opts: &GlobOptions,
    dot: bool,
) -> Result<Vec<(Vec<Token>, Vec<String>)>, GlobError> {
    let mut raw = pattern.to_string();
    if opts.windows_paths_no_escape {
        raw = raw.replace('\\', "/");
    }
    if opts.match_base && !raw.contains('/') {
        raw = format!("./**/{}", raw);
    }

    let expansions = if opts.nobrace || !raw.contains('{') {
        vec![raw]
    } else {
        brace::expand(&raw)?
    };

    let seg_opts = SegmentOpts {
        dot,
        nocase: opts.nocase_resolved(),
        noext: opts.noext,
    };

    let mut out = Vec::with_capacity(expansions.len());
    for exp in expansions {
        let parts = split_parts(&exp, opts.platform);
        let mut tokens = Vec::with_capacity(parts.len());
        for part in &parts {
            let token = if part == "**" && !opts.noglobstar {
                Token::GlobStar
            } else if segment::has_magic(part, opts.noext) {
                Token::Rx(cache::get_or_compile(part, seg_opts)?)
            } else {
                Token::Lit(segment::unescape(part))
            };
            tokens.push(token);
        }
        out.push((tokens, parts));
    }
    Ok(out)
}

/// Compiles user-supplied pattern strings into planner cursors.
///
/// Empty strings are skipped; repeated separators are coalesced during
/// splitting; absolute heads normalize inside [`Pattern::new`].
pub fn compile_many<S: AsRef<str>>(
    patterns: &[S],
    opts: &GlobOptions,
) -> Result<Vec<Arc<Pattern>>, GlobError> {
    let mut out = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if pattern.is_empty() {
            continue;
        }
        for (tokens, parts) in compile_raw(pattern, opts, opts.dot)? {
            out.push(Pattern::new(tokens, parts, opts.platform)?);
        }
    }
    Ok(out)
}

/// Splits a glob string into path portions.
///
/// Interior repeated `/` coalesce; a leading empty part marks an absolute
/// pattern and a trailing empty part records a trailing slash. A Windows
/// UNC head keeps its two leading empty parts so root normalization can
/// recognize it.
fn split_parts(s: &str, platform: Platform) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut body = s;
    if platform.is_windows() && s.starts_with("//") && !s[2..].starts_with('/') {
        parts.push(String::new());
        parts.push(String::new());
        body = &s[2..];
    }

    let raw: Vec<&str> = body.split('/').collect();
    let last = raw.len() - 1;
    for (i, part) in raw.iter().enumerate() {
        if part.is_empty() && i != 0 && i != last {
            continue;
        }
        parts.push(part.to_string());
    }
    parts
}

/// Matches a token slice against path segments; `**` may span any number
/// of segments including zero.
///
/// Dot gating is not applied here: the segment matchers carry their own
/// rule, and the ignore filter (the sole caller) compiles with `dot:true`.
pub(crate) fn match_tokens(tokens: &[Token], segs: &[&str], nocase: bool) -> bool {
    match tokens.split_first() {
        None => segs.is_empty(),
        Some((Token::GlobStar, rest)) => {
            (0..=segs.len()).any(|i| match_tokens(rest, &segs[i..], nocase))
        }
        Some((Token::Lit(lit), rest)) => match segs.split_first() {
            Some((seg, srest)) => {
                platform::eq_name(seg, lit, nocase) && match_tokens(rest, srest, nocase)
            }
            None => false,
        },
        Some((Token::Rx(re), rest)) => match segs.split_first() {
            Some((seg, srest)) => re.is_match(seg) && match_tokens(rest, srest, nocase),
            None => false,
        },
    }
}
