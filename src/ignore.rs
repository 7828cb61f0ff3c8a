// ignore.rs
//! Exclusion filter over candidate entries.
//!
//! Ignore patterns always compile in `dot:true` mode and use the cache's
//! case sensitivity. A pattern ending in `/**` drops the directory itself
//! as well as everything below it, which is also what lets the walker
//! prune whole subtrees instead of filtering entry by entry.

use crate::dir_cache::{DirCache, EntryRef};
use crate::error::GlobError;
use crate::options::GlobOptions;
use crate::pattern::{Pattern, Token};
use crate::patterns::{self, match_tokens};
use crate::platform::{self, Platform};
use std::sync::Arc;

pub struct Ignore {
    relative: Vec<Arc<Pattern>>,
    absolute: Vec<Arc<Pattern>>,
    relative_children: Vec<Arc<Pattern>>,
    absolute_children: Vec<Arc<Pattern>>,
    nocase: bool,
    platform: Platform,
}

impl Ignore {
    pub fn new(ignored: &[String], opts: &GlobOptions) -> Result<Self, GlobError> {
        let mut ignore = Ignore {
            relative: Vec::new(),
            absolute: Vec::new(),
            relative_children: Vec::new(),
            absolute_children: Vec::new(),
            nocase: opts.nocase_resolved(),
            platform: opts.platform,
        };

        for raw in ignored {
            if raw.is_empty() {
                continue;
            }
            for (tokens, parts) in patterns::compile_raw(raw, opts, true)? {
                let children = tokens.len() > 1 && matches!(tokens.last(), Some(Token::GlobStar));
                if children {
                    let parent = Pattern::new(
                        tokens[..tokens.len() - 1].to_vec(),
                        parts[..parts.len() - 1].to_vec(),
                        opts.platform,
                    )?;
                    if parent.is_absolute() {
                        ignore.absolute_children.push(parent);
                    } else {
                        ignore.relative_children.push(parent);
                    }
                }
                let p = Pattern::new(tokens, parts, opts.platform)?;
                if p.is_absolute() {
                    ignore.absolute.push(p);
                } else {
                    ignore.relative.push(p);
                }
            }
        }
        Ok(ignore)
    }

    /// Whether this entry itself is excluded
    pub fn ignored(&self, e: &EntryRef, cache: &DirCache) -> bool {
        self.test(e, cache, &self.relative, &self.absolute)
    }

    /// Whether everything below this directory is excluded
    pub fn children_ignored(&self, e: &EntryRef, cache: &DirCache) -> bool {
        if self.relative_children.is_empty() && self.absolute_children.is_empty() {
            return false;
        }
        self.test(e, cache, &self.relative_children, &self.absolute_children)
    }

    fn test(
        &self,
        e: &EntryRef,
        cache: &DirCache,
        relative: &[Arc<Pattern>],
        absolute: &[Arc<Pattern>],
    ) -> bool {
        if !relative.is_empty() {
            let rel = cache.relative_to_cwd(e);
            let rel = if rel.as_str().is_empty() {
                ".".to_string()
            } else {
                rel.into_string()
            };
            let segs: Vec<&str> = rel.split('/').collect();
            for p in relative {
                if self.match_segments(p.tokens(), &segs) {
                    return true;
                }
            }
        }
        if !absolute.is_empty() {
            let full = e.fullpath();
            if let Some((root, rest)) = platform::split_root(self.platform, full.as_str()) {
                let segs: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
                for p in absolute {
                    let Some(proot) = p.root() else { continue };
                    if platform::eq_root(self.platform, proot, &root)
                        && self.match_segments(&p.tokens()[1..], &segs)
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Tries the path as-is and with a trailing slash marker, so `dir/`
    /// patterns match the directory entry itself
    fn match_segments(&self, tokens: &[Token], segs: &[&str]) -> bool {
        if match_tokens(tokens, segs, self.nocase) {
            return true;
        }
        if matches!(tokens.last(), Some(Token::Lit(l)) if l.is_empty()) {
            let mut with_slash: Vec<&str> = segs.to_vec();
            with_slash.push("");
            return match_tokens(tokens, &with_slash, self.nocase);
        }
        false
    }
}
