// walker.rs
//! State shared by the sync and async walk flavors: option resolution, the
//! directory cache, the ignore filter, and match finalization.

use crate::dir_cache::{DirCache, EntryRef};
use crate::error::GlobError;
use crate::ignore::Ignore;
use crate::options::GlobOptions;
use crate::pattern::Pattern;
use crate::patterns;
use camino::Utf8PathBuf;
use std::sync::Arc;

pub(crate) struct WalkContext {
    pub opts: GlobOptions,
    pub cache: Arc<DirCache>,
    pub ignore: Option<Ignore>,
    pub patterns: Vec<Arc<Pattern>>,
    pub cwd_depth: usize,
}

impl WalkContext {
    pub fn new<S: AsRef<str>>(patterns: &[S], opts: GlobOptions) -> Result<Self, GlobError> {
        opts.validate()?;

        let cache = match &opts.scurry {
            Some(cache) => Arc::clone(cache),
            None => {
                let cwd = resolve_cwd(&opts)?;
                Arc::new(DirCache::new(cwd, opts.platform, opts.nocase_resolved())?)
            }
        };

        let compiled = patterns::compile_many(patterns, &opts)?;
        let ignore = if opts.ignore.is_empty() {
            None
        } else {
            Some(Ignore::new(&opts.ignore, &opts)?)
        };
        let cwd_depth = cache.cwd_entry().depth();

        Ok(Self {
            opts,
            cache,
            ignore,
            patterns: compiled,
            cwd_depth,
        })
    }

    pub fn aborted(&self) -> bool {
        self.opts.aborted()
    }

    pub fn ignored(&self, e: &EntryRef) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|ig| ig.ignored(e, &self.cache))
    }

    pub fn children_ignored(&self, e: &EntryRef) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|ig| ig.children_ignored(e, &self.cache))
    }

    fn depth_below_cwd(&self, e: &EntryRef) -> usize {
        e.depth().saturating_sub(self.cwd_depth)
    }

    /// Whether a subwalk target is still within the depth limit
    pub fn subwalk_depth_ok(&self, target: &EntryRef) -> bool {
        self.opts
            .max_depth
            .map_or(true, |md| self.depth_below_cwd(target) < md)
    }

    /// Finalizes one candidate: canonicalize under `realpath`, stat unknown
    /// entries, then apply the ifDir/nodir/ignore gates. Returns the entry
    /// to emit (the canonical one under `realpath`), or `None` to drop.
    pub fn match_check(&self, e: EntryRef, if_dir: bool) -> Option<EntryRef> {
        let e = if self.opts.realpath {
            self.cache.realpath(&e)?
        } else {
            e
        };
        if e.is_unknown() || self.opts.mark {
            e.lstat();
        }
        self.match_check_test(e, if_dir)
    }

    fn match_check_test(&self, e: EntryRef, if_dir: bool) -> Option<EntryRef> {
        if e.is_enoent() {
            return None;
        }
        if let Some(md) = self.opts.max_depth {
            if self.depth_below_cwd(&e) > md {
                return None;
            }
        }
        if if_dir && !e.can_readdir() {
            return None;
        }
        if self.opts.nodir {
            if e.is_directory() {
                return None;
            }
            // under follow, a symlink resolving to a directory counts too
            if self.opts.follow && e.is_symbolic_link() {
                if let Some(rp) = self.cache.realpath(&e) {
                    if rp.is_unknown() {
                        rp.lstat();
                    }
                    if rp.is_directory() {
                        return None;
                    }
                }
            }
        }
        if self.ignored(&e) {
            return None;
        }
        Some(e)
    }

    /// Applies the result shape: absolute or cwd-relative path, with the
    /// `mark` suffix for directories
    pub fn format(&self, e: &EntryRef, pattern_absolute: bool) -> Utf8PathBuf {
        let absolute = self.opts.absolute.unwrap_or(pattern_absolute);
        let mut s = if absolute {
            e.fullpath().into_string()
        } else {
            let rel = self.cache.relative_to_cwd(e);
            if rel.as_str().is_empty() {
                ".".to_string()
            } else {
                rel.into_string()
            }
        };
        if self.opts.mark && e.is_directory() && !s.ends_with('/') {
            s.push('/');
        }
        Utf8PathBuf::from(s)
    }
}

/// Resolves the configured cwd, accepting a plain path or a `file://` URL
fn resolve_cwd(opts: &GlobOptions) -> Result<Utf8PathBuf, GlobError> {
    let Some(cwd) = &opts.cwd else {
        let here = std::env::current_dir()?;
        return Utf8PathBuf::from_path_buf(here)
            .map_err(|p| GlobError::NonUtf8Path(p.display().to_string()));
    };
    let s = cwd.as_str();
    let Some(rest) = s.strip_prefix("file://") else {
        return Ok(cwd.clone());
    };

    let path = match rest.find('/') {
        Some(0) => rest,
        Some(slash) => {
            let host = &rest[..slash];
            if host != "localhost" {
                return Err(GlobError::InvalidConfig(format!(
                    "unsupported file URL host: {}",
                    host
                )));
            }
            &rest[slash..]
        }
        None => {
            return Err(GlobError::InvalidConfig(format!(
                "malformed file URL: {}",
                s
            )))
        }
    };
    percent_decode(path)
}

fn percent_decode(s: &str) -> Result<Utf8PathBuf, GlobError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = s.get(i + 1..i + 3);
            match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None => {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map(Utf8PathBuf::from)
        .map_err(|e| GlobError::NonUtf8Path(format!("{:?}", e.as_bytes())))
}
