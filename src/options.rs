// options.rs
use crate::dir_cache::DirCache;
use crate::error::GlobError;
use crate::platform::Platform;
use camino::Utf8PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cooperative cancellation token.
///
/// A walk polls the signal between directory reads and before emitting each
/// match; an aborted walk ends cleanly with no error.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration options for glob operations
///
/// This struct controls pattern compilation, traversal behavior, and the
/// shape of emitted results.
#[derive(Clone)]
pub struct GlobOptions {
    /// Directory to resolve relative patterns against; accepts a plain path
    /// or a `file://` URL. Defaults to the process working directory.
    pub cwd: Option<Utf8PathBuf>,

    /// Include entries whose name begins with `.` in wildcard and globstar
    /// matches
    pub dot: bool,

    /// Append `/` to directory results
    pub mark: bool,

    /// Disable brace expansion (`{a,b}`, `{1..3}`)
    pub nobrace: bool,

    /// Disable extglob constructs (`@(…)`, `!(…)`, …)
    pub noext: bool,

    /// Treat `**` as an ordinary `*` segment
    pub noglobstar: bool,

    /// Case-insensitive name comparison; `None` picks the platform default
    /// (macOS and Windows are case-insensitive)
    pub nocase: Option<bool>,

    /// Rewrite slash-free patterns `P` to `./**/P`
    pub match_base: bool,

    /// Drop directories from results
    pub nodir: bool,

    /// Patterns to exclude; always evaluated in `dot:true` mode
    pub ignore: Vec<String>,

    /// Traverse symlinked directories under `**` freely
    pub follow: bool,

    /// Canonicalize results and drop entries that cannot be resolved
    pub realpath: bool,

    /// `Some(true)` returns absolute paths always, `Some(false)` relative
    /// always; `None` follows each pattern's own absoluteness
    pub absolute: Option<bool>,

    /// Path-separator and root-shape rules
    pub platform: Platform,

    /// Return entry handles instead of strings; mutually exclusive with
    /// `absolute`
    pub with_file_types: bool,

    /// Cancellation token polled during the walk
    pub signal: Option<AbortSignal>,

    /// Treat `\` as a path separator rather than an escape character
    pub windows_paths_no_escape: bool,

    /// A preconfigured directory cache to share between walks; its case
    /// sensitivity must agree with `nocase`
    pub scurry: Option<Arc<DirCache>>,

    /// Maximum directory depth below cwd to traverse (None for unlimited)
    pub max_depth: Option<usize>,

    /// Maximum number of concurrent directory reads for async walks
    pub max_inflight: usize,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            dot: false,
            mark: false,
            nobrace: false,
            noext: false,
            noglobstar: false,
            nocase: None,
            match_base: false,
            nodir: false,
            ignore: Vec::new(),
            follow: false,
            realpath: false,
            absolute: None,
            platform: Platform::native(),
            with_file_types: false,
            signal: None,
            windows_paths_no_escape: false,
            scurry: None,
            max_depth: None,
            max_inflight: 64,
        }
    }
}

impl GlobOptions {
    /// The effective case sensitivity after applying the platform default
    pub fn nocase_resolved(&self) -> bool {
        self.nocase.unwrap_or_else(|| self.platform.nocase_default())
    }

    /// Rejects conflicting configuration.
    ///
    /// # Errors
    ///
    /// `GlobError::InvalidConfig` when `absolute` is combined with
    /// `with_file_types`, when `match_base` is combined with `noglobstar`,
    /// or when a provided cache disagrees with `nocase`.
    pub fn validate(&self) -> Result<(), GlobError> {
        if self.with_file_types && self.absolute.is_some() {
            return Err(GlobError::InvalidConfig(
                "cannot set absolute together with with_file_types".into(),
            ));
        }
        if self.match_base && self.noglobstar {
            return Err(GlobError::InvalidConfig(
                "match_base requires globstar".into(),
            ));
        }
        if let Some(cache) = &self.scurry {
            if cache.nocase() != self.nocase_resolved() {
                return Err(GlobError::InvalidConfig(
                    "provided dir cache disagrees with nocase setting".into(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn aborted(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.aborted())
    }
}

impl std::fmt::Debug for GlobOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobOptions")
            .field("cwd", &self.cwd)
            .field("dot", &self.dot)
            .field("mark", &self.mark)
            .field("nobrace", &self.nobrace)
            .field("noext", &self.noext)
            .field("noglobstar", &self.noglobstar)
            .field("nocase", &self.nocase)
            .field("match_base", &self.match_base)
            .field("nodir", &self.nodir)
            .field("ignore", &self.ignore)
            .field("follow", &self.follow)
            .field("realpath", &self.realpath)
            .field("absolute", &self.absolute)
            .field("platform", &self.platform)
            .field("with_file_types", &self.with_file_types)
            .field("windows_paths_no_escape", &self.windows_paths_no_escape)
            .field("scurry", &self.scurry.as_ref().map(|_| "DirCache"))
            .field("max_depth", &self.max_depth)
            .field("max_inflight", &self.max_inflight)
            .finish()
    }
}

/// Builder for GlobOptions for fluent configuration
pub struct GlobOptionsBuilder(GlobOptions);

impl Default for GlobOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobOptionsBuilder {
    pub fn new() -> Self {
        Self(GlobOptions::default())
    }

    pub fn cwd(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.0.cwd = Some(dir.into());
        self
    }

    pub fn dot(mut self, v: bool) -> Self {
        self.0.dot = v;
        self
    }

    pub fn mark(mut self, v: bool) -> Self {
        self.0.mark = v;
        self
    }

    pub fn nobrace(mut self, v: bool) -> Self {
        self.0.nobrace = v;
        self
    }

    pub fn noext(mut self, v: bool) -> Self {
        self.0.noext = v;
        self
    }

    pub fn noglobstar(mut self, v: bool) -> Self {
        self.0.noglobstar = v;
        self
    }

    pub fn nocase(mut self, v: bool) -> Self {
        self.0.nocase = Some(v);
        self
    }

    pub fn match_base(mut self, v: bool) -> Self {
        self.0.match_base = v;
        self
    }

    pub fn nodir(mut self, v: bool) -> Self {
        self.0.nodir = v;
        self
    }

    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn follow(mut self, v: bool) -> Self {
        self.0.follow = v;
        self
    }

    pub fn realpath(mut self, v: bool) -> Self {
        self.0.realpath = v;
        self
    }

    pub fn absolute(mut self, v: bool) -> Self {
        self.0.absolute = Some(v);
        self
    }

    pub fn platform(mut self, p: Platform) -> Self {
        self.0.platform = p;
        self
    }

    pub fn with_file_types(mut self, v: bool) -> Self {
        self.0.with_file_types = v;
        self
    }

    pub fn signal(mut self, s: AbortSignal) -> Self {
        self.0.signal = Some(s);
        self
    }

    pub fn windows_paths_no_escape(mut self, v: bool) -> Self {
        self.0.windows_paths_no_escape = v;
        self
    }

    pub fn scurry(mut self, cache: Arc<DirCache>) -> Self {
        self.0.scurry = Some(cache);
        self
    }

    pub fn max_depth(mut self, d: usize) -> Self {
        self.0.max_depth = Some(d);
        self
    }

    pub fn max_inflight(mut self, v: usize) -> Self {
        self.0.max_inflight = v;
        self
    }

    pub fn build(self) -> GlobOptions {
        self.0
    }
}
