// lib.rs
#![forbid(unsafe_code)]

//! Shell-faithful filename globbing.
//!
//! Patterns compile to token sequences (literal, wildcard, globstar); a
//! pure planner decides which directories need listing and which entries
//! already match; sync and async walkers drive the planner over a caching
//! filesystem adapter, deduplicating results and honoring cancellation.

#[cfg(feature = "async")]
pub mod async_glob;
pub mod dir_cache;
pub mod error;
pub mod ignore;
pub mod options;
pub mod pattern;
pub mod patterns;
pub mod platform;
pub mod processor;
pub mod sync;
mod walker;

pub use crate::dir_cache::{DirCache, Entry, EntryRef};
pub use crate::error::GlobError;
pub use crate::ignore::Ignore;
pub use crate::options::{AbortSignal, GlobOptions, GlobOptionsBuilder};
pub use crate::pattern::{Pattern, Token};
pub use crate::platform::Platform;
pub use crate::sync::SyncWalk;

use crate::walker::WalkContext;
use camino::Utf8PathBuf;
use std::sync::Arc;

/// A configured glob invocation.
///
/// Construction validates options and compiles the patterns once; the walk
/// methods can then run any number of times against the same (shared,
/// caching) filesystem adapter. Matching an unchanged tree a second time
/// reuses cached listings instead of re-reading directories.
pub struct Glob {
    ctx: Arc<WalkContext>,
}

impl Glob {
    /// Compiles `patterns` under `opts`.
    ///
    /// # Errors
    ///
    /// `GlobError::InvalidConfig` for conflicting options (for example
    /// `absolute` together with `with_file_types`), or a pattern error for
    /// malformed globs.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use globhunt::{Glob, GlobOptions};
    ///
    /// let glob = Glob::new(&["src/**/*.rs"], GlobOptions::default()).unwrap();
    /// let paths = glob.walk_sync().unwrap();
    /// ```
    pub fn new<S: AsRef<str>>(patterns: &[S], opts: GlobOptions) -> Result<Self, GlobError> {
        Ok(Self {
            ctx: Arc::new(WalkContext::new(patterns, opts)?),
        })
    }

    /// Walks synchronously and collects all matching paths
    pub fn walk_sync(&self) -> Result<Vec<Utf8PathBuf>, GlobError> {
        sync::walk_paths(Arc::clone(&self.ctx))
    }

    /// Walks synchronously, collecting entry handles instead of strings
    pub fn entries_sync(&self) -> Result<Vec<EntryRef>, GlobError> {
        sync::walk_entries(Arc::clone(&self.ctx))
    }

    /// A lazily driven synchronous walk, yielding paths as they are found
    pub fn iter_sync(&self) -> SyncWalk {
        SyncWalk::new(Arc::clone(&self.ctx))
    }

    /// Walks asynchronously and collects all matching paths
    #[cfg(feature = "async")]
    pub async fn walk(&self) -> Result<Vec<Utf8PathBuf>, GlobError> {
        async_glob::walk_paths(Arc::clone(&self.ctx)).await
    }

    /// An asynchronous stream of matches; poll it as a stream or drive it
    /// with `StreamExt::next` as an async iterator
    #[cfg(feature = "async")]
    pub fn stream(
        &self,
    ) -> impl futures::Stream<Item = Result<Utf8PathBuf, GlobError>> {
        async_glob::glob_stream(Arc::clone(&self.ctx))
    }
}

/// Performs synchronous glob pattern matching
///
/// # Examples
///
/// ```no_run
/// use globhunt::{glob_sync, GlobOptions};
///
/// let results = glob_sync(&["*.txt", "*.md"], GlobOptions::default()).unwrap();
/// ```
pub fn glob_sync<S: AsRef<str>>(
    patterns: &[S],
    opts: GlobOptions,
) -> Result<Vec<Utf8PathBuf>, GlobError> {
    Glob::new(patterns, opts)?.walk_sync()
}

/// Performs asynchronous glob pattern matching
#[cfg(feature = "async")]
pub async fn glob<S: AsRef<str>>(
    patterns: &[S],
    opts: GlobOptions,
) -> Result<Vec<Utf8PathBuf>, GlobError> {
    Glob::new(patterns, opts)?.walk().await
}

/// Creates a stream of results for asynchronous glob pattern matching
#[cfg(feature = "async")]
pub fn glob_stream<S: AsRef<str>>(
    patterns: &[S],
    opts: GlobOptions,
) -> Result<impl futures::Stream<Item = Result<Utf8PathBuf, GlobError>>, GlobError> {
    Ok(Glob::new(patterns, opts)?.stream())
}

/// Creates a lazily driven synchronous walk
pub fn glob_iter_sync<S: AsRef<str>>(
    patterns: &[S],
    opts: GlobOptions,
) -> Result<SyncWalk, GlobError> {
    Ok(Glob::new(patterns, opts)?.iter_sync())
}
