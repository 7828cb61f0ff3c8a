// dir_cache.rs
//! Caching filesystem adapter.
//!
//! Entries are interned: two lookups of the same canonical path return the
//! same handle, which is what result deduplication keys on. Children are
//! created provisionally by `resolve` and confirmed (or marked missing) by
//! the parent's directory read. A directory is read at most once per cache;
//! concurrent requesters of an in-flight read wait on the entry lock and
//! then see the cached listing.

use crate::error::GlobError;
use crate::platform::{self, Platform};
use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fs;
use std::sync::{Arc, Mutex, MutexGuard};

pub type EntryRef = Arc<Entry>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ifmt {
    Unknown,
    File,
    Dir,
    Symlink,
    Other,
}

#[derive(Debug)]
struct EntryState {
    ifmt: Ifmt,
    /// known to be missing
    enoent: bool,
    /// a directory read failed here; never listable
    enochild: bool,
    called_readdir: bool,
    /// confirmed to exist by a parent listing or a successful lstat
    listed: bool,
    lstat_called: bool,
    children: Vec<EntryRef>,
    fullpath: Option<Utf8PathBuf>,
    realpath: Option<Option<EntryRef>>,
}

impl EntryState {
    fn provisional() -> Self {
        Self {
            ifmt: Ifmt::Unknown,
            enoent: false,
            enochild: false,
            called_readdir: false,
            listed: false,
            lstat_called: false,
            children: Vec::new(),
            fullpath: None,
            realpath: None,
        }
    }
}

/// An interned handle for one filesystem path
pub struct Entry {
    name: String,
    parent: Option<EntryRef>,
    nocase: bool,
    state: Mutex<EntryState>,
}

impl Entry {
    fn new_root(name: &str, nocase: bool) -> EntryRef {
        let mut state = EntryState::provisional();
        state.ifmt = Ifmt::Dir;
        state.listed = true;
        Arc::new(Entry {
            name: name.to_string(),
            parent: None,
            nocase,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The entry's basename (for roots, the root token itself)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntryRef> {
        self.parent.clone()
    }

    pub fn is_symbolic_link(&self) -> bool {
        self.lock().ifmt == Ifmt::Symlink
    }

    pub fn is_directory(&self) -> bool {
        self.lock().ifmt == Ifmt::Dir
    }

    pub fn is_file(&self) -> bool {
        self.lock().ifmt == Ifmt::File
    }

    /// Never stat'd and never seen in a listing
    pub fn is_unknown(&self) -> bool {
        let st = self.lock();
        st.ifmt == Ifmt::Unknown && !st.enoent
    }

    pub fn is_enoent(&self) -> bool {
        self.lock().enoent
    }

    /// Whether a directory read here could possibly succeed
    pub fn can_readdir(&self) -> bool {
        let st = self.lock();
        !st.enochild
            && !st.enoent
            && matches!(st.ifmt, Ifmt::Unknown | Ifmt::Dir | Ifmt::Symlink)
    }

    /// Case-aware name comparison, honoring the owning cache's sensitivity
    pub fn is_named(&self, name: &str) -> bool {
        platform::eq_name(&self.name, name, self.nocase)
    }

    /// The full `/`-separated path, memoized
    pub fn fullpath(&self) -> Utf8PathBuf {
        if let Some(p) = &self.lock().fullpath {
            return p.clone();
        }
        let p = match &self.parent {
            None => Utf8PathBuf::from(&self.name),
            Some(parent) => {
                let pp = parent.fullpath();
                if pp.as_str().ends_with('/') {
                    Utf8PathBuf::from(format!("{}{}", pp, self.name))
                } else {
                    Utf8PathBuf::from(format!("{}/{}", pp, self.name))
                }
            }
        };
        self.lock().fullpath = Some(p.clone());
        p
    }

    /// Segments below the root
    pub fn depth(&self) -> usize {
        let mut d = 0;
        let mut cur = self.parent.clone();
        while let Some(e) = cur {
            d += 1;
            cur = e.parent.clone();
        }
        d
    }

    /// Resolves one path token: `""` and `"."` are this entry, `".."` is
    /// the parent (the root's parent is the root itself), anything else a
    /// child by name.
    pub fn resolve(self: &Arc<Self>, token: &str) -> EntryRef {
        match token {
            "" | "." => Arc::clone(self),
            ".." => self.parent.clone().unwrap_or_else(|| Arc::clone(self)),
            name => self.child(name),
        }
    }

    fn child(self: &Arc<Self>, name: &str) -> EntryRef {
        let mut st = self.lock();
        // prefer a confirmed entry over a provisional that turned out not
        // to exist (they can differ in case under nocase)
        if let Some(c) = st
            .children
            .iter()
            .find(|c| c.is_named(name) && !c.lock().enoent)
        {
            return Arc::clone(c);
        }
        if let Some(c) = st.children.iter().find(|c| c.is_named(name)) {
            return Arc::clone(c);
        }
        let child = Arc::new(Entry {
            name: name.to_string(),
            parent: Some(Arc::clone(self)),
            nocase: self.nocase,
            state: Mutex::new(EntryState::provisional()),
        });
        st.children.push(Arc::clone(&child));
        child
    }

    /// Lists this directory through the cache.
    ///
    /// The first call performs the read while holding the entry lock, so a
    /// concurrent second requester blocks until the listing lands and then
    /// returns it from cache. Read failures mark the entry unlistable and
    /// yield no children; the error is not propagated.
    pub fn read_children(self: &Arc<Self>) -> Vec<EntryRef> {
        let path = self.fullpath();
        let mut st = self.lock();
        if st.called_readdir {
            return listed_children(&st);
        }
        if st.enochild
            || st.enoent
            || matches!(st.ifmt, Ifmt::File | Ifmt::Other)
        {
            return Vec::new();
        }

        let rd = match fs::read_dir(path.as_std_path()) {
            Ok(rd) => rd,
            Err(_) => {
                st.enochild = true;
                st.called_readdir = true;
                return Vec::new();
            }
        };

        let before = st.children.len();
        for dirent in rd.flatten() {
            let Ok(name) = dirent.file_name().into_string() else {
                continue;
            };
            let ifmt = match dirent.file_type() {
                Ok(ft) if ft.is_symlink() => Ifmt::Symlink,
                Ok(ft) if ft.is_dir() => Ifmt::Dir,
                Ok(ft) if ft.is_file() => Ifmt::File,
                Ok(_) => Ifmt::Other,
                Err(_) => Ifmt::Unknown,
            };
            // listings confirm children by exact name; a provisional that
            // only matches in case keeps its own fate (marked missing below)
            let child = match st.children.iter().find(|c| c.name() == name) {
                Some(c) => Arc::clone(c),
                None => {
                    let c = Arc::new(Entry {
                        name,
                        parent: Some(Arc::clone(self)),
                        nocase: self.nocase,
                        state: Mutex::new(EntryState::provisional()),
                    });
                    st.children.push(Arc::clone(&c));
                    c
                }
            };
            let mut cst = child.lock();
            if ifmt != Ifmt::Unknown {
                cst.ifmt = ifmt;
            }
            cst.listed = true;
            cst.enoent = false;
        }

        // provisional children the listing did not confirm do not exist
        for c in st.children.iter().take(before) {
            let mut cst = c.lock();
            if !cst.listed {
                cst.enoent = true;
            }
        }

        st.called_readdir = true;
        if st.ifmt == Ifmt::Unknown {
            st.ifmt = Ifmt::Dir;
        }
        listed_children(&st)
    }

    /// Stats this entry without following symlinks; results are cached
    pub fn lstat(self: &Arc<Self>) {
        let path = self.fullpath();
        let mut st = self.lock();
        if st.lstat_called {
            return;
        }
        st.lstat_called = true;
        match fs::symlink_metadata(path.as_std_path()) {
            Ok(meta) => {
                let ft = meta.file_type();
                st.ifmt = if ft.is_symlink() {
                    Ifmt::Symlink
                } else if ft.is_dir() {
                    Ifmt::Dir
                } else if ft.is_file() {
                    Ifmt::File
                } else {
                    Ifmt::Other
                };
                st.listed = true;
                st.enoent = false;
            }
            Err(_) => {
                st.enoent = true;
            }
        }
    }
}

fn listed_children(st: &EntryState) -> Vec<EntryRef> {
    st.children
        .iter()
        .filter(|c| c.lock().listed)
        .cloned()
        .collect()
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entry({:?})", self.fullpath())
    }
}

/// A shared directory cache rooted at a working directory.
///
/// Holds the interning table for filesystem roots and the cwd entry chain;
/// safe to share between walks and across threads.
pub struct DirCache {
    platform: Platform,
    nocase: bool,
    cwd: Utf8PathBuf,
    roots: DashMap<String, EntryRef>,
    cwd_entry: OnceCell<EntryRef>,
}

impl DirCache {
    /// Creates a cache anchored at `cwd` (made absolute against the process
    /// working directory when relative).
    pub fn new(
        cwd: impl AsRef<Utf8Path>,
        platform: Platform,
        nocase: bool,
    ) -> Result<Self, GlobError> {
        let raw = platform::normalize_separators(platform, cwd.as_ref().as_str());
        let abs = if platform::split_root(platform, &raw).is_some() {
            raw
        } else {
            let here = std::env::current_dir()?;
            let here = Utf8PathBuf::from_path_buf(here)
                .map_err(|p| GlobError::NonUtf8Path(p.display().to_string()))?;
            let here = platform::normalize_separators(platform, here.as_str());
            if raw.is_empty() {
                here
            } else {
                format!("{}/{}", here.trim_end_matches('/'), raw)
            }
        };
        let cwd = Utf8PathBuf::from(lexical_normalize(platform, &abs));
        Ok(Self {
            platform,
            nocase,
            cwd,
            roots: DashMap::new(),
            cwd_entry: OnceCell::new(),
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Case sensitivity of name comparisons in this cache
    pub fn nocase(&self) -> bool {
        self.nocase
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// The entry for the cache's working directory
    pub fn cwd_entry(&self) -> EntryRef {
        Arc::clone(self.cwd_entry.get_or_init(|| {
            self.entry_for_abs(self.cwd.as_str())
                .unwrap_or_else(|| self.resolve_root("/"))
        }))
    }

    /// Interns the entry for a root token such as `/`, `C:/`, or
    /// `//host/share/`. Root keys fold case on Windows regardless of
    /// `nocase`.
    pub fn resolve_root(&self, root: &str) -> EntryRef {
        let key = platform::root_key(self.platform, root);
        Arc::clone(
            &self
                .roots
                .entry(key)
                .or_insert_with(|| Entry::new_root(root, self.nocase)),
        )
    }

    /// Builds the entry chain for an absolute `/`-separated path
    pub fn entry_for_abs(&self, path: &str) -> Option<EntryRef> {
        let (root, rest) = platform::split_root(self.platform, path)?;
        let mut cur = self.resolve_root(&root);
        for seg in rest.split('/').filter(|s| !s.is_empty()) {
            cur = cur.resolve(seg);
        }
        Some(cur)
    }

    /// Canonicalizes an entry, returning the entry for its real path.
    /// Unresolvable entries yield `None`. Results are cached per entry.
    pub fn realpath(&self, e: &EntryRef) -> Option<EntryRef> {
        if let Some(cached) = &e.lock().realpath {
            return cached.clone();
        }
        let resolved = fs::canonicalize(e.fullpath().as_std_path())
            .ok()
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .map(|p| platform::normalize_separators(self.platform, p.as_str()))
            .and_then(|p| self.entry_for_abs(&p));
        if let Some(r) = &resolved {
            let mut st = r.lock();
            st.listed = true;
            st.enoent = false;
        }
        e.lock().realpath = Some(resolved.clone());
        resolved
    }

    /// The path of an entry relative to the cache cwd, with `..` segments
    /// where the entry lies outside it. Entries on a different root come
    /// back absolute; the cwd itself comes back empty.
    pub fn relative_to_cwd(&self, e: &EntryRef) -> Utf8PathBuf {
        let full = e.fullpath();
        let Some((froot, fsegs)) = platform::split_root(self.platform, full.as_str()) else {
            return full;
        };
        let Some((croot, csegs)) = platform::split_root(self.platform, self.cwd.as_str()) else {
            return full;
        };
        if !platform::eq_root(self.platform, &froot, &croot) {
            return full;
        }

        let fsegs: Vec<&str> = fsegs.split('/').filter(|s| !s.is_empty()).collect();
        let csegs: Vec<&str> = csegs.split('/').filter(|s| !s.is_empty()).collect();
        let mut common = 0;
        while common < fsegs.len()
            && common < csegs.len()
            && platform::eq_name(fsegs[common], csegs[common], self.nocase)
        {
            common += 1;
        }

        let mut parts: Vec<&str> = Vec::new();
        for _ in common..csegs.len() {
            parts.push("..");
        }
        parts.extend(&fsegs[common..]);
        Utf8PathBuf::from(parts.join("/"))
    }
}

impl std::fmt::Debug for DirCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirCache")
            .field("cwd", &self.cwd)
            .field("platform", &self.platform)
            .field("nocase", &self.nocase)
            .finish()
    }
}

/// Lexically resolves `.` and `..` components of an absolute path
fn lexical_normalize(platform: Platform, abs: &str) -> String {
    let Some((root, rest)) = platform::split_root(platform, abs) else {
        return abs.to_string();
    };
    let mut stack: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    format!("{}{}", root, stack.join("/"))
}
