// processor.rs
//! The pure planner. Given (directory, pattern) work items it decides,
//! without touching the filesystem, which entries are already matches and
//! which (directory, pattern) subwalks must be evaluated after a listing.

use crate::dir_cache::{DirCache, EntryRef};
use crate::pattern::{Pattern, Token};
use crate::patterns::segment::SegmentMatcher;
use camino::Utf8PathBuf;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-walk memo of (directory, remaining-pattern) pairs already scheduled.
///
/// Forked processors take a copy; decisions made in a subtree never leak
/// into siblings. The memo is what keeps `**` over symlink cycles finite
/// even with `follow` on.
#[derive(Clone, Debug, Default)]
pub struct HasWalkedCache {
    store: HashMap<Utf8PathBuf, HashSet<String>>,
}

impl HasWalkedCache {
    pub fn has_walked(&self, target: &EntryRef, pattern: &Pattern) -> bool {
        self.store
            .get(&target.fullpath())
            .is_some_and(|set| set.contains(pattern.glob_string()))
    }

    pub fn store_walked(&mut self, target: &EntryRef, pattern: &Pattern) {
        self.store
            .entry(target.fullpath())
            .or_default()
            .insert(pattern.glob_string().to_string());
    }

    /// An independent copy for a forked processor
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

const ABSOLUTE: u8 = 0b10;
const IF_DIR: u8 = 0b01;

/// The set of candidate matches produced by one planner step.
///
/// Flags combine by `new & old`: a match is emitted absolute only when every
/// arrival asked for absolute, and the directory-only requirement drops as
/// soon as any unconditional arrival lands.
#[derive(Debug, Default)]
pub struct MatchRecord {
    store: HashMap<Utf8PathBuf, (EntryRef, u8)>,
}

impl MatchRecord {
    pub fn add(&mut self, target: EntryRef, absolute: bool, if_dir: bool) {
        let n = (if absolute { ABSOLUTE } else { 0 }) | (if if_dir { IF_DIR } else { 0 });
        self.store
            .entry(target.fullpath())
            .and_modify(|(_, cur)| *cur &= n)
            .or_insert((target, n));
    }

    pub fn entries(&self) -> Vec<(EntryRef, bool, bool)> {
        self.store
            .values()
            .map(|(e, n)| (Arc::clone(e), n & ABSOLUTE != 0, n & IF_DIR != 0))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

/// Per-step multimap from directory to the patterns awaiting its listing.
/// Unreadable targets (files, broken links) are silently dropped.
#[derive(Debug, Default)]
pub struct SubWalks {
    store: HashMap<Utf8PathBuf, (EntryRef, Vec<Arc<Pattern>>)>,
}

impl SubWalks {
    pub fn add(&mut self, target: EntryRef, pattern: Arc<Pattern>) {
        if !target.can_readdir() {
            return;
        }
        let slot = self
            .store
            .entry(target.fullpath())
            .or_insert_with(|| (target, Vec::new()));
        if !slot
            .1
            .iter()
            .any(|p| p.glob_string() == pattern.glob_string())
        {
            slot.1.push(pattern);
        }
    }

    pub fn get(&self, target: &EntryRef) -> Vec<Arc<Pattern>> {
        self.store
            .get(&target.fullpath())
            .map(|(_, pats)| pats.clone())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<EntryRef> {
        self.store
            .values()
            .filter(|(e, _)| e.can_readdir())
            .map(|(e, _)| Arc::clone(e))
            .collect()
    }

    pub fn entries(&self) -> Vec<(EntryRef, Vec<Arc<Pattern>>)> {
        self.store
            .values()
            .filter(|(e, _)| e.can_readdir())
            .map(|(e, pats)| (Arc::clone(e), pats.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// One planning step over a set of work items
pub struct Processor {
    pub matches: MatchRecord,
    pub subwalks: SubWalks,
    has_walked: HasWalkedCache,
    cache: Arc<DirCache>,
    dot: bool,
    follow: bool,
}

impl Processor {
    pub fn new(
        cache: Arc<DirCache>,
        dot: bool,
        follow: bool,
        walked: Option<&HasWalkedCache>,
    ) -> Self {
        Self {
            matches: MatchRecord::default(),
            subwalks: SubWalks::default(),
            has_walked: walked.map(HasWalkedCache::copy).unwrap_or_default(),
            cache,
            dot,
            follow,
        }
    }

    pub fn has_walked_cache(&self) -> &HasWalkedCache {
        &self.has_walked
    }

    /// Plans one batch of patterns against a target directory.
    ///
    /// Literal prefixes fold into the target without filesystem access as
    /// long as the cache already knows the child; an unknown child stops
    /// the fold so the walker verifies it by listing the parent. A match is
    /// never synthesized for an entry the cache has not seen.
    pub fn process_patterns(&mut self, target: &EntryRef, patterns: &[Arc<Pattern>]) {
        for original in patterns {
            let mut t = Arc::clone(target);
            let mut pattern = Arc::clone(original);
            self.has_walked.store_walked(&t, &pattern);

            let absolute = pattern.is_absolute();

            // start absolute patterns at their root
            if let Some(root) = pattern.root() {
                t = self.cache.resolve_root(root);
                match pattern.rest() {
                    None => {
                        self.matches.add(t, true, false);
                        continue;
                    }
                    Some(r) => pattern = r,
                }
            }

            if t.is_enoent() {
                continue;
            }

            // fold the literal prefix
            let mut changed = false;
            loop {
                let Token::Lit(lit) = pattern.pattern() else {
                    break;
                };
                let Some(rest) = pattern.rest() else {
                    break;
                };
                let c = t.resolve(lit);
                if c.is_unknown() && lit != ".." {
                    break;
                }
                t = c;
                pattern = rest;
                changed = true;
            }
            if changed {
                if self.has_walked.has_walked(&t, &pattern) {
                    continue;
                }
                self.has_walked.store_walked(&t, &pattern);
            }

            match pattern.pattern() {
                Token::Lit(p) => {
                    if pattern.has_more() {
                        // the fold stopped on an unknown child; the walker
                        // has to list the parent before going further
                        self.subwalks.add(t, Arc::clone(&pattern));
                    } else {
                        let if_dir = p == ".." || p.is_empty() || p == ".";
                        self.matches.add(t.resolve(p), absolute, if_dir);
                    }
                }
                Token::GlobStar => {
                    // the globstar re-applies to the subtree unless this
                    // target is a symlink it may not traverse
                    if !t.is_symbolic_link() || self.follow || pattern.check_follow_globstar() {
                        self.subwalks.add(Arc::clone(&t), Arc::clone(&pattern));
                    }
                    match pattern.rest() {
                        None => {
                            // a bare trailing ** matches files too
                            self.matches.add(t, absolute, false);
                        }
                        Some(rest) => match rest.pattern() {
                            Token::Lit(rp)
                                if (rp.is_empty() || rp == ".") && rest.rest().is_none() =>
                            {
                                self.matches.add(t, absolute, true);
                            }
                            Token::Lit(rp) if rp == ".." => {
                                let tp = t.parent().unwrap_or_else(|| Arc::clone(&t));
                                match rest.rest() {
                                    None => self.matches.add(tp, absolute, true),
                                    Some(rrest) => {
                                        if !self.has_walked.has_walked(&tp, &rrest) {
                                            self.subwalks.add(tp, rrest);
                                        }
                                    }
                                }
                            }
                            _ => {}
                        },
                    }
                }
                Token::Rx(_) => {
                    self.subwalks.add(t, Arc::clone(&pattern));
                }
            }
        }
    }

    /// The set of directories this step needs listed
    pub fn subwalk_targets(&self) -> Vec<EntryRef> {
        self.subwalks.keys()
    }

    /// Classifies the children of a listed directory against the patterns
    /// recorded for it, producing a forked child processor holding the
    /// next round of matches and subwalks.
    pub fn filter_entries(&self, parent: &EntryRef, entries: &[EntryRef]) -> Processor {
        let patterns = self.subwalks.get(parent);
        let mut results = Processor::new(
            Arc::clone(&self.cache),
            self.dot,
            self.follow,
            Some(&self.has_walked),
        );
        for e in entries {
            for pattern in &patterns {
                let absolute = pattern.is_absolute();
                match pattern.pattern() {
                    Token::GlobStar => {
                        results.test_globstar(e, pattern, pattern.rest(), absolute);
                    }
                    Token::Rx(re) => {
                        results.test_regexp(e, re, pattern.rest(), absolute);
                    }
                    Token::Lit(p) => {
                        results.test_string(e, p, pattern.rest(), absolute);
                    }
                }
            }
        }
        results
    }

    fn test_globstar(
        &mut self,
        e: &EntryRef,
        pattern: &Arc<Pattern>,
        rest: Option<Arc<Pattern>>,
        absolute: bool,
    ) {
        if self.dot || !e.name().starts_with('.') {
            if !pattern.has_more() {
                self.matches.add(Arc::clone(e), absolute, false);
            }
            if e.can_readdir() {
                if self.follow || !e.is_symbolic_link() {
                    self.subwalks.add(Arc::clone(e), Arc::clone(pattern));
                } else if let (Some(rest), true) = (&rest, pattern.check_follow_globstar()) {
                    // the link consumes the globstar: only what comes after
                    // it applies below this point
                    self.subwalks.add(Arc::clone(e), Arc::clone(rest));
                } else if pattern.mark_follow_globstar() {
                    self.subwalks.add(Arc::clone(e), Arc::clone(pattern));
                }
            }
        }

        // whatever follows the globstar may also match this entry directly
        if let Some(rest) = rest {
            match rest.pattern() {
                Token::Lit(rp) if rp == ".." => {
                    let ep = e.parent().unwrap_or_else(|| Arc::clone(e));
                    self.subwalks.add(ep, Arc::clone(&rest));
                }
                Token::Lit(rp) if !rp.is_empty() && rp != "." => {
                    self.test_string(e, rp, rest.rest(), absolute);
                }
                Token::Rx(re) => {
                    self.test_regexp(e, re, rest.rest(), absolute);
                }
                _ => {}
            }
        }
    }

    fn test_regexp(
        &mut self,
        e: &EntryRef,
        p: &SegmentMatcher,
        rest: Option<Arc<Pattern>>,
        absolute: bool,
    ) {
        if !p.is_match(e.name()) {
            return;
        }
        match rest {
            None => self.matches.add(Arc::clone(e), absolute, false),
            Some(rest) => self.subwalks.add(Arc::clone(e), rest),
        }
    }

    fn test_string(
        &mut self,
        e: &EntryRef,
        p: &str,
        rest: Option<Arc<Pattern>>,
        absolute: bool,
    ) {
        if !e.is_named(p) {
            return;
        }
        match rest {
            None => self.matches.add(Arc::clone(e), absolute, false),
            Some(rest) => self.subwalks.add(Arc::clone(e), rest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GlobOptions;
    use crate::patterns::compile_many;
    use crate::platform::Platform;

    fn setup(patterns: &[&str]) -> (Arc<DirCache>, Vec<Arc<Pattern>>) {
        let opts = GlobOptions {
            platform: Platform::Posix,
            nocase: Some(false),
            ..GlobOptions::default()
        };
        let cache = Arc::new(DirCache::new("/virtual/cwd", Platform::Posix, false).unwrap());
        let pats = compile_many(patterns, &opts).unwrap();
        (cache, pats)
    }

    fn processor(cache: &Arc<DirCache>) -> Processor {
        Processor::new(Arc::clone(cache), false, false, None)
    }

    #[test]
    fn test_match_record_and_rule() {
        let (cache, _) = setup(&[]);
        let e = cache.cwd_entry();
        let mut rec = MatchRecord::default();
        rec.add(Arc::clone(&e), true, false);
        rec.add(Arc::clone(&e), false, true);
        let entries = rec.entries();
        assert_eq!(entries.len(), 1);
        // earlier (abs, not-ifDir) and later (rel, ifDir) combine to
        // (rel, not-ifDir)
        assert!(!entries[0].1);
        assert!(!entries[0].2);
    }

    #[test]
    fn test_subwalks_dedupe_by_glob_string() {
        let (cache, pats) = setup(&["a/*.txt", "a/*.txt"]);
        let t = cache.cwd_entry();
        let mut sw = SubWalks::default();
        sw.add(Arc::clone(&t), Arc::clone(&pats[0]));
        sw.add(Arc::clone(&t), Arc::clone(&pats[1]));
        assert_eq!(sw.get(&t).len(), 1);
    }

    #[test]
    fn test_literal_with_rest_defers_to_subwalk() {
        let (cache, pats) = setup(&["a/b"]);
        let cwd = cache.cwd_entry();
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        // `a` is unknown to the cache, so nothing matches yet and the
        // pattern waits on a listing of cwd
        assert!(p.matches.is_empty());
        let targets = p.subwalk_targets();
        assert_eq!(targets.len(), 1);
        assert!(Arc::ptr_eq(&targets[0], &cwd));
    }

    #[test]
    fn test_root_pattern_matches_immediately() {
        let (cache, pats) = setup(&["/"]);
        let cwd = cache.cwd_entry();
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        let entries = p.matches.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.fullpath().as_str(), "/");
        assert!(entries[0].1);
    }

    #[test]
    fn test_bare_globstar_matches_target_and_subwalks() {
        let (cache, pats) = setup(&["**"]);
        let cwd = cache.cwd_entry();
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        let entries = p.matches.entries();
        assert_eq!(entries.len(), 1);
        assert!(Arc::ptr_eq(&entries[0].0, &cwd));
        // a bare ** matches files too
        assert!(!entries[0].2);
        assert_eq!(p.subwalk_targets().len(), 1);
    }

    #[test]
    fn test_globstar_trailing_slash_requires_dir() {
        let (cache, pats) = setup(&["**/"]);
        let cwd = cache.cwd_entry();
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        let entries = p.matches.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].2);
    }

    #[test]
    fn test_dot_dot_folds_to_parent() {
        let (cache, pats) = setup(&["../x"]);
        let cwd = cache.cwd_entry();
        let parent = cwd.resolve("..");
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        // `..` folds without a listing, leaving a final literal that is a
        // candidate match for the walker to verify by stat
        assert!(p.subwalks.is_empty());
        let entries = p.matches.entries();
        assert_eq!(entries.len(), 1);
        assert!(Arc::ptr_eq(&entries[0].0, &parent.resolve("x")));
    }

    #[test]
    fn test_has_walked_abandons_duplicates() {
        let (cache, pats) = setup(&["**"]);
        let cwd = cache.cwd_entry();
        let mut p = processor(&cache);
        p.process_patterns(&cwd, &pats);
        let walked = p.has_walked_cache().copy();
        assert!(walked.has_walked(&cwd, &pats[0]));

        let mut forked = Processor::new(Arc::clone(&cache), false, false, Some(&walked));
        // mutating the fork must not affect the original
        forked
            .has_walked
            .store_walked(&cwd.resolve("sub"), &pats[0]);
        assert!(!walked.has_walked(&cwd.resolve("sub"), &pats[0]));
    }
}
