// sync.rs
//! Synchronous walker: single-threaded, blocking directory reads, driven
//! lazily so the iterator flavor streams results as the frontier advances.

use crate::dir_cache::EntryRef;
use crate::error::GlobError;
use crate::processor::{HasWalkedCache, Processor};
use crate::walker::WalkContext;
use crate::pattern::Pattern;
use camino::Utf8PathBuf;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

struct SyncJob {
    target: EntryRef,
    patterns: Vec<Arc<Pattern>>,
    walked: HasWalkedCache,
}

/// A lazily driven synchronous walk; yields result paths as an `Iterator`.
///
/// The cancellation signal is observed between directory reads and before
/// each emitted match; an aborted walk simply ends.
pub struct SyncWalk {
    ctx: Arc<WalkContext>,
    jobs: VecDeque<SyncJob>,
    ready: VecDeque<(EntryRef, bool)>,
    seen: HashSet<Utf8PathBuf>,
}

impl SyncWalk {
    pub(crate) fn new(ctx: Arc<WalkContext>) -> Self {
        let mut jobs = VecDeque::new();
        jobs.push_back(SyncJob {
            target: ctx.cache.cwd_entry(),
            patterns: ctx.patterns.clone(),
            walked: HasWalkedCache::default(),
        });
        Self {
            ctx,
            jobs,
            ready: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    fn harvest(&mut self, processor: &Processor) {
        for (e, absolute, if_dir) in processor.matches.entries() {
            if self.ctx.aborted() {
                return;
            }
            if let Some(fe) = self.ctx.match_check(e, if_dir) {
                if self.seen.insert(fe.fullpath()) {
                    self.ready.push_back((fe, absolute));
                }
            }
        }
    }

    /// Advances the walk until the next finalized match is available
    pub(crate) fn next_match(&mut self) -> Option<(EntryRef, bool)> {
        loop {
            if self.ctx.aborted() {
                self.jobs.clear();
                self.ready.clear();
                return None;
            }
            if let Some(m) = self.ready.pop_front() {
                return Some(m);
            }
            let job = self.jobs.pop_front()?;
            if self.ctx.children_ignored(&job.target) {
                continue;
            }

            let mut processor = Processor::new(
                Arc::clone(&self.ctx.cache),
                self.ctx.opts.dot,
                self.ctx.opts.follow,
                Some(&job.walked),
            );
            processor.process_patterns(&job.target, &job.patterns);
            self.harvest(&processor);

            for target in processor.subwalk_targets() {
                if self.ctx.aborted() {
                    break;
                }
                if !self.ctx.subwalk_depth_ok(&target) {
                    continue;
                }
                let entries = target.read_children();
                let child = processor.filter_entries(&target, &entries);
                self.harvest(&child);
                for (next_target, next_patterns) in child.subwalks.entries() {
                    self.jobs.push_back(SyncJob {
                        target: next_target,
                        patterns: next_patterns,
                        walked: child.has_walked_cache().copy(),
                    });
                }
            }
        }
    }
}

impl Iterator for SyncWalk {
    type Item = Utf8PathBuf;

    fn next(&mut self) -> Option<Utf8PathBuf> {
        let (e, absolute) = self.next_match()?;
        Some(self.ctx.format(&e, absolute))
    }
}

/// Collects all matches as formatted paths
pub(crate) fn walk_paths(ctx: Arc<WalkContext>) -> Result<Vec<Utf8PathBuf>, GlobError> {
    Ok(SyncWalk::new(ctx).collect())
}

/// Collects all matches as entry handles (the `with_file_types` shape)
pub(crate) fn walk_entries(ctx: Arc<WalkContext>) -> Result<Vec<EntryRef>, GlobError> {
    let mut walk = SyncWalk::new(ctx);
    let mut out = Vec::new();
    while let Some((e, _)) = walk.next_match() {
        out.push(e);
    }
    Ok(out)
}
