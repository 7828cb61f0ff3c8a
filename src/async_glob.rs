// async_glob.rs
//! Asynchronous walker: the same planner as the sync flavor, with the
//! directory reads of each frontier launched concurrently under a
//! semaphore cap. Results surface as a `Stream`, which also serves as the
//! async iterator flavor.

use crate::dir_cache::EntryRef;
use crate::error::GlobError;
use crate::pattern::Pattern;
use crate::processor::{HasWalkedCache, Processor};
use crate::walker::WalkContext;
use async_stream::stream;
use camino::Utf8PathBuf;
use futures::stream::StreamExt;
use futures::Stream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::{sync::Semaphore, task};

type Frontier = Vec<(EntryRef, Vec<Arc<Pattern>>, HasWalkedCache)>;

/// Creates a stream of glob matches.
///
/// Directory listings at the same depth run concurrently, capped by
/// `max_inflight`; ordering between them is not defined. An abort signal
/// lets in-flight reads drain but emits nothing further and ends the
/// stream without an error.
pub(crate) fn glob_stream(
    ctx: Arc<WalkContext>,
) -> impl Stream<Item = Result<Utf8PathBuf, GlobError>> {
    stream! {
        let inflight = ctx.opts.max_inflight.max(1);
        let semaphore = Arc::new(Semaphore::new(inflight));
        let mut seen: HashSet<Utf8PathBuf> = HashSet::new();
        let mut frontier: Frontier =
            vec![(ctx.cache.cwd_entry(), ctx.patterns.clone(), HasWalkedCache::default())];

        while !frontier.is_empty() {
            if ctx.aborted() {
                break;
            }

            // plan this frontier; planning is pure and stays on-task
            let mut processors: Vec<Processor> = Vec::new();
            let mut reads: Vec<(usize, EntryRef)> = Vec::new();
            for (target, patterns, walked) in frontier.drain(..) {
                if ctx.children_ignored(&target) {
                    continue;
                }
                let mut processor = Processor::new(
                    Arc::clone(&ctx.cache),
                    ctx.opts.dot,
                    ctx.opts.follow,
                    Some(&walked),
                );
                processor.process_patterns(&target, &patterns);
                for (e, absolute, if_dir) in processor.matches.entries() {
                    if ctx.aborted() {
                        break;
                    }
                    if let Some(fe) = ctx.match_check(e, if_dir) {
                        if seen.insert(fe.fullpath()) {
                            yield Ok(ctx.format(&fe, absolute));
                        }
                    }
                }
                let idx = processors.len();
                for t in processor.subwalk_targets() {
                    if ctx.subwalk_depth_ok(&t) {
                        reads.push((idx, t));
                    }
                }
                processors.push(processor);
            }

            // read all subwalk directories of this frontier concurrently
            let mut next: Frontier = Vec::new();
            let mut listings = futures::stream::iter(reads.into_iter().map(|(idx, t)| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let target = Arc::clone(&t);
                    let entries = task::spawn_blocking(move || target.read_children())
                        .await
                        .unwrap_or_default();
                    (idx, t, entries)
                }
            }))
            .buffer_unordered(inflight);

            while let Some((idx, target, entries)) = listings.next().await {
                if ctx.aborted() {
                    // keep draining so in-flight reads settle, but emit
                    // nothing more
                    continue;
                }
                let child = processors[idx].filter_entries(&target, &entries);
                for (e, absolute, if_dir) in child.matches.entries() {
                    if ctx.aborted() {
                        break;
                    }
                    if let Some(fe) = ctx.match_check(e, if_dir) {
                        if seen.insert(fe.fullpath()) {
                            yield Ok(ctx.format(&fe, absolute));
                        }
                    }
                }
                for (next_target, next_patterns) in child.subwalks.entries() {
                    next.push((next_target, next_patterns, child.has_walked_cache().copy()));
                }
            }
            drop(listings);

            frontier = next;
        }
    }
}

/// Collects the stream into a list of paths
pub(crate) async fn walk_paths(ctx: Arc<WalkContext>) -> Result<Vec<Utf8PathBuf>, GlobError> {
    let stream = glob_stream(ctx);
    futures::pin_mut!(stream);
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item?);
    }
    Ok(out)
}
