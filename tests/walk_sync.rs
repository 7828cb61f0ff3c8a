// tests/walk_sync.rs
use camino::Utf8PathBuf;
use globhunt::{glob_sync, AbortSignal, DirCache, Glob, GlobOptions, GlobOptionsBuilder};
use std::fs::{self, File};
use std::sync::Arc;
use tempfile::TempDir;

/// Builds a fixture tree; paths ending in `/` are directories
fn build_tree(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for p in paths {
        let full = tmp.path().join(p.trim_end_matches('/'));
        if p.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            File::create(&full).unwrap();
        }
    }
    tmp
}

fn opts(tmp: &TempDir) -> GlobOptionsBuilder {
    GlobOptionsBuilder::new().cwd(Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap())
}

fn run_with(patterns: &[&str], o: GlobOptions) -> Vec<String> {
    let mut v: Vec<String> = glob_sync(patterns, o)
        .unwrap()
        .into_iter()
        .map(Utf8PathBuf::into_string)
        .collect();
    v.sort();
    v
}

fn run(tmp: &TempDir, patterns: &[&str]) -> Vec<String> {
    run_with(patterns, opts(tmp).build())
}

#[test]
fn test_globstar_extension_match() {
    let tmp = build_tree(&["a/b/c.js", "a/b/d.ts", "a/.hidden.js"]);
    assert_eq!(run(&tmp, &["**/*.js"]), vec!["a/b/c.js"]);
}

#[test]
fn test_globstar_with_dot() {
    let tmp = build_tree(&["a/b/c.js", "a/b/d.ts", "a/.hidden.js"]);
    let o = opts(&tmp).dot(true).build();
    assert_eq!(run_with(&["**/*.js"], o), vec!["a/.hidden.js", "a/b/c.js"]);
}

#[test]
fn test_brace_sets_across_patterns() {
    let tmp = build_tree(&["css/x.png", "public/y.jpeg", "css/z.txt"]);
    assert_eq!(
        run(&tmp, &["css/*.{png,jpeg}", "public/*.{png,jpeg}"]),
        vec!["css/x.png", "public/y.jpeg"]
    );
}

#[test]
fn test_trailing_slash_requires_directory() {
    let tmp = build_tree(&["a/b/c/.keep", "a/f/"]);
    File::create(tmp.path().join("a/x")).unwrap();
    // `a/*/c/` must not match through the file `a/x`
    assert_eq!(run(&tmp, &["a/*/c/"]), vec!["a/b/c"]);
}

#[test]
fn test_trailing_slash_entries_are_directories() {
    let tmp = build_tree(&["a/b/c/.keep"]);
    let glob = Glob::new(&["a/*/c/"], opts(&tmp).build()).unwrap();
    let entries = glob.entries_sync().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_directory());
    assert!(entries[0].is_named("c"));
}

#[test]
fn test_ignore_prunes_everything() {
    let tmp = build_tree(&["src/f.txt"]);
    let o = opts(&tmp).ignore(["src/**"]).build();
    assert!(run_with(&["**/*.txt"], o).is_empty());
}

#[test]
fn test_ignore_leaves_siblings() {
    let tmp = build_tree(&["src/f.txt", "docs/g.txt"]);
    let o = opts(&tmp).ignore(["src/**"]).build();
    assert_eq!(run_with(&["**/*.txt"], o), vec!["docs/g.txt"]);
}

#[test]
fn test_each_path_at_most_once() {
    let tmp = build_tree(&["foo.txt"]);
    // both patterns and both globstar arms reach the same file
    let results = run(&tmp, &["*.txt", "foo.*", "**/foo.txt"]);
    assert_eq!(results, vec!["foo.txt"]);
}

#[test]
fn test_nodir_excludes_directories() {
    let tmp = build_tree(&["src/lib/helper.js", "src/main.js"]);
    let o = opts(&tmp).nodir(true).build();
    let results = run_with(&["**"], o);
    assert_eq!(results, vec!["src/lib/helper.js", "src/main.js"]);
}

#[test]
fn test_mark_suffixes_directories_only() {
    let tmp = build_tree(&["dir/inner.txt", "file.txt"]);
    let o = opts(&tmp).mark(true).build();
    let results = run_with(&["*"], o);
    assert_eq!(results, vec!["dir/", "file.txt"]);
}

#[test]
fn test_absolute_results() {
    let tmp = build_tree(&["x.txt"]);
    let o = opts(&tmp).absolute(true).build();
    let results = run_with(&["*.txt"], o);
    assert_eq!(results.len(), 1);
    assert!(results[0].starts_with('/'));
    assert!(results[0].ends_with("x.txt"));
}

#[test]
fn test_absolute_pattern_emits_absolute_paths() {
    let tmp = build_tree(&["x.txt"]);
    let abs_pattern = format!(
        "{}/*.txt",
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
    );
    let results = run(&tmp, &[&abs_pattern]);
    assert_eq!(results.len(), 1);
    assert!(results[0].starts_with('/'));
}

#[test]
fn test_match_base() {
    let tmp = build_tree(&["a/b/c.js", "top.js"]);
    let o = opts(&tmp).match_base(true).build();
    assert_eq!(run_with(&["*.js"], o), vec!["a/b/c.js", "top.js"]);
}

#[test]
fn test_nocase_walks_real_casing() {
    let tmp = build_tree(&["A/B/C.txt"]);
    let o = opts(&tmp).nocase(true).build();
    assert_eq!(run_with(&["a/b/c*"], o), vec!["A/B/C.txt"]);
}

#[test]
fn test_case_sensitive_by_default_misses() {
    let tmp = build_tree(&["A/B/C.txt"]);
    let o = opts(&tmp).nocase(false).build();
    assert!(run_with(&["a/b/c*"], o).is_empty());
}

#[test]
fn test_bare_globstar_includes_cwd() {
    let tmp = build_tree(&["f.txt", "d/"]);
    let results = run(&tmp, &["**"]);
    assert_eq!(results, vec![".", "d", "f.txt"]);
}

#[test]
fn test_star_slash_matches_directories_only() {
    let tmp = build_tree(&["file.txt", "dir/"]);
    assert_eq!(run(&tmp, &["*/"]), vec!["dir"]);
}

#[test]
fn test_no_match_is_empty_not_literal() {
    let tmp = build_tree(&["a.txt"]);
    assert!(run(&tmp, &["nope*"]).is_empty());
}

#[test]
fn test_iter_sync_streams_same_results() {
    let tmp = build_tree(&["a/b/c.js", "d.js", "e.ts"]);
    let glob = Glob::new(&["**/*.js"], opts(&tmp).build()).unwrap();
    let mut streamed: Vec<String> = glob.iter_sync().map(Utf8PathBuf::into_string).collect();
    streamed.sort();
    let mut collected: Vec<String> = glob
        .walk_sync()
        .unwrap()
        .into_iter()
        .map(Utf8PathBuf::into_string)
        .collect();
    collected.sort();
    assert_eq!(streamed, collected);
    assert_eq!(streamed, vec!["a/b/c.js", "d.js"]);
}

#[test]
fn test_pre_aborted_signal_yields_nothing() {
    let tmp = build_tree(&["a/b/c.js"]);
    let signal = AbortSignal::new();
    signal.abort();
    let o = opts(&tmp).signal(signal).build();
    assert!(run_with(&["**/*.js"], o).is_empty());
}

#[test]
fn test_max_depth_bounds_traversal() {
    let tmp = build_tree(&["top.js", "a/mid.js", "a/b/deep.js"]);
    let o = opts(&tmp).max_depth(1).build();
    assert_eq!(run_with(&["**/*.js"], o), vec!["top.js"]);
    let o = opts(&tmp).max_depth(2).build();
    assert_eq!(run_with(&["**/*.js"], o), vec!["a/mid.js", "top.js"]);
}

#[test]
fn test_shared_cache_is_idempotent_without_rereads() {
    let tmp = build_tree(&["a/one.txt", "a/two.txt"]);
    let cwd = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let cache = Arc::new(
        DirCache::new(cwd, globhunt::Platform::native(), false).unwrap(),
    );
    let o = GlobOptionsBuilder::new()
        .nocase(false)
        .scurry(Arc::clone(&cache))
        .build();

    let first = run_with(&["a/*.txt"], o.clone());
    // mutate the tree after the first walk: a cached cache must not notice
    fs::remove_file(tmp.path().join("a/one.txt")).unwrap();
    let second = run_with(&["a/*.txt"], o);
    assert_eq!(first, second);
    assert_eq!(first, vec!["a/one.txt", "a/two.txt"]);
}

#[test]
fn test_dot_dot_pattern() {
    let tmp = build_tree(&["sub/inner.txt", "top.txt"]);
    let o = opts(&tmp)
        .cwd(
            Utf8PathBuf::from_path_buf(tmp.path().join("sub"))
                .unwrap(),
        )
        .build();
    assert_eq!(run_with(&["../*.txt"], o), vec!["../top.txt"]);
}

#[test]
fn test_invalid_config_rejected() {
    let o = GlobOptionsBuilder::new()
        .absolute(true)
        .with_file_types(true)
        .build();
    assert!(Glob::new(&["*"], o).is_err());

    let o = GlobOptionsBuilder::new()
        .match_base(true)
        .noglobstar(true)
        .build();
    assert!(Glob::new(&["*"], o).is_err());
}

#[test]
fn test_scurry_nocase_mismatch_rejected() {
    let tmp = build_tree(&[]);
    let cwd = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let cache = Arc::new(
        DirCache::new(cwd, globhunt::Platform::native(), true).unwrap(),
    );
    let o = GlobOptionsBuilder::new()
        .nocase(false)
        .scurry(cache)
        .build();
    assert!(Glob::new(&["*"], o).is_err());
}

#[test]
fn test_unreadable_directory_reads_empty() {
    let tmp = build_tree(&["ok/f.txt"]);
    // a pattern through a nonexistent directory finds nothing and the walk
    // carries on to other patterns
    let results = run(&tmp, &["missing/*.txt", "ok/*.txt"]);
    assert_eq!(results, vec!["ok/f.txt"]);
}

#[test]
fn test_extglob_segments() {
    let tmp = build_tree(&["foo.js", "bar.js", "baz.js"]);
    assert_eq!(run(&tmp, &["@(foo|bar).js"]), vec!["bar.js", "foo.js"]);
    assert_eq!(run(&tmp, &["!(foo).js"]), vec!["bar.js", "baz.js"]);
}

#[test]
fn test_character_classes() {
    let tmp = build_tree(&["f1.txt", "f2.txt", "fx.txt"]);
    assert_eq!(run(&tmp, &["f[0-9].txt"]), vec!["f1.txt", "f2.txt"]);
    assert_eq!(run(&tmp, &["f[[:digit:]].txt"]), vec!["f1.txt", "f2.txt"]);
}

#[test]
fn test_literal_dotfile_pattern_matches() {
    let tmp = build_tree(&[".config/app.toml"]);
    // explicit dot-prefixed literals bypass dot gating
    assert_eq!(run(&tmp, &[".config/*.toml"]), vec![".config/app.toml"]);
}

#[test]
fn test_noglobstar_treats_doublestar_as_star() {
    let tmp = build_tree(&["top.js", "a/deep.js"]);
    let o = opts(&tmp).noglobstar(true).build();
    assert_eq!(run_with(&["**/*.js"], o), vec!["a/deep.js"]);
}
