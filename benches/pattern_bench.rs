// benches/pattern_bench.rs
use camino::Utf8PathBuf;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use globhunt::{Glob, GlobOptions, GlobOptionsBuilder};
use std::fs::{self, File};
use tempfile::TempDir;

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for d in 0..10 {
        let dir = tmp.path().join(format!("dir{}", d)).join("nested");
        fs::create_dir_all(&dir).unwrap();
        for f in 0..10 {
            File::create(dir.join(format!("file{}.rs", f))).unwrap();
            File::create(dir.join(format!("file{}.txt", f))).unwrap();
        }
    }
    tmp
}

fn bench_opts(tmp: &TempDir) -> GlobOptions {
    GlobOptionsBuilder::new()
        .cwd(Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap())
        .build()
}

fn bench_compile(c: &mut Criterion) {
    let tmp = fixture();
    let opts = bench_opts(&tmp);

    c.bench_function("compile_patterns", |b| {
        b.iter(|| {
            let glob = Glob::new(
                black_box(&["src/**/*.@(rs|toml)", "test/*.{rs,json,toml}"]),
                black_box(opts.clone()),
            );
            black_box(glob.unwrap())
        })
    });
}

fn bench_walk_literal(c: &mut Criterion) {
    let tmp = fixture();
    let opts = bench_opts(&tmp);
    let glob = Glob::new(&["dir3/nested/file7.rs"], opts).unwrap();

    c.bench_function("walk_literal", |b| {
        b.iter(|| black_box(glob.walk_sync().unwrap()))
    });
}

fn bench_walk_globstar(c: &mut Criterion) {
    let tmp = fixture();
    let opts = bench_opts(&tmp);
    let glob = Glob::new(&["**/*.rs"], opts).unwrap();

    c.bench_function("walk_globstar", |b| {
        b.iter(|| black_box(glob.walk_sync().unwrap()))
    });
}

#[cfg(feature = "async")]
fn bench_async_walk(c: &mut Criterion) {
    use tokio::runtime::Runtime;

    let tmp = fixture();
    let opts = bench_opts(&tmp);
    let glob = Glob::new(&["**/*.rs"], opts).unwrap();
    let rt = Runtime::new().unwrap();

    c.bench_function("async_walk", |b| {
        b.iter(|| rt.block_on(async { black_box(glob.walk().await.unwrap()) }))
    });
}

#[cfg(not(feature = "async"))]
criterion_group!(
    benches,
    bench_compile,
    bench_walk_literal,
    bench_walk_globstar
);

#[cfg(feature = "async")]
criterion_group!(
    benches,
    bench_compile,
    bench_walk_literal,
    bench_walk_globstar,
    bench_async_walk
);

criterion_main!(benches);
