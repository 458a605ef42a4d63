use bucketfs::{
    Config, FilesystemBuilder, MemoryClient, MemoryObject, ObjectFilesystem, PathPrefixer,
    TraversalMode,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const BUCKET: &str = "bench-bucket";

/// Create a filesystem holding `count` objects spread over 10 subdirectories
fn populated_fs(count: usize, page_size: usize, traversal: TraversalMode) -> ObjectFilesystem<MemoryClient> {
    let fs = FilesystemBuilder::new(BUCKET)
        .prefix("bench")
        .list_page_size(page_size)
        .traversal(traversal)
        .build(MemoryClient::new())
        .unwrap();

    for i in 0..count {
        fs.client().insert_object(
            BUCKET,
            &format!("bench/data/dir-{}/file-{:06}.bin", i % 10, i),
            MemoryObject::new(vec![0u8; 16]),
        );
    }
    fs
}

/// Benchmark deep listings across page sizes
fn bench_deep_listing(c: &mut Criterion) {
    let page_sizes = vec![100, 500, 1_000];
    let count = 10_000;

    let mut group = c.benchmark_group("deep_listing");
    group.throughput(Throughput::Elements(count as u64));

    for page_size in page_sizes {
        for traversal in [TraversalMode::Flat, TraversalMode::Walk] {
            let fs = populated_fs(count, page_size, traversal);
            let id = BenchmarkId::new(format!("{:?}", traversal), page_size);

            group.bench_with_input(id, &page_size, |b, _| {
                b.iter(|| {
                    let entries = fs.list_contents("data", true).filter_map(Result::ok).count();
                    black_box(entries);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the first entry of a large listing (laziness)
fn bench_first_entry(c: &mut Criterion) {
    let fs = populated_fs(10_000, 1_000, TraversalMode::Flat);

    c.bench_function("first_entry_of_10k", |b| {
        b.iter(|| {
            let first = fs.list_contents("data", true).next();
            black_box(first);
        });
    });
}

/// Benchmark recursive delete of a populated directory
fn bench_delete_directory(c: &mut Criterion) {
    let counts = vec![1_000, 5_000];

    let mut group = c.benchmark_group("delete_directory");

    for count in counts {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_with_setup(
                || populated_fs(count, 1_000, TraversalMode::Flat),
                |fs| {
                    fs.delete_directory("data").unwrap();
                    black_box(fs);
                },
            );
        });
    }

    group.finish();
}

/// Benchmark path translation
fn bench_prefixer(c: &mut Criterion) {
    let prefixer = PathPrefixer::new("/tenants//acme/uploads/");

    c.bench_function("prefix_path", |b| {
        b.iter(|| black_box(prefixer.prefix_path(black_box("/2024//01/report.pdf"))));
    });

    c.bench_function("prefix_directory_path", |b| {
        b.iter(|| black_box(prefixer.prefix_directory_path(black_box("2024/01/"))));
    });
}

/// Benchmark small writes through the adapter
fn bench_write(c: &mut Criterion) {
    let fs = populated_fs(0, 1_000, TraversalMode::Flat);
    let payload = vec![42u8; 4096];

    c.bench_function("write_4k", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            fs.write(&format!("writes/{}.bin", i % 1_000), &payload, &Config::new())
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_deep_listing,
    bench_first_entry,
    bench_delete_directory,
    bench_prefixer,
    bench_write
);
criterion_main!(benches);
