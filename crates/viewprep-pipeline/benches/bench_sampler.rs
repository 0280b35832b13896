use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use viewprep_pipeline::sampler::{select_views, HOLDOUT_STRIDE};

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");

    for num_views in [64usize, 1024, 16384].iter() {
        let names = (0..*num_views)
            .rev()
            .map(|i| format!("IMG_{i:05}.JPG"))
            .collect::<Vec<_>>();

        group.bench_with_input(
            BenchmarkId::new("select_views", num_views),
            &names,
            |b, names| {
                b.iter(|| black_box(select_views(black_box(names), HOLDOUT_STRIDE, 24)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_sampler);
criterion_main!(benches);
