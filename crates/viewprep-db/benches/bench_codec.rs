use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use viewprep_db::codec::{decode_matrix, encode_matrix, pair_id, Matrix};

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for num_keypoints in [1024u32, 8192, 32768].iter() {
        let data = (0..num_keypoints * 128).map(|i| i as f32).collect::<Vec<_>>();
        let matrix = Matrix::from_shape_vec(*num_keypoints, 128, data).unwrap();
        let blob = encode_matrix(&matrix);

        group.bench_with_input(
            BenchmarkId::new("encode_descriptors", num_keypoints),
            &matrix,
            |b, m| b.iter(|| black_box(encode_matrix(black_box(m)))),
        );

        group.bench_with_input(
            BenchmarkId::new("decode_descriptors", num_keypoints),
            &blob,
            |b, blob| {
                b.iter(|| black_box(decode_matrix::<f32>(&blob.data, blob.rows, blob.cols)))
            },
        );
    }

    group.bench_function("pair_id", |b| {
        b.iter(|| {
            for i in 0..1000u32 {
                black_box(pair_id(black_box(i), black_box(1000 - i)).unwrap());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
