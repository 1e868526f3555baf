// Training cost per model family on a synthetic cohort of realistic size.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nexus::encode::{DependentsColumn, FeatureEncoder, FeatureSchema, Region, Sex, SmokerStatus, Subject};
use nexus::ModelKind;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

// --- Benchmark Tuning Parameters ---

/// Rows per training set; the engine never trains on more than this by default.
const SAMPLE_ROWS: [usize; 3] = [500, 2000, 5000];

fn synthetic_design(n: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1_500.0).unwrap();
    let subjects: Vec<Subject> = (0..n)
        .map(|_| Subject {
            age: rng.gen_range(18.0..90.0),
            bmi: rng.gen_range(16.0..45.0),
            sex: if rng.gen_bool(0.5) { Sex::Male } else { Sex::Female },
            smoker: match rng.gen_range(0..10) {
                0 | 1 => SmokerStatus::Current,
                2 => SmokerStatus::Former,
                _ => SmokerStatus::Never,
            },
            region: Some(Region::ALL[rng.gen_range(0..4)]),
            dependents: rng.gen_range(0..5) as f64,
        })
        .collect();
    let y = subjects
        .iter()
        .map(|s| {
            2_000.0 + 250.0 * s.age + 300.0 * (s.bmi - 20.0) + 5_000.0 * s.smoker.code()
                + noise.sample(&mut rng)
        })
        .collect();
    let encoder = FeatureEncoder::new(FeatureSchema::new(DependentsColumn::Children));
    (encoder.encode_all(&subjects), y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    group.sample_size(10);

    for &rows in &SAMPLE_ROWS {
        let (x, y) = synthetic_design(rows);
        group.throughput(Throughput::Elements(rows as u64));
        for kind in ModelKind::ALL {
            // Kernel and neighbour fits are quadratic in rows.
            if rows > 2000 && kind.requires_scaling() {
                continue;
            }
            group.bench_with_input(BenchmarkId::new(kind.to_string(), rows), &rows, |b, _| {
                b.iter(|| {
                    let mut model = kind.build(42);
                    model.fit(black_box(x.view()), black_box(y.view())).unwrap();
                    model
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_training);
criterion_main!(benches);
