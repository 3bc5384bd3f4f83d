use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa::{dataset::DatasetBase, traits::Fit, ParamGuard};
use linfa_fastica::{whiten, Contrast, FastIca};
use ndarray::{array, concatenate};
use ndarray::{Array, Array2, Axis};
use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

fn perform_ica(size: usize, contrast: Contrast) {
    let sources_mixed = create_data(size);

    let ica = FastIca::params().contrast(contrast).random_state(42);

    let _ica = ica.fit(&DatasetBase::from(sources_mixed.view()));
}

fn perform_extraction(xw: &Array2<f64>, contrast: Contrast) {
    let params = FastIca::params()
        .contrast(contrast)
        .random_state(42)
        .check_unwrap();

    let _components = params.extract_many(xw, 2);
}

fn create_data(nsamples: usize) -> Array2<f64> {
    // Creating a sine wave signal
    let source1 = Array::linspace(0., 8., nsamples).mapv(|x| (2f64 * x).sin());

    // Creating a sawtooth signal
    let source2 = Array::linspace(0., 8., nsamples).mapv(|x| {
        let tmp = (4f64 * x).sin();
        if tmp > 0. {
            return 1.;
        }
        -1.
    });

    // Column concatenating both the signals
    let mut sources_original = concatenate![
        Axis(1),
        source1.insert_axis(Axis(1)),
        source2.insert_axis(Axis(1))
    ];

    // Adding noise to the signals
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    sources_original +=
        &Array::random_using((nsamples, 2), Uniform::new(0.0, 1.0), &mut rng).mapv(|x| x * 0.2);

    // Mixing the two signals
    let mixing = array![[1., 1.], [0.5, 2.]];
    sources_original.dot(&mixing.t())
}

fn fit_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fast ICA");
    for size in [1_000, 10_000, 100_000].iter() {
        for (name, contrast) in [("General", Contrast::General), ("Robust", Contrast::Robust)].iter() {
            group.bench_with_input(BenchmarkId::new(*name, size), size, |b, &size| {
                b.iter(|| perform_ica(size, *contrast));
            });
        }
    }
    group.finish();
}

fn whiten_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Whitening");
    for size in [1_000, 10_000, 100_000].iter() {
        let x = create_data(*size).reversed_axes();
        group.bench_with_input(BenchmarkId::new("ZCA", size), &x, |b, x| {
            b.iter(|| whiten(x));
        });
    }
    group.finish();
}

fn extraction_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Deflation");
    for size in [1_000, 10_000, 100_000].iter() {
        let xw = whiten(&create_data(*size).reversed_axes()).unwrap();
        group.bench_with_input(BenchmarkId::new("General", size), &xw, |b, xw| {
            b.iter(|| perform_extraction(xw, Contrast::General));
        });
    }
    group.finish();
}

criterion_group!(benches, fit_bench, whiten_bench, extraction_bench);
criterion_main!(benches);
