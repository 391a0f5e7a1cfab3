use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dc_logit::synthetic::{cross_nested_structure, nested_structure, utilities};
use dc_logit::{CrossNestedLogit, MultinomialLogit, NestedLogit};
use std::hint::black_box;

fn bench_logit(c: &mut Criterion) {
    let mut group = c.benchmark_group("logit");
    for &(alternatives, nests) in &[(10u32, 3u32), (100, 10), (1000, 25)] {
        let u = utilities(alternatives);
        let id = format!("{alternatives}x{nests}");

        group.bench_with_input(BenchmarkId::new("multinomial", &id), &u, |b, u| {
            b.iter(|| black_box(MultinomialLogit.probabilities(u).unwrap()))
        });

        let nested =
            NestedLogit::new(nested_structure::<()>(alternatives, nests).unwrap()).unwrap();
        group.bench_with_input(BenchmarkId::new("nested", &id), &u, |b, u| {
            b.iter(|| black_box(nested.probabilities(u, &()).unwrap()))
        });

        let cross =
            CrossNestedLogit::new(cross_nested_structure::<()>(alternatives, nests).unwrap());
        group.bench_with_input(BenchmarkId::new("cross_nested", &id), &u, |b, u| {
            b.iter(|| black_box(cross.probabilities(u, &()).unwrap()))
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let nested = NestedLogit::new(nested_structure::<()>(100, 10).unwrap()).unwrap();
    let inputs: Vec<_> = (0..256).map(|_| utilities(100)).collect();
    c.bench_function("nested_batch_256x100", |b| {
        b.iter(|| black_box(nested.probabilities_batch(&inputs, &())))
    });
}

criterion_group!(benches, bench_logit, bench_batch);
criterion_main!(benches);
