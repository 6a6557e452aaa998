use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use owchcca_kem::params::{calculate_parameters, SecurityLevel};
use owchcca_kem::primes::NttFriendlyPrimeGenerator;

fn params_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("params");

    for level in [
        SecurityLevel::Bits16,
        SecurityLevel::Bits32,
        SecurityLevel::Bits64,
    ] {
        group.bench_with_input(
            BenchmarkId::new("calculate", level.bits()),
            &level,
            |b, &level| {
                b.iter(|| calculate_parameters(level).unwrap());
            },
        );
    }

    group.bench_function("downstream_prime_61bit", |b| {
        b.iter(|| {
            let mut generator = NttFriendlyPrimeGenerator::new(61, 2 * 8192).unwrap();
            generator.next_downstream_prime().unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, params_benchmark);
criterion_main!(benches);
