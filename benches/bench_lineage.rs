use btlin::{
    lineage::{EnvMap, LineageRules, extract_lineage},
    test_utils::{LINEAGE_TESTS_FILE, TestLineage, TestLineageData},
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_lineage(tests: &[(TestLineage, EnvMap)], rules: &LineageRules) {
    for (test, env) in tests {
        let _ = extract_lineage(&test.sql, &test.target, env, rules);
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let lineage_data_file =
        std::fs::read_to_string(LINEAGE_TESTS_FILE).expect("Cannot open lineage test cases");
    let test_lineage_data: TestLineageData =
        toml::from_str(&lineage_data_file).expect("Cannot parse test cases defined in toml");

    let tests = test_lineage_data
        .tests
        .into_iter()
        .map(|test| {
            let env: EnvMap = test.env_params.clone().into_iter().collect();
            (test, env)
        })
        .collect::<Vec<_>>();
    let rules = LineageRules::default();

    c.bench_function("bench lineage tests", |b| {
        b.iter(|| bench_lineage(black_box(&tests), black_box(&rules)))
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(500);
    targets = criterion_benchmark
);
criterion_main!(benches);
