use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use device_test_runner::core::filters::build_gtest_filter;
use device_test_runner::core::gtest::parse_gtest_output;
use device_test_runner::infra::command::spawn_and_capture;
use std::hint::black_box;
use tokio::runtime::Runtime;

/// Output of a suite with `tests` cases, every tenth one failing.
fn synthetic_output(tests: usize) -> Vec<String> {
    let mut lines = vec![format!("[==========] Running {tests} tests from 1 test case.")];
    for i in 0..tests {
        lines.push(format!("[ RUN      ] BenchTest.Case{i}"));
        if i % 10 == 0 {
            lines.push("bench_unittest.cc:10: Failure".to_string());
            lines.push("Value of: false".to_string());
            lines.push(format!("[  FAILED  ] BenchTest.Case{i} (3 ms)"));
        } else {
            lines.push(format!("[       OK ] BenchTest.Case{i} (1 ms)"));
        }
    }
    lines.push(format!("[==========] {tests} tests from 1 test case ran."));
    lines
}

fn bench_parse_gtest_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_gtest_output");
    for tests in [100, 1_000, 10_000] {
        let output = synthetic_output(tests);
        group.bench_with_input(BenchmarkId::from_parameter(tests), &output, |b, output| {
            b.iter(|| parse_gtest_output(black_box(output), false));
        });
    }
    group.finish();
}

fn bench_build_gtest_filter(c: &mut Criterion) {
    let disabled: Vec<String> = (0..500).map(|i| format!("Flaky{i}.*")).collect();
    c.bench_function("build_gtest_filter", |b| {
        b.iter(|| build_gtest_filter(black_box("Net.*:Url.*"), black_box(&disabled)));
    });
}

fn bench_spawn_and_capture(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    c.bench_function("spawn_and_capture", |b| {
        b.to_async(&rt).iter(|| async {
            let mut cmd = tokio::process::Command::new("echo");
            cmd.arg("bench");
            let _ = spawn_and_capture(cmd).await;
        });
    });
}

criterion_group!(
    benches,
    bench_parse_gtest_output,
    bench_build_gtest_filter,
    bench_spawn_and_capture
);
criterion_main!(benches);
