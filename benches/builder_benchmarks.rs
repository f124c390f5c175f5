//! Builder benchmarks
//!
//! Benchmarks for experiment-set construction:
//! - Point ingestion (text parsing, monotonicity checks)
//! - Whole-set compilation, sequential and on the construction pool
//! - Attribute cache hits
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use optbench::attribute::{Attributable, Attribute};
use optbench::builder::{ConstructionPool, ExperimentSetContext};
use optbench::config::BuilderConfig;
use optbench::data::{DimensionDirection, DimensionType, Parser};
use optbench::graph::{ExperimentSet, Run};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Root with `fes` (long, strictly increasing) and `best` (double, decreasing)
/// plus `instances` instances.
fn prepared_root(config: BuilderConfig, instances: usize) -> ExperimentSetContext {
    let root = ExperimentSetContext::with_config(config);
    for (name, parser, kind, direction) in [
        (
            "fes",
            "long[1,1000000000]",
            DimensionType::FunctionEvaluations,
            DimensionDirection::IncreasingStrictly,
        ),
        (
            "best",
            "double",
            DimensionType::QualityProblemDependent,
            DimensionDirection::Decreasing,
        ),
    ] {
        let dim = root.create_dimension().unwrap();
        dim.set_name(name).unwrap();
        dim.set_parser(parser.parse::<Parser>().unwrap()).unwrap();
        dim.set_type(kind).unwrap();
        dim.set_direction(direction).unwrap();
        dim.close().unwrap();
    }
    for i in 0..instances {
        let instance = root.create_instance().unwrap();
        instance.set_name(&format!("instance-{i:03}")).unwrap();
        instance.set_feature_value("n", (i as i64 + 1) * 10).unwrap();
        instance.close().unwrap();
    }
    root
}

/// Pre-rendered point lines of an improving run
#[allow(clippy::cast_precision_loss)]
fn create_points(num_points: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fes = 0u64;
    let mut best = 1.0e6;
    (0..num_points)
        .map(|_| {
            fes += rng.gen_range(1..100);
            best -= rng.gen_range(0.0..10.0);
            format!("{fes} {best}")
        })
        .collect()
}

fn build_experiment(
    root: &ExperimentSetContext,
    name: &str,
    instances: usize,
    runs: usize,
    points: &[String],
) -> optbench::Result<()> {
    let experiment = root.create_experiment()?;
    experiment.set_name(name)?;
    for i in 0..instances {
        let irs = experiment.create_instance_runs()?;
        irs.set_instance(&format!("instance-{i:03}"))?;
        for _ in 0..runs {
            let run = irs.create_run()?;
            for point in points {
                run.add_data_point(point)?;
            }
            run.close()?;
        }
        irs.close()?;
    }
    experiment.close()
}

/// Benchmark appending points to a single run
fn bench_point_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_ingestion");

    for num_points in [100, 1_000, 10_000] {
        let points = create_points(num_points, 7);
        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            &points,
            |b, points| {
                b.iter(|| {
                    let root = prepared_root(BuilderConfig::new(), 1);
                    build_experiment(&root, "e", 1, 1, points).unwrap();
                    black_box(root.close().unwrap())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark compiling a full set, sequentially versus on the pool
fn bench_set_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_compilation");
    let points = create_points(200, 11);
    let experiments = 8;

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let root = prepared_root(BuilderConfig::new(), 4);
            for e in 0..experiments {
                build_experiment(&root, &format!("exp-{e}"), 4, 5, &points).unwrap();
            }
            black_box(root.close().unwrap())
        });
    });

    let pool = ConstructionPool::new(4).unwrap();
    group.bench_function("pool_4_threads", |b| {
        b.iter(|| {
            let root = prepared_root(BuilderConfig::new(), 4);
            pool.run_all((0..experiments).map(|e| {
                let root = &root;
                let points = &points;
                move || build_experiment(root, &format!("exp-{e}"), 4, 5, points)
            }))
            .unwrap();
            black_box(root.close().unwrap())
        });
    });

    group.finish();
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FinalQuality;

impl Attribute<Run> for FinalQuality {
    type Output = f64;

    fn compute(&self, run: &Run) -> Option<f64> {
        run.last().and_then(|p| p.get(1)).map(|v| v.as_f64())
    }
}

fn compiled_set() -> ExperimentSet {
    let root = prepared_root(BuilderConfig::new(), 2);
    build_experiment(&root, "e", 2, 10, &create_points(500, 3)).unwrap();
    root.close().unwrap()
}

/// Benchmark cached attribute lookups over all runs
fn bench_attribute_cache(c: &mut Criterion) {
    let set = compiled_set();
    for run in set.runs() {
        run.get(&FinalQuality).unwrap();
    }

    c.bench_function("attribute_cache_hit", |b| {
        b.iter(|| {
            let total: f64 = set.runs().map(|run| *run.get(&FinalQuality).unwrap()).sum();
            black_box(total)
        });
    });
}

criterion_group!(
    benches,
    bench_point_ingestion,
    bench_set_compilation,
    bench_attribute_cache
);
criterion_main!(benches);
