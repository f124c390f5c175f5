//! Parallel Runs: populating sibling contexts on the construction pool
//!
//! This example simulates a random-search study: every experiment is built
//! on its own worker of a `ConstructionPool`, and each produces several
//! randomly generated, improving runs per instance. Afterwards the soft
//! attribute cache is exercised and purged.
//!
//! Run with: cargo run --example parallel_runs

use anyhow::Result;
use optbench::attribute::{Attributable, Attribute, StoragePolicy};
use optbench::builder::{ConstructionPool, ExperimentSetContext};
use optbench::config::BuilderConfig;
use optbench::data::{DimensionDirection, DimensionType, Parser};
use optbench::graph::Run;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const INSTANCES: usize = 6;
const RUNS: usize = 10;
const POINTS: usize = 500;

/// Area under the best-so-far curve, kept in the soft cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QualityArea;

impl Attribute<Run> for QualityArea {
    type Output = f64;

    fn storage(&self) -> StoragePolicy {
        StoragePolicy::Soft
    }

    fn compute(&self, run: &Run) -> Option<f64> {
        let points: Vec<(f64, f64)> = run
            .points()
            .filter_map(|p| Some((p.get(0)?.as_f64(), p.get(1)?.as_f64())))
            .collect();
        Some(
            points
                .windows(2)
                .map(|w| (w[1].0 - w[0].0) * w[0].1)
                .sum(),
        )
    }
}

fn build_experiment(root: &ExperimentSetContext, seed: u64) -> optbench::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let experiment = root.create_experiment()?;
    experiment.set_name(&format!("random-search-{seed:02}"))?;
    experiment.set_parameter_value("seed", i64::try_from(seed).unwrap_or(i64::MAX))?;
    experiment.set_parameter_value("step", rng.gen_range(1..=4i64) * 25)?;

    for instance in 0..INSTANCES {
        let irs = experiment.create_instance_runs()?;
        irs.set_instance(&format!("f{instance}"))?;
        for _ in 0..RUNS {
            let run = irs.create_run()?;
            let mut fes = 0u32;
            let mut best = 1.0f32;
            for _ in 0..POINTS {
                fes += rng.gen_range(1..50);
                best *= rng.gen_range(0.9..1.0f32);
                run.add_data_point(&format!("{fes} {best}"))?;
            }
            run.close()?;
        }
        irs.close()?;
    }
    experiment.close()
}

fn main() -> Result<()> {
    optbench::logging::init("warn");

    println!("=== optbench: Parallel Construction ===\n");

    let config = BuilderConfig::new()
        .worker_threads(4)
        .prune_redundant_points(true);
    let root = ExperimentSetContext::with_config(config);

    for (name, parser, kind, direction) in [
        (
            "fes",
            "int[1,2147483647]",
            DimensionType::FunctionEvaluations,
            DimensionDirection::IncreasingStrictly,
        ),
        (
            "error",
            "float[0,1]",
            DimensionType::QualityProblemIndependent,
            DimensionDirection::Decreasing,
        ),
    ] {
        let dim = root.create_dimension()?;
        dim.set_name(name)?;
        dim.set_parser(parser.parse::<Parser>()?)?;
        dim.set_type(kind)?;
        dim.set_direction(direction)?;
        dim.close()?;
    }
    for i in 0..INSTANCES {
        let instance = root.create_instance()?;
        instance.set_name(&format!("f{i}"))?;
        instance.set_feature_value("dimension", 2 << i)?;
        instance.close()?;
    }

    let pool = ConstructionPool::from_config(root.config())?;
    println!("Workers: {}", pool.threads());

    let start = Instant::now();
    let root_ref = &root;
    pool.run_all((0..8u64).map(|seed| move || build_experiment(root_ref, seed)))?;
    let set = root.close()?;
    println!(
        "Built {} experiments / {} runs / {} points in {:.2?}",
        set.experiments().len(),
        set.run_count(),
        set.point_count(),
        start.elapsed()
    );
    println!(
        "Storage: {}",
        set.dimensions()
            .iter()
            .map(|d| format!("{}={}", d.name(), d.storage()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\n=== Quality area per experiment ===");
    for experiment in set.experiments() {
        let areas = experiment
            .runs()
            .map(|run| run.get(&QualityArea).map(|a| *a))
            .collect::<optbench::Result<Vec<_>>>()?;
        #[allow(clippy::cast_precision_loss)]
        let mean = areas.iter().sum::<f64>() / areas.len() as f64;
        println!("  {:<18} {}  mean area {mean:>10.2}", experiment.name(), experiment.parameters());
    }

    let purged = set.purge_soft_attributes();
    println!("\nPurged {purged} soft attribute values");

    Ok(())
}
