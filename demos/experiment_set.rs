//! Experiment Set: building and navigating benchmark results
//!
//! This example walks through the whole builder protocol for a tiny
//! traveling-salesman study: two dimensions, two instances with features,
//! two algorithm configurations with parameters, and a few runs each.
//!
//! The compiled set is then navigated: settings, run columns, an attribute,
//! and the error raised by an out-of-order call.
//!
//! Run with: cargo run --example experiment_set

use anyhow::{Context, Result};
use optbench::attribute::{Attributable, Attribute};
use optbench::builder::ExperimentSetContext;
use optbench::config::BuilderConfig;
use optbench::data::{DimensionDirection, DimensionType, Number, Parser};
use optbench::graph::Run;

/// Objective value reached at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FinalLength;

impl Attribute<Run> for FinalLength {
    type Output = i64;

    fn compute(&self, run: &Run) -> Option<i64> {
        run.last().and_then(|p| p.get(1)).and_then(Number::as_i64)
    }
}

const RUNS: [(&str, &str, &[&str]); 4] = [
    ("2-opt", "att48", &["1 40000", "120 35210", "900 33950"]),
    ("2-opt", "eil51", &["1 720", "80 512", "400 446"]),
    ("or-opt", "att48", &["1 40000", "300 34102", "2400 33522"]),
    ("or-opt", "eil51", &["1 720", "150 470", "1100 426"]),
];

fn main() -> Result<()> {
    optbench::logging::init("info");

    println!("=== optbench: Experiment Set Builder ===\n");

    let config = BuilderConfig::from_json(r#"{"generalize_missing_parameters": true}"#)?;
    let root = ExperimentSetContext::with_config(config);

    println!("Phase 1: dimensions");
    for (name, parser, kind, direction) in [
        (
            "fes",
            "long[1,1000000]",
            DimensionType::FunctionEvaluations,
            DimensionDirection::IncreasingStrictly,
        ),
        (
            "length",
            "int[0,1000000]",
            DimensionType::QualityProblemDependent,
            DimensionDirection::Decreasing,
        ),
    ] {
        let dim = root.create_dimension()?;
        dim.set_name(name)?;
        dim.set_parser(parser.parse::<Parser>()?)?;
        dim.set_type(kind)?;
        dim.set_direction(direction)?;
        dim.close()?;
        println!("  {name}: {parser}, {kind}, {direction}");
    }

    println!("\nPhase 2: instances");
    for (name, cities, optimum) in [("att48", 48, 33522), ("eil51", 51, 426)] {
        let instance = root.create_instance()?;
        instance.set_name(name)?;
        instance.set_feature_value("n", cities)?;
        instance.set_feature_value("symmetric", true)?;
        instance.set_lower_bound("length", optimum)?;
        instance.close()?;
        println!("  {name}: n={cities}, optimum={optimum}");
    }

    println!("\nPhase 3: experiments");
    for algorithm in ["2-opt", "or-opt"] {
        let experiment = root.create_experiment()?;
        experiment.set_name(algorithm)?;
        experiment.set_parameter_value("neighborhood", algorithm)?;
        if algorithm == "or-opt" {
            experiment.set_parameter_value("segment", 3)?;
        }
        for (_, instance, points) in RUNS.iter().filter(|(a, _, _)| *a == algorithm) {
            let irs = experiment.create_instance_runs()?;
            irs.set_instance(instance)?;
            let run = irs.create_run()?;
            for point in *points {
                run.add_data_point(point)?;
            }
            run.close()?;
            irs.close()?;
        }
        experiment.close()?;
        println!("  {algorithm}: closed");
    }

    let set = root.close().context("compiling the experiment set")?;
    println!(
        "\nCompiled at {}: {} experiments, {} runs, {} points\n",
        set.compiled_at().format("%Y-%m-%d %H:%M:%S"),
        set.experiments().len(),
        set.run_count(),
        set.point_count()
    );

    println!("=== Settings ===");
    for instance in set.instances().iter() {
        println!("  instance {:<8} {}", instance.name(), instance.features());
    }
    for experiment in set.experiments() {
        println!("  experiment {:<6} {}", experiment.name(), experiment.parameters());
    }

    println!("\n=== Runs ===");
    let length = set.dimension("length")?;
    for experiment in set.experiments() {
        for irs in experiment.instance_runs() {
            let instance = set.instance_of(irs).context("instance back-reference")?;
            for run in irs.runs() {
                let best = run.get(&FinalLength)?;
                println!(
                    "  {} {} on {:<6} final length {:>6} (storage {}, column {:?})",
                    run.id(),
                    experiment.name(),
                    instance.name(),
                    best,
                    length.storage(),
                    run.column_values(length)
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                );
            }
        }
    }

    println!("\n=== Poka-Yoke ===");
    let late = ExperimentSetContext::new();
    match late.create_experiment() {
        Ok(_) => println!("  unexpected: experiment before dimensions"),
        Err(e) => println!("  experiment before dimensions rejected: {e}"),
    }

    Ok(())
}
