//! Builder protocol integration tests
//!
//! Toyota Way: Poka-Yoke (every out-of-order call must be rejected)

use optbench::builder::{ContextState, ExperimentSetContext};
use optbench::config::BuilderConfig;
use optbench::data::{DimensionDirection, DimensionType, Number, NumericType, Parser};
use optbench::{Error, ErrorKind};

fn declare_dimension(
    root: &ExperimentSetContext,
    name: &str,
    parser: &str,
    dimension_type: DimensionType,
    direction: DimensionDirection,
) {
    let dim = root.create_dimension().unwrap();
    dim.set_name(name).unwrap();
    dim.set_parser(parser.parse::<Parser>().unwrap()).unwrap();
    dim.set_type(dimension_type).unwrap();
    dim.set_direction(direction).unwrap();
    dim.close().unwrap();
}

/// `dimA` (strictly increasing integer) and `dimF` (decreasing double).
fn scenario_dimensions(root: &ExperimentSetContext) {
    declare_dimension(
        root,
        "dimA",
        "int",
        DimensionType::FunctionEvaluations,
        DimensionDirection::IncreasingStrictly,
    );
    declare_dimension(
        root,
        "dimF",
        "double",
        DimensionType::QualityProblemDependent,
        DimensionDirection::Decreasing,
    );
}

fn scenario_instance(root: &ExperimentSetContext) {
    let instance = root.create_instance().unwrap();
    instance.set_name("First Instance").unwrap();
    instance.close().unwrap();
}

#[test]
fn test_scenario_single_run() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("First Experiment").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    for point in ["10 20", "11 19", "15 15"] {
        run.add_data_point(point).unwrap();
    }
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();

    let set = root.close().unwrap();
    assert_eq!(root.state(), ContextState::Closed);
    assert_eq!(set.experiments().len(), 1);
    let experiment = set.experiment("First Experiment").unwrap();
    assert_eq!(experiment.instance_runs().len(), 1);
    let irs = &experiment.instance_runs()[0];
    assert_eq!(irs.len(), 1);
    assert_eq!(set.instance_of(irs).unwrap().name(), "First Instance");

    let run = &irs.runs()[0];
    assert_eq!(run.len(), 3);
    let dim_a = set.dimension("dimA").unwrap();
    assert_eq!(dim_a.storage(), NumericType::Int);
    assert_eq!(
        run.column_values(dim_a),
        vec![Number::Long(10), Number::Long(11), Number::Long(15)]
    );
    assert_eq!(run.point(1).unwrap().get(1), Some(Number::Double(19.0)));
    assert_eq!(run.last().unwrap().to_string(), "15 15");
}

#[test]
fn test_append_after_run_closed() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("First Experiment").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    for point in ["10 20", "11 19", "15 15"] {
        run.add_data_point(point).unwrap();
    }
    run.close().unwrap();

    let err = run.add_data_point("16 14").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(run.state(), ContextState::Closed);
    assert_eq!(run.close().unwrap_err().kind(), ErrorKind::Lifecycle);

    irs.close().unwrap();
    experiment.close().unwrap();
    let set = root.close().unwrap();
    assert_eq!(set.point_count(), 3);
}

#[test]
fn test_monotonicity_enforced() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("First Experiment").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    run.add_data_point("10 20").unwrap();
    run.add_data_point("11 20").unwrap();

    match run.add_data_point("11 19").unwrap_err() {
        Error::Monotonicity {
            dimension, index, ..
        } => {
            assert_eq!(dimension, "dimA");
            assert_eq!(index, 2);
        }
        other => panic!("expected a monotonicity error, got {other}"),
    }
    assert_eq!(run.state(), ContextState::Failed);

    let err = irs.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("dimA"));
    assert!(experiment.close().is_err());
    assert!(root.close().is_err());
}

#[test]
fn test_closing_with_open_child_fails() {
    let root = ExperimentSetContext::new();
    let dim = root.create_dimension().unwrap();
    dim.set_name("t").unwrap();

    let err = root.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert!(err.to_string().contains("dimension"));
    assert_eq!(root.state(), ContextState::Failed);
    assert_eq!(root.create_instance().unwrap_err().kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_sequential_children_only_one_at_a_time() {
    let root = ExperimentSetContext::new();
    let _first = root.create_dimension().unwrap();
    assert_eq!(root.create_dimension().unwrap_err().kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_double_close_is_lifecycle_error() {
    let root = ExperimentSetContext::new();
    let dim = root.create_dimension().unwrap();
    dim.set_name("t").unwrap();
    dim.set_parser(Parser::full_range(NumericType::Int)).unwrap();
    dim.set_type(DimensionType::AlgorithmSteps).unwrap();
    dim.set_direction(DimensionDirection::Increasing).unwrap();
    dim.close().unwrap();
    assert_eq!(dim.close().unwrap_err().kind(), ErrorKind::Lifecycle);
    assert_eq!(dim.set_name("u").unwrap_err().kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_phases_only_move_forward() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);
    assert!(root.dimensions().is_some());
    assert!(root.instances().is_none());

    let err = root.create_dimension().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_instance_after_experiment_rejected() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);
    let experiment = root.create_experiment().unwrap();
    assert_eq!(root.instances().unwrap().len(), 1);
    drop(experiment);

    assert_eq!(root.create_instance().unwrap_err().kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_concurrent_experiments_block_other_root_ops() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let first = root.create_experiment().unwrap();
    let second = root.create_experiment().unwrap();
    first.set_name("a").unwrap();
    second.set_name("b").unwrap();
    assert_eq!(
        root.declare_parameter("late", None).unwrap_err().kind(),
        ErrorKind::Lifecycle
    );

    let irs = first.create_instance_runs().unwrap();
    assert_eq!(first.set_description("x").unwrap_err().kind(), ErrorKind::Lifecycle);
    assert_eq!(first.state(), ContextState::Failed);
    drop(irs);
    drop(second);
    assert!(root.close().is_err());
}

#[test]
fn test_dropped_run_fails_parent() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    {
        let run = irs.create_run().unwrap();
        run.add_data_point("1 1").unwrap();
    }
    let err = irs.close().unwrap_err();
    assert!(err.to_string().contains("dropped"));
    assert_eq!(irs.state(), ContextState::Failed);
}

#[test]
fn test_degenerate_nodes_rejected() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    assert_eq!(irs.create_run().unwrap_err().kind(), ErrorKind::Validation);

    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    let err = run.close().unwrap_err();
    assert!(err.to_string().contains("no data points"));
}

#[test]
fn test_empty_experiment_set_rejected() {
    let root = ExperimentSetContext::new();
    assert_eq!(root.close().unwrap_err().kind(), ErrorKind::Validation);

    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);
    let err = root.close().unwrap_err();
    assert!(err.to_string().contains("experiment"));
}

#[test]
fn test_dimension_requires_parser() {
    let root = ExperimentSetContext::new();
    let dim = root.create_dimension().unwrap();
    dim.set_name("t").unwrap();
    dim.set_type(DimensionType::CpuRuntime).unwrap();
    dim.set_direction(DimensionDirection::Increasing).unwrap();
    let err = dim.close().unwrap_err();
    assert!(err.to_string().contains("parser"));
    assert!(root.close().is_err());
}

#[test]
fn test_unknown_instance_is_lookup_error() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);
    let experiment = root.create_experiment().unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    assert_eq!(
        irs.set_instance("Second Instance").unwrap_err().kind(),
        ErrorKind::Lookup
    );
}

#[test]
fn test_instance_bounds_enforced_on_runs() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("bounded").unwrap();
    instance.set_upper_bound("dimA", 12).unwrap();
    instance.set_lower_bound("dimF", 0.0).unwrap();
    assert_eq!(
        instance.set_lower_bound("dimX", 1).unwrap_err().kind(),
        ErrorKind::Lookup
    );
}

#[test]
fn test_instance_bounds_reject_points() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("bounded").unwrap();
    instance.set_upper_bound("dimA", 12).unwrap();
    instance.close().unwrap();

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("bounded").unwrap();
    let run = irs.create_run().unwrap();
    run.add_data_point("10 20").unwrap();
    let err = run.add_data_point("15 15").unwrap_err();
    assert!(err.to_string().contains("upper bound"));

    let set_instance = root.instances().unwrap();
    assert_eq!(
        set_instance.get("bounded").unwrap().upper_bound(0),
        Some(Number::Long(12))
    );
}

#[test]
fn test_points_from_numbers_and_json() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    run.add_data_point_numbers(&[Number::Long(1), Number::Double(9.5)])
        .unwrap();
    run.add_data_point_json(&serde_json::json!([2, 9])).unwrap();
    run.add_data_point_json(&serde_json::json!({"dimF": "8.25", "dimA": 3}))
        .unwrap();
    assert_eq!(run.len(), 3);
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();

    let set = root.close().unwrap();
    let run = set.runs().next().unwrap();
    assert_eq!(run.value(2, 1), Some(Number::Double(8.25)));
}

#[test]
fn test_run_parameters_merge_into_experiment() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);
    root.declare_parameter("seed-policy", Some("how seeds are drawn"))
        .unwrap();

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    experiment.set_parameter_value("popsize", 10).unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    run.set_parameter_value("crossover", "pmx").unwrap();
    run.add_data_point("1 1").unwrap();
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();

    let set = root.close().unwrap();
    let parameters = set.experiment("e").unwrap().parameters();
    assert_eq!(parameters.len(), 3);
    assert_eq!(
        parameters.get("crossover").unwrap().as_value().unwrap().name(),
        "pmx"
    );
    assert!(parameters.get("seed-policy").unwrap().is_unspecified());
    assert_eq!(
        set.parameter("seed-policy").unwrap().description(),
        Some("how seeds are drawn")
    );
}

#[test]
fn test_conflicting_run_parameters_fail_instance_runs() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    for popsize in [10, 20] {
        let run = irs.create_run().unwrap();
        run.set_parameter_value("popsize", popsize).unwrap();
        run.add_data_point("1 1").unwrap();
        let outcome = run.close();
        assert_eq!(outcome.is_err(), popsize == 20);
    }
    assert!(irs.close().is_err());
}

#[test]
fn test_experiments_sorted_and_indexed() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    for name in ["zeta", "alpha"] {
        let instance = root.create_instance().unwrap();
        instance.set_name(name).unwrap();
        instance.close().unwrap();
    }

    for name in ["second", "first"] {
        let experiment = root.create_experiment().unwrap();
        experiment.set_name(name).unwrap();
        for instance in ["zeta", "alpha"] {
            let irs = experiment.create_instance_runs().unwrap();
            irs.set_instance(instance).unwrap();
            let run = irs.create_run().unwrap();
            run.add_data_point("1 1").unwrap();
            run.close().unwrap();
            irs.close().unwrap();
        }
        experiment.close().unwrap();
    }

    let set = root.close().unwrap();
    let names: Vec<&str> = set.experiments().iter().map(|e| e.name()).collect();
    assert_eq!(names, ["first", "second"]);
    assert_eq!(set.instance("alpha").unwrap().index(), 0);
    for experiment in set.experiments() {
        let instances: Vec<usize> = experiment
            .instance_runs()
            .iter()
            .map(|irs| irs.instance())
            .collect();
        assert_eq!(instances, [0, 1]);
        for irs in experiment.instance_runs() {
            assert_eq!(set.owner_of(irs).unwrap().name(), experiment.name());
            for run in irs.runs() {
                assert!(std::ptr::eq(set.run(run.id()).unwrap(), run));
                assert_eq!(set.owner_of_run(run).unwrap().instance(), irs.instance());
            }
        }
    }
    assert!(set.experiment("third").is_err());
}

#[test]
fn test_instance_runs_over_same_instance_merge() {
    let root = ExperimentSetContext::new();
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let first = experiment.create_instance_runs().unwrap();
    let second = experiment.create_instance_runs().unwrap();
    for irs in [&first, &second] {
        irs.set_instance("First Instance").unwrap();
        let run = irs.create_run().unwrap();
        run.add_data_point("1 1").unwrap();
        run.close().unwrap();
        irs.close().unwrap();
    }
    experiment.close().unwrap();

    let set = root.close().unwrap();
    assert_eq!(set.instance_runs_count(), 1);
    assert_eq!(set.run_count(), 2);
}

#[test]
fn test_pruning_drops_stagnant_points() {
    let root = ExperimentSetContext::with_config(BuilderConfig::new().prune_redundant_points(true));
    scenario_dimensions(&root);
    scenario_instance(&root);

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("First Instance").unwrap();
    let run = irs.create_run().unwrap();
    for point in ["1 9", "2 9", "3 9", "4 5", "5 5"] {
        run.add_data_point(point).unwrap();
    }
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();

    let set = root.close().unwrap();
    let run = set.runs().next().unwrap();
    let fes: Vec<Number> = run.column_values(set.dimension("dimA").unwrap());
    assert_eq!(fes, vec![Number::Long(1), Number::Long(4), Number::Long(5)]);
}
