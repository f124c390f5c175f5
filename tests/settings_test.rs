//! Feature and parameter settings across a compiled experiment set
//!
//! Toyota Way: Standardized Work (every setting has one slot per property)

use optbench::builder::ExperimentSetContext;
use optbench::config::BuilderConfig;
use optbench::data::{DimensionDirection, DimensionType, Parser};
use optbench::graph::ExperimentSet;
use optbench::property::{PropertySet, PropertyValue, RawValue, SettingValue};
use optbench::ErrorKind;

fn declare_dimensions(root: &ExperimentSetContext) {
    let dim = root.create_dimension().unwrap();
    dim.set_name("fes").unwrap();
    dim.set_parser("long[1,1000000]".parse::<Parser>().unwrap())
        .unwrap();
    dim.set_type(DimensionType::FunctionEvaluations).unwrap();
    dim.set_direction(DimensionDirection::IncreasingStrictly)
        .unwrap();
    dim.close().unwrap();
}

fn finish_with_one_run(root: &ExperimentSetContext, instance: &str) -> ExperimentSet {
    let experiment = root.create_experiment().unwrap();
    experiment.set_name("baseline").unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance(instance).unwrap();
    let run = irs.create_run().unwrap();
    run.add_data_point("1").unwrap();
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();
    root.close().unwrap()
}

/// Instance A: scale=10, symmetric=true. Instance B: scale="100".
fn build_two_instances(config: BuilderConfig) -> ExperimentSet {
    let root = ExperimentSetContext::with_config(config);
    declare_dimensions(&root);

    let a = root.create_instance().unwrap();
    a.set_name("A").unwrap();
    a.set_feature_value("scale", 10).unwrap();
    a.set_feature_value("symmetric", true).unwrap();
    a.close().unwrap();

    let b = root.create_instance().unwrap();
    b.set_name("B").unwrap();
    b.set_feature_value("scale", "100").unwrap();
    b.close().unwrap();

    finish_with_one_run(&root, "A")
}

// ============================================================================
// Sentinels
// ============================================================================

#[test]
fn test_missing_feature_is_unspecified_by_default() {
    let set = build_two_instances(BuilderConfig::new());
    let features = set.instance("B").unwrap().features();

    assert_eq!(features.len(), 2);
    assert_eq!(features.explicit_count(), 1);
    assert!(features.get("symmetric").unwrap().is_unspecified());
    assert_eq!(
        features.get("scale").unwrap().as_value().unwrap().value(),
        &RawValue::Integer(100)
    );
}

#[test]
fn test_missing_feature_generalized_when_configured() {
    let set = build_two_instances(BuilderConfig::new().generalize_missing_features(true));
    let features = set.instance("B").unwrap().features();

    assert_eq!(features.get("symmetric").unwrap(), SettingValue::Generalized);
    assert_eq!(features.to_string().matches('*').count(), 1);
}

fn build_with_featureless_instance(config: BuilderConfig) -> ExperimentSet {
    let root = ExperimentSetContext::with_config(config);
    declare_dimensions(&root);
    for (name, scale) in [("A", Some(3)), ("plain", None)] {
        let instance = root.create_instance().unwrap();
        instance.set_name(name).unwrap();
        if let Some(scale) = scale {
            instance.set_feature_value("scale", scale).unwrap();
        }
        instance.close().unwrap();
    }
    finish_with_one_run(&root, "plain")
}

#[test]
fn test_instance_without_features_is_all_unspecified() {
    let set = build_with_featureless_instance(BuilderConfig::new());

    let features = set.instance("plain").unwrap().features();
    assert_eq!(features.len(), 1);
    assert_eq!(features.explicit_count(), 0);
    assert!(features.get("scale").unwrap().is_unspecified());
    assert!(!features.is_generalized());
}

#[test]
fn test_instance_without_features_is_all_generalized_when_configured() {
    let set = build_with_featureless_instance(
        BuilderConfig::new().generalize_missing_features(true),
    );

    let features = set.instance("plain").unwrap().features();
    assert_eq!(features.len(), 1);
    assert_eq!(features.explicit_count(), 0);
    assert!(features.get("scale").unwrap().is_generalized());
    assert!(features.is_generalized());
    assert!(features.subsumes(set.instance("A").unwrap().features()));
}

// ============================================================================
// Interning
// ============================================================================

#[test]
fn test_values_are_interned_once() {
    let set = build_two_instances(BuilderConfig::new());
    let scale = set.feature("scale").unwrap();

    let names: Vec<String> = scale.values().iter().map(|v| v.name()).collect();
    assert_eq!(names, ["10", "100"]);

    let from_instance = set
        .instance("A")
        .unwrap()
        .features()
        .get("scale")
        .unwrap()
        .as_value()
        .unwrap();
    let parsed = scale.parse("10").unwrap();
    let found = scale.find_value(10).unwrap();
    assert!(std::ptr::eq(from_instance, parsed));
    assert!(std::ptr::eq(parsed, found));
    assert!(std::ptr::eq(scale.parse("1e1").unwrap(), found));
    assert_eq!(scale.parse("11").unwrap_err().kind(), ErrorKind::Lookup);
}

#[test]
fn test_properties_sorted_by_name() {
    let set = build_two_instances(BuilderConfig::new());
    let names: Vec<&str> = set.features().properties().iter().map(|p| p.name()).collect();
    assert_eq!(names, ["scale", "symmetric"]);
    for (id, property) in set.features().properties().iter().enumerate() {
        assert_eq!(property.id(), id);
    }
}

#[test]
fn test_equal_settings_compare_equal() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    for name in ["first", "second"] {
        let instance = root.create_instance().unwrap();
        instance.set_name(name).unwrap();
        instance.set_feature_value("n", 48).unwrap();
        instance.set_feature_value("kind", "euclidean").unwrap();
        instance.close().unwrap();
    }
    let set = finish_with_one_run(&root, "first");
    assert_eq!(
        set.instance("first").unwrap().features(),
        set.instance("second").unwrap().features()
    );
}

// ============================================================================
// Write-once and phase rules
// ============================================================================

#[test]
fn test_conflicting_feature_value_rejected() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    instance.set_feature_value("scale", 10).unwrap();
    instance.set_feature_value("scale", 10.0).unwrap();

    let err = instance.set_feature_value("scale", 20).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("scale"));
}

#[test]
fn test_empty_feature_value_rejected() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    assert_eq!(
        instance.set_feature_value("scale", "  ").unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[test]
fn test_features_frozen_once_experiments_start() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    root.declare_feature("dimension", Some("number of cities"))
        .unwrap();
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    instance.close().unwrap();

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("e").unwrap();
    experiment.close().unwrap_err();

    let err = root.declare_feature("late", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_declared_feature_keeps_description() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    root.declare_feature("n", Some("number of cities")).unwrap();
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    instance
        .set_feature_value_described("n", None, 48, Some("att48"))
        .unwrap();
    instance.close().unwrap();
    let set = finish_with_one_run(&root, "A");

    let n = set.feature("n").unwrap();
    assert_eq!(n.description(), Some("number of cities"));
    assert_eq!(n.values()[0].description(), Some("att48"));
}

#[test]
fn test_parameters_generalized_when_configured() {
    let root = ExperimentSetContext::with_config(
        BuilderConfig::new().generalize_missing_parameters(true),
    );
    declare_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    instance.close().unwrap();

    for (name, popsize) in [("small", Some(10)), ("default", None)] {
        let experiment = root.create_experiment().unwrap();
        experiment.set_name(name).unwrap();
        experiment.set_parameter_value("algorithm", "ga").unwrap();
        if let Some(popsize) = popsize {
            experiment.set_parameter_value("popsize", popsize).unwrap();
        }
        let irs = experiment.create_instance_runs().unwrap();
        irs.set_instance("A").unwrap();
        let run = irs.create_run().unwrap();
        run.add_data_point("1").unwrap();
        run.close().unwrap();
        irs.close().unwrap();
        experiment.close().unwrap();
    }
    let set = root.close().unwrap();

    let default = set.experiment("default").unwrap().parameters();
    assert!(default.get("popsize").unwrap().is_generalized());
    let small = set.experiment("small").unwrap().parameters();
    assert!(default.subsumes(small));
    assert!(!small.subsumes(default));
    assert!(default.get("algorithm").unwrap().is_concrete());
    assert!(default.get("missing").is_err());
}

#[test]
fn test_grouping_setting_from_interned_values() {
    let root = ExperimentSetContext::new();
    declare_dimensions(&root);
    let instance = root.create_instance().unwrap();
    instance.set_name("A").unwrap();
    instance.close().unwrap();

    let experiment = root.create_experiment().unwrap();
    experiment.set_name("ga-10").unwrap();
    experiment.set_parameter_value("algorithm", "ga").unwrap();
    experiment
        .set_parameter_value_described("popsize", Some("population size"), 10, Some("small"))
        .unwrap();
    let irs = experiment.create_instance_runs().unwrap();
    irs.set_instance("A").unwrap();
    let run = irs.create_run().unwrap();
    run.add_data_point("1").unwrap();
    run.close().unwrap();
    irs.close().unwrap();
    experiment.close().unwrap();
    let set = root.close().unwrap();

    let popsize = set.parameter("popsize").unwrap();
    assert_eq!(popsize.description(), Some("population size"));
    let ten = popsize.find_value(10).unwrap();
    assert_eq!(ten.description(), Some("small"));

    let group = PropertySet::create_setting(set.parameters(), [ten], true).unwrap();
    assert_eq!(group.explicit_count(), 1);
    assert!(group.get("algorithm").unwrap().is_generalized());
    assert_eq!(format!("{}", group.get("algorithm").unwrap()), "*");
    assert!(group.subsumes(set.experiment("ga-10").unwrap().parameters()));

    let empty =
        PropertySet::create_setting(set.parameters(), Vec::<&PropertyValue>::new(), false)
            .unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::Validation);
}
