//! Tests for error types

use optbench::builder::ContextKind;
use optbench::config::BuilderConfig;
use optbench::{Error, ErrorKind};

#[test]
fn test_lifecycle_error() {
    let error = Error::Lifecycle {
        context: ContextKind::InstanceRuns,
        message: "close after close".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Lifecycle violation"));
    assert!(error_str.contains("instance-runs"));
    assert!(error_str.contains("close after close"));
    assert_eq!(error.kind(), ErrorKind::Lifecycle);
}

#[test]
fn test_validation_error() {
    let error = Error::Validation("run has no data points".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation failed"));
    assert!(error_str.contains("no data points"));
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn test_monotonicity_error() {
    let error = Error::Monotonicity {
        dimension: "fes".to_string(),
        direction: "strictly increasing".to_string(),
        index: 3,
        previous: "11".to_string(),
        next: "11".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("'fes'"));
    assert!(error_str.contains("point 3"));
    assert!(error_str.contains("11 -> 11 is not strictly increasing"));
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn test_empty_attribute_error() {
    let error = Error::EmptyAttribute("Ecdf { goal: 0.0 }".to_string());
    assert!(format!("{error}").contains("produced no result"));
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn test_lookup_error() {
    let error = Error::Lookup {
        kind: "instance",
        name: "att48".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("no instance named 'att48'"));
    assert_eq!(error.kind(), ErrorKind::Lookup);
}

#[test]
fn test_config_error_from_json() {
    let error = BuilderConfig::from_json(r#"{"worker_threads": "many"}"#).unwrap_err();
    assert!(matches!(error, Error::Config(_)));
    assert!(format!("{error}").contains("Configuration error"));
    assert_eq!(error.kind(), ErrorKind::Other);
}

#[test]
fn test_arrow_error_conversion() {
    let arrow = arrow::error::ArrowError::SchemaError("bad column".to_string());
    let error: Error = arrow.into();
    assert!(format!("{error}").contains("Arrow error"));
    assert_eq!(error.kind(), ErrorKind::Other);
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    assert_eq!(format!("{error}"), "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::Validation("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Validation"));
}
