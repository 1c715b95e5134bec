mod common;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tomoflow_core::error::TomoError;
use tomoflow_core::operation::{
    deserialize_history, Kwargs, Operation, OperationRecord, ParamValue,
};

use common::{kwargs, AddSize, Identity};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_record(name: &str) -> OperationRecord {
    OperationRecord::new(
        name,
        vec![ParamValue::Int(1)],
        kwargs(&[
            ("size", ParamValue::Int(3)),
            ("mode", ParamValue::from("reflect")),
        ]),
        Some("Median".to_string()),
    )
    .unwrap()
}

fn make_lookup() -> HashMap<String, Arc<dyn Operation>> {
    let mut lookup: HashMap<String, Arc<dyn Operation>> = HashMap::new();
    lookup.insert("identity".to_string(), Arc::new(Identity));
    lookup.insert("add_size".to_string(), Arc::new(AddSize));
    lookup
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn test_entry_roundtrip() {
    let records = [
        make_record("median_filter"),
        OperationRecord::new("minus_log", Vec::new(), Kwargs::new(), None).unwrap(),
        OperationRecord::new(
            "crop_coordinates",
            Vec::new(),
            kwargs(&[(
                "roi",
                ParamValue::List(vec![
                    ParamValue::Int(0),
                    ParamValue::Int(0),
                    ParamValue::Int(4),
                    ParamValue::Int(2),
                ]),
            )]),
            Some("Crop Coordinates".to_string()),
        )
        .unwrap(),
        OperationRecord::new(
            "outliers",
            vec![ParamValue::Float(2.0), ParamValue::Bool(false)],
            kwargs(&[
                ("threshold", ParamValue::Float(0.25)),
                ("clip_max", ParamValue::Float(5.0)),
                ("flag", ParamValue::Bool(true)),
            ]),
            None,
        )
        .unwrap(),
    ];
    for record in &records {
        let entry = record.to_entry().unwrap();
        let back = OperationRecord::from_entry(&entry).unwrap();
        assert_eq!(&back, record);
    }
}

#[test]
fn test_entry_has_exactly_four_keys() {
    let entry = make_record("median_filter").to_entry().unwrap();
    let object = entry.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["args", "display_name", "kwargs", "name"]);
    assert_eq!(entry["name"], json!("median_filter"));
    assert_eq!(entry["kwargs"]["size"], json!(3));
}

#[test]
fn test_missing_display_name_serializes_as_null() {
    let record = OperationRecord::new("minus_log", Vec::new(), Kwargs::new(), None).unwrap();
    let entry = record.to_entry().unwrap();
    assert!(entry.as_object().unwrap().contains_key("display_name"));
    assert!(entry["display_name"].is_null());
}

#[test]
fn test_from_entry_without_display_name_key() {
    let entry = json!({"name": "minus_log", "args": [], "kwargs": {}});
    let record = OperationRecord::from_entry(&entry).unwrap();
    assert_eq!(record.display_name(), None);
    assert_eq!(record.friendly_name(), "minus_log");
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

#[test]
fn test_qualified_names_rejected() {
    for name in ["filters.median_filter", "filters/median_filter", "a::b", ""] {
        let err = OperationRecord::new(name, Vec::new(), Kwargs::new(), None).unwrap_err();
        assert!(
            matches!(err, TomoError::InvalidOperationName(_)),
            "{name:?} gave {err}"
        );
    }
}

#[test]
fn test_from_entry_rejects_qualified_name() {
    let entry = json!({
        "name": "filters.median_filter",
        "args": [],
        "kwargs": {},
        "display_name": null
    });
    assert!(matches!(
        OperationRecord::from_entry(&entry),
        Err(TomoError::InvalidOperationName(_))
    ));
}

#[test]
fn test_non_finite_values_rejected() {
    let err = OperationRecord::new(
        "clip_values",
        Vec::new(),
        kwargs(&[("clip_max", ParamValue::Float(f64::NAN))]),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, TomoError::Validation { .. }));
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[test]
fn test_deserialize_history_missing_key_is_empty() {
    let history = deserialize_history(&json!({"dtype": "float32"})).unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_deserialize_history_preserves_order() {
    let metadata = json!({
        "operation_history": [
            make_record("median_filter").to_entry().unwrap(),
            {"name": "minus_log", "args": [], "kwargs": {}, "display_name": null},
        ]
    });
    let history = deserialize_history(&metadata).unwrap();
    let names: Vec<&str> = history.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["median_filter", "minus_log"]);
}

#[test]
fn test_null_keyword_value_roundtrip() {
    let metadata = json!({
        "operation_history": [{
            "name": "median_filter",
            "args": [],
            "kwargs": {"size": 3, "cores": null, "chunksize": null},
            "display_name": "Median",
        }]
    });
    let history = deserialize_history(&metadata).unwrap();
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.kwargs()["size"], ParamValue::Int(3));
    assert_eq!(record.kwargs()["cores"], ParamValue::Null);

    let entry = record.to_entry().unwrap();
    assert!(entry["kwargs"]["cores"].is_null());
    assert_eq!(&OperationRecord::from_entry(&entry).unwrap(), record);
}

#[test]
fn test_deserialize_history_rejects_non_list() {
    let metadata = json!({"operation_history": {"name": "minus_log"}});
    assert!(matches!(
        deserialize_history(&metadata),
        Err(TomoError::Metadata(_))
    ));
}

#[test]
fn test_deserialize_history_rejects_malformed_entry() {
    let metadata = json!({"operation_history": [{"args": []}]});
    assert!(deserialize_history(&metadata).is_err());
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

#[test]
fn test_to_callable_binds_kwargs() {
    let record = OperationRecord::new(
        "add_size",
        Vec::new(),
        kwargs(&[("size", ParamValue::Int(2))]),
        None,
    )
    .unwrap();
    let bound = record.to_callable(&make_lookup()).unwrap();
    assert_eq!(bound.operation.name(), "add_size");
    assert_eq!(bound.kwargs, *record.kwargs());
}

#[test]
fn test_to_callable_unknown_name() {
    let record = make_record("median_filter");
    match record.to_callable(&make_lookup()) {
        Err(TomoError::UnknownOperation(name)) => assert_eq!(name, "median_filter"),
        other => panic!("expected UnknownOperation, got {other:?}"),
    }
}

#[test]
fn test_display_lists_args_and_kwargs() {
    let text = make_record("median_filter").to_string();
    assert_eq!(text, "Median, args: [1], kwargs: {mode: \"reflect\", size: 3}");
}
