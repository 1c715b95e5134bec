use tomoflow_core::operation::{ParamSource, ParamSpec, ParamValue, StackParameter};

#[test]
fn test_parse_int_and_float() {
    let size = ParamSpec::int("size", "Size", 1, 255);
    assert_eq!(size.parse_value(" 7 "), Ok(ParamValue::Int(7)));
    assert!(size.parse_value("0").is_err());
    assert!(size.parse_value("3.5").is_err());

    let sigma = ParamSpec::float("sigma", "Sigma", 0.0, 10.0);
    assert_eq!(sigma.parse_value("2.5"), Ok(ParamValue::Float(2.5)));
    assert!(sigma.parse_value("nan").is_err());
    assert!(sigma.parse_value("11").is_err());
}

#[test]
fn test_float_accepts_integer_value() {
    let spec = ParamSpec::float("clip_min", "Clip Min", -10.0, 10.0);
    assert!(spec.check(&ParamValue::Int(3)).is_ok());
}

#[test]
fn test_parse_choice_and_bool() {
    let mode = ParamSpec::choice("mode", "Mode", &["bright", "dark"]);
    assert_eq!(mode.parse_value("dark"), Ok(ParamValue::from("dark")));
    assert!(mode.parse_value("grey").is_err());

    let flag = ParamSpec::boolean("flag", "Flag");
    assert_eq!(flag.parse_value("true"), Ok(ParamValue::Bool(true)));
    assert!(flag.parse_value("yes").is_err());
}

#[test]
fn test_parse_roi() {
    let roi = ParamSpec::stack_roi("roi", "ROI");
    assert!(roi.required);
    assert_eq!(roi.source, ParamSource::Stack(StackParameter::Roi));
    assert_eq!(
        roi.parse_value("0, 1, 10, 20"),
        Ok(ParamValue::List(vec![
            ParamValue::Int(0),
            ParamValue::Int(1),
            ParamValue::Int(10),
            ParamValue::Int(20),
        ]))
    );
    assert!(roi.parse_value("0,1,10").is_err());
    assert!(roi.parse_value("5,1,5,20").is_err());
    assert!(roi.parse_value("-1,0,4,4").is_err());
}

#[test]
fn test_builder_defaults() {
    let spec = ParamSpec::int("radius", "Radius", 1, 9)
        .default_value(3i64)
        .help("Window side.");
    assert!(!spec.required);
    assert_eq!(spec.default, Some(ParamValue::Int(3)));
    assert_eq!(spec.source, ParamSource::Caller);
    assert_eq!(spec.help, "Window side.");
}

#[test]
fn test_persistable_values() {
    assert!(ParamValue::Float(1.0).is_persistable());
    assert!(!ParamValue::Float(f64::INFINITY).is_persistable());
    assert!(!ParamValue::List(vec![ParamValue::Float(f64::NAN)]).is_persistable());
    assert!(ParamValue::from("text").is_persistable());
}

#[test]
fn test_untagged_json_values() {
    let value: ParamValue = serde_json::from_str("[1, 2.5, true, \"x\"]").unwrap();
    assert_eq!(
        value,
        ParamValue::List(vec![
            ParamValue::Int(1),
            ParamValue::Float(2.5),
            ParamValue::Bool(true),
            ParamValue::from("x"),
        ])
    );
}

#[test]
fn test_null_accepted_only_when_optional() {
    let optional = ParamSpec::float("clip_min", "Clip Min", -10.0, 10.0);
    assert!(optional.check(&ParamValue::Null).is_ok());
    let required = ParamSpec::int("size", "Size", 1, 255).required();
    assert!(required.check(&ParamValue::Null).is_err());

    let value: ParamValue = serde_json::from_str("null").unwrap();
    assert_eq!(value, ParamValue::Null);
    assert_eq!(serde_json::to_string(&value).unwrap(), "null");
}
