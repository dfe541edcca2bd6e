use serde_json::json;
use tenantsync_types::{FieldSpec, FieldType, ResourceSchema, Shape};

fn rules_schema() -> ResourceSchema {
    ResourceSchema::array(
        "rules",
        vec![
            FieldSpec::string("name").required(),
            FieldSpec::string("script").required(),
            FieldSpec::integer("order"),
            FieldSpec::bool("enabled"),
            FieldSpec::enumeration("stage", &["login_success", "pre_authorize"]),
        ],
    )
}

// ── FieldSpec shorthands ────────────────────────────────────────

#[test]
fn shorthands_set_types() {
    assert_eq!(FieldSpec::string("a").field_type, FieldType::String);
    assert_eq!(FieldSpec::array("a").field_type, FieldType::Array);
    assert_eq!(FieldSpec::object("a").field_type, FieldType::Object);
    assert!(!FieldSpec::number("a").required);
    assert!(FieldSpec::number("a").required().required);
    assert_eq!(
        FieldSpec::enumeration("s", &["x"]).enum_options,
        Some(vec!["x".to_string()])
    );
}

#[test]
fn integer_rejects_fractions() {
    let spec = FieldSpec::integer("order");
    assert!(spec.check(&json!(3)).is_none());
    assert!(spec.check(&json!(3.5)).is_some());
}

// ── Collection checks ───────────────────────────────────────────

#[test]
fn conforming_collection_has_no_violations() {
    let value = json!([
        {"name": "a", "script": "x", "order": 1, "enabled": true, "stage": "login_success"},
        {"name": "b", "script": "y", "extra": {"kept": true}}
    ]);
    assert!(rules_schema().violations(&value).is_empty());
}

#[test]
fn reports_every_violation_with_position() {
    let value = json!([
        {"script": "x"},
        {"name": 5, "script": "y", "stage": "nope"},
        "not an object"
    ]);
    let violations = rules_schema().violations(&value);
    assert_eq!(violations.len(), 4, "{violations:?}");
    assert!(violations[0].contains("rules[0]: missing required field name"));
    assert!(violations[1].contains("rules[1]: name must be of type String"));
    assert!(violations[2].contains("stage must be one of"));
    assert!(violations[3].contains("rules[2] must be an object"));
}

#[test]
fn null_counts_as_missing() {
    let value = json!([{"name": null, "script": "x", "order": null}]);
    let violations = rules_schema().violations(&value);
    assert_eq!(violations, vec!["rules[0]: missing required field name"]);
}

#[test]
fn wrong_shape_is_reported() {
    let violations = rules_schema().violations(&json!({"name": "a"}));
    assert_eq!(violations, vec!["rules must be an array, got object"]);

    let tenant = ResourceSchema::object("tenant", vec![FieldSpec::string("friendly_name")]);
    assert_eq!(tenant.shape, Shape::Object);
    assert!(tenant.violations(&json!({"friendly_name": "x"})).is_empty());
    assert_eq!(
        tenant.violations(&json!([])),
        vec!["tenant must be an object, got array"]
    );
}
