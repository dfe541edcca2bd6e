use serde_json::json;
use tenantsync_types::Policy;

// ── Flags ───────────────────────────────────────────────────────

#[test]
fn empty_policy_disables_everything() {
    let policy = Policy::new();
    assert!(!policy.flag(Policy::ALLOW_DELETE));
    assert!(!policy.allows_delete("clients"));
    assert!(policy.excluded("rules").is_empty());
}

#[test]
fn flags_accept_strings_and_numbers() {
    let policy = Policy::new()
        .with("a", "true")
        .with("b", "No")
        .with("c", 1)
        .with("d", "maybe");
    assert!(policy.flag("a"));
    assert!(!policy.flag("b"));
    assert!(policy.flag("c"));
    assert!(!policy.flag("d"));
}

#[test]
fn per_type_delete_overrides_global() {
    let policy = Policy::new()
        .with(Policy::ALLOW_DELETE, true)
        .with("allow_delete.clients", false);
    assert!(policy.allows_delete("rules"));
    assert!(!policy.allows_delete("clients"));

    let policy = Policy::new().with("allow_delete.roles", "true");
    assert!(policy.allows_delete("roles"));
    assert!(!policy.allows_delete("rules"));
}

// ── Lists and strings ───────────────────────────────────────────

#[test]
fn excluded_reads_arrays_and_csv() {
    let policy = Policy::new()
        .with("excluded.rules", json!(["a", "b"]))
        .with("excluded.clients", "x, y ,,z");
    assert_eq!(policy.excluded("rules"), vec!["a", "b"]);
    assert_eq!(policy.excluded("clients"), vec!["x", "y", "z"]);
}

#[test]
fn string_values() {
    let policy = Policy::new().with(Policy::CLIENT_ID, "abc");
    assert_eq!(policy.string(Policy::CLIENT_ID), Some("abc"));
    assert_eq!(policy.string("missing"), None);
}

#[test]
fn deserializes_from_plain_object() {
    let policy: Policy =
        serde_json::from_value(json!({"allow_delete": true, "excluded.rules": ["r"]})).unwrap();
    assert!(policy.allows_delete("anything"));
    assert_eq!(policy.excluded("rules"), vec!["r"]);
}
