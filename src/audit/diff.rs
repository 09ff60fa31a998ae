//! Field-level change diffing with sensitive-key redaction.
//!
//! Snapshots are sanitized before comparison, so a change confined to a
//! sensitive field never leaks its values through the diff.

use serde_json::{Map, Value};

use crate::store::Document;

/// Key-name substrings whose values must never reach an audit record.
pub const SENSITIVE_TERMS: [&str; 5] = ["password", "token", "secret", "key", "auth"];

pub const REDACTED: &str = "[REDACTED]";

pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| lowered.contains(term))
}

/// Replace the value of every sensitive key with the `[REDACTED]` marker,
/// recursing into nested objects and arrays.
pub fn sanitize(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| {
            let sanitized = if is_sensitive_key(key) {
                Value::String(REDACTED.into())
            } else {
                sanitize_value(value)
            };
            (key.clone(), sanitized)
        })
        .collect()
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let inner: Document = map.clone();
            Value::Object(sanitize(&inner))
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        other => other.clone(),
    }
}

/// Compute the change map between two snapshots of the same document.
///
/// The result holds one entry per field whose value differs (deep equality),
/// per field removed in `current` (`to` absent) and per field newly introduced
/// (`from` absent). An empty map means nothing changed and the caller must not
/// write an audit record for it.
pub fn diff(previous: &Document, current: &Document) -> Map<String, Value> {
    let previous = sanitize(previous);
    let current = sanitize(current);

    let mut changes = Map::new();

    for (key, new_value) in &current {
        match previous.get(key) {
            Some(old_value) if old_value == new_value => {}
            Some(old_value) => {
                changes.insert(key.clone(), change(Some(old_value), Some(new_value)));
            }
            None => {
                changes.insert(key.clone(), change(None, Some(new_value)));
            }
        }
    }

    for (key, old_value) in &previous {
        if !current.contains_key(key) {
            changes.insert(key.clone(), change(Some(old_value), None));
        }
    }

    changes
}

fn change(from: Option<&Value>, to: Option<&Value>) -> Value {
    let mut entry = Map::new();
    if let Some(value) = from {
        entry.insert("from".into(), value.clone());
    }
    if let Some(value) = to {
        entry.insert("to".into(), value.clone());
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let snapshot = doc(&[
            ("title", json!("Call patient")),
            ("steps", json!([{"text": "dial", "completed": false}])),
        ]);
        assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn changed_added_and_removed_fields_all_appear() {
        let previous = doc(&[("a", json!(1)), ("b", json!("x")), ("gone", json!(true))]);
        let current = doc(&[("a", json!(2)), ("b", json!("x")), ("new", json!("y"))]);

        let changes = diff(&previous, &current);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes["a"], json!({"from": 1, "to": 2}));
        assert_eq!(changes["gone"], json!({"from": true}));
        assert_eq!(changes["new"], json!({"to": "y"}));
        assert!(!changes.contains_key("b"));
    }

    #[test]
    fn comparison_is_structural_not_textual() {
        let previous = doc(&[("steps", json!([{"text": "a", "completed": false}]))]);
        let current = doc(&[("steps", json!([{"text": "a", "completed": true}]))]);

        let changes = diff(&previous, &current);
        assert_eq!(changes.len(), 1);
        assert!(changes.contains_key("steps"));
    }

    #[test]
    fn task_claim_scenario() {
        let previous = doc(&[
            ("title", json!("Call patient")),
            ("status", json!("Not Started")),
            ("priority", json!("Medium")),
            ("assigneeId", json!(null)),
        ]);
        let current = doc(&[
            ("title", json!("Call patient")),
            ("status", json!("In Progress")),
            ("priority", json!("Medium")),
            ("assigneeId", json!("u1")),
        ]);

        let changes = diff(&previous, &current);
        assert_eq!(
            changes,
            json!({
                "status": {"from": "Not Started", "to": "In Progress"},
                "assigneeId": {"from": null, "to": "u1"},
            })
            .as_object()
            .cloned()
            .expect("object")
        );
    }

    #[test]
    fn sensitive_keys_are_redacted_case_insensitively() {
        let snapshot = doc(&[
            ("apiToken", json!("t-123")),
            ("PASSWORD", json!("hunter2")),
            ("authProvider", json!("oidc")),
            ("name", json!("Dana")),
        ]);

        let sanitized = sanitize(&snapshot);
        assert_eq!(sanitized["apiToken"], json!(REDACTED));
        assert_eq!(sanitized["PASSWORD"], json!(REDACTED));
        assert_eq!(sanitized["authProvider"], json!(REDACTED));
        assert_eq!(sanitized["name"], json!("Dana"));
    }

    #[test]
    fn nested_sensitive_keys_are_redacted() {
        let snapshot = doc(&[(
            "settings",
            json!({"webhookSecret": "s3cr3t", "color": "#fff"}),
        )]);

        let sanitized = sanitize(&snapshot);
        assert_eq!(sanitized["settings"]["webhookSecret"], json!(REDACTED));
        assert_eq!(sanitized["settings"]["color"], json!("#fff"));
    }

    #[test]
    fn sensitive_value_change_alone_yields_empty_diff() {
        let previous = doc(&[("password", json!("old")), ("name", json!("Dana"))]);
        let current = doc(&[("password", json!("new")), ("name", json!("Dana"))]);

        // Both sides sanitize to the marker, so nothing observable changed.
        assert!(diff(&previous, &current).is_empty());
    }

    #[test]
    fn removed_sensitive_field_appears_redacted() {
        let previous = doc(&[("apiKey", json!("k-1")), ("name", json!("Dana"))]);
        let current = doc(&[("name", json!("Dana"))]);

        let changes = diff(&previous, &current);
        assert_eq!(changes["apiKey"], json!({"from": REDACTED}));
    }
}
