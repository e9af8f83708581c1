//! Turns the OCR model's raw chat-completion reply into an
//! [`ExtractionResult`].
//!
//! The model is not contractually bound to the schema we ask for, so the
//! rules here are deliberately asymmetric: structural problems (no content,
//! content that is not JSON) produce an explicit failure result carrying the
//! raw payload for debugging, while value-level gaps (a missing field, a
//! number where a string belongs) are papered over with defaults and never
//! fail the whole reply. Everything is pure; nothing in this module does I/O
//! or returns `Err`.

use serde_json::Value;

use crate::schema::{EntityData, ExtractionResult, TableData};

/// Normalize a raw model reply.
///
/// `reply` is the decoded JSON body of the chat-completion response. The
/// content string is expected at `choices[0].message.content` and to itself
/// be a JSON document with optional `entities` and `tables` keys.
pub fn normalize(reply: &Value) -> ExtractionResult {
    let content = match message_content(reply) {
        Some(content) => content,
        None => return ExtractionResult::failure("no content in response"),
    };

    let payload: Value = match serde_json::from_str(content) {
        Ok(payload) => payload,
        Err(err) => {
            return ExtractionResult::failure(format!(
                "failed to parse response: {err}; raw content: {content}"
            ));
        }
    };

    let payload = coerce_tables(payload);
    let entities = read_entities(&payload);
    let tables = read_tables(&payload);

    ExtractionResult::ok(entities, tables)
}

/// Resolve `choices[0].message.content` to a non-empty string.
fn message_content(reply: &Value) -> Option<&str> {
    reply
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|content| !content.is_empty())
}

/// Rewrite every table entry so `headers` and `rows` contain only strings.
///
/// Entries keep any extra keys they carried; only `headers` and `rows` are
/// replaced. Order of tables, rows, and cells is preserved. Applying this
/// twice gives the same payload as applying it once, since strings coerce to
/// themselves. A `tables` value that is not an array, or an entry that is
/// not an object, passes through untouched.
pub fn coerce_tables(mut payload: Value) -> Value {
    let Some(tables) = payload.get_mut("tables").and_then(Value::as_array_mut) else {
        return payload;
    };

    for table in tables.iter_mut() {
        let Some(entry) = table.as_object_mut() else {
            continue;
        };
        let headers = string_seq(entry.get("headers"));
        let rows = row_seq(entry.get("rows"));
        entry.insert("headers".to_string(), to_json_strings(headers));
        entry.insert(
            "rows".to_string(),
            Value::Array(rows.into_iter().map(to_json_strings).collect()),
        );
    }

    payload
}

/// Canonical string form of an arbitrary JSON value.
///
/// Strings pass through without added quotes, numbers and booleans use their
/// textual form, `null` becomes the literal `"null"`, and arrays/objects
/// become their compact JSON text.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// "Present and an array → stringified elements; else → empty" accessor used
/// for every flat string-list field in the payload.
fn string_seq(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(items) => items.iter().map(to_display_string).collect(),
        None => Vec::new(),
    }
}

/// Same rule for `rows`, one level deeper. A row that is not itself an array
/// becomes a single-element row holding its string form.
fn row_seq(value: Option<&Value>) -> Vec<Vec<String>> {
    let Some(rows) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| match row.as_array() {
            Some(cells) => cells.iter().map(to_display_string).collect(),
            None => vec![to_display_string(row)],
        })
        .collect()
}

fn to_json_strings(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

fn read_entities(payload: &Value) -> EntityData {
    let entities = payload.get("entities");
    let field = |name: &str| string_seq(entities.and_then(|e| e.get(name)));
    EntityData {
        names: field("names"),
        dates: field("dates"),
        addresses: field("addresses"),
    }
}

fn read_tables(payload: &Value) -> Vec<TableData> {
    let Some(tables) = payload.get("tables").and_then(Value::as_array) else {
        return Vec::new();
    };
    tables
        .iter()
        .map(|table| TableData {
            headers: string_seq(table.get("headers")),
            rows: row_seq(table.get("rows")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply_with_content(content: &str) -> Value {
        json!({
            "choices": [
                {"message": {"role": "assistant", "content": content}}
            ]
        })
    }

    #[test]
    fn missing_choices_is_missing_content() {
        let result = normalize(&json!({"id": "cmpl-1"}));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no content in response"));
        assert_eq!(result.entities, EntityData::default());
        assert!(result.tables.is_empty());
    }

    #[test]
    fn empty_content_is_missing_content() {
        let result = normalize(&reply_with_content(""));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no content in response"));
    }

    #[test]
    fn non_string_content_is_missing_content() {
        let reply = json!({"choices": [{"message": {"content": 42}}]});
        let result = normalize(&reply);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no content in response"));
    }

    #[test]
    fn invalid_json_keeps_raw_content_in_error() {
        let result = normalize(&reply_with_content("{not valid json"));
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("failed to parse response:"), "got: {error}");
        assert!(error.contains("not valid json"), "got: {error}");
    }

    #[test]
    fn payload_without_tables_never_fails() {
        let result = normalize(&reply_with_content(r#"{"entities":{"names":["Bob"]}}"#));
        assert!(result.success);
        assert_eq!(result.entities.names, vec!["Bob"]);
        assert!(result.entities.dates.is_empty());
        assert!(result.tables.is_empty());
    }

    #[test]
    fn mixed_cell_types_are_stringified() {
        let content = r#"{"entities":{"names":["Alice"]},"tables":[{"headers":["A","B"],"rows":[[1,null]]}]}"#;
        let result = normalize(&reply_with_content(content));
        assert!(result.success);
        assert_eq!(result.entities.names, vec!["Alice"]);
        assert!(result.entities.dates.is_empty());
        assert_eq!(result.tables[0].rows[0], vec!["1", "null"]);
    }

    #[test]
    fn nested_cells_become_compact_json() {
        let content = r#"{"tables":[{"headers":[true,2.5],"rows":[[["a","b"],{"k":1}]]}]}"#;
        let result = normalize(&reply_with_content(content));
        assert!(result.success);
        assert_eq!(result.tables[0].headers, vec!["true", "2.5"]);
        assert_eq!(result.tables[0].rows[0], vec![r#"["a","b"]"#, r#"{"k":1}"#]);
    }

    #[test]
    fn non_array_row_becomes_single_cell() {
        let content = r#"{"tables":[{"headers":["H"],"rows":["loose", 7]}]}"#;
        let result = normalize(&reply_with_content(content));
        assert!(result.success);
        assert_eq!(result.tables[0].rows, vec![vec!["loose"], vec!["7"]]);
    }

    #[test]
    fn non_sequence_entity_field_defaults_locally() {
        let content = r#"{"entities":{"names":"Alice","dates":["2024-01-01"]}}"#;
        let result = normalize(&reply_with_content(content));
        assert!(result.success);
        assert!(result.entities.names.is_empty());
        assert_eq!(result.entities.dates, vec!["2024-01-01"]);
    }

    #[test]
    fn coercion_preserves_extra_table_keys() {
        let payload = json!({"tables":[{"headers":["H"],"rows":[],"extra":"x"}]});
        let coerced = coerce_tables(payload);
        assert_eq!(coerced["tables"][0]["extra"], "x");
        assert_eq!(coerced["tables"][0]["headers"], json!(["H"]));
        assert_eq!(coerced["tables"][0]["rows"], json!([]));
    }

    #[test]
    fn coercion_is_idempotent() {
        let payload = json!({
            "entities": {"names": ["Alice"]},
            "tables": [
                {"headers": ["A", 1, null], "rows": [[true, {"k": [1]}], "bare"], "note": "kept"}
            ]
        });
        let once = coerce_tables(payload.clone());
        let twice = coerce_tables(once.clone());
        assert_eq!(once, twice);
        assert_ne!(once, payload);
    }

    #[test]
    fn coercion_skips_payload_without_tables() {
        let payload = json!({"entities": {"names": ["Alice"]}});
        assert_eq!(coerce_tables(payload.clone()), payload);
    }

    #[test]
    fn non_array_tables_value_passes_through() {
        let payload = json!({"tables": "oops"});
        assert_eq!(coerce_tables(payload.clone()), payload);
        let result = normalize(&reply_with_content(r#"{"tables":"oops"}"#));
        assert!(result.success);
        assert!(result.tables.is_empty());
    }

    #[test]
    fn non_object_table_entry_reads_as_empty_table() {
        let result = normalize(&reply_with_content(r#"{"tables":[42]}"#));
        assert!(result.success);
        assert_eq!(result.tables, vec![TableData::default()]);
    }

    #[test]
    fn display_string_conventions() {
        assert_eq!(to_display_string(&json!("plain")), "plain");
        assert_eq!(to_display_string(&json!(3)), "3");
        assert_eq!(to_display_string(&json!(2.5)), "2.5");
        assert_eq!(to_display_string(&json!(false)), "false");
        assert_eq!(to_display_string(&Value::Null), "null");
        assert_eq!(to_display_string(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(to_display_string(&json!({"k": null})), r#"{"k":null}"#);
    }

    #[test]
    fn normalize_is_deterministic() {
        let reply = reply_with_content(r#"{"tables":[{"headers":["A"],"rows":[[1]]}]}"#);
        assert_eq!(normalize(&reply), normalize(&reply));
    }
}
