//! Pulls a JSON list out of a collaborator reply that may wrap it in prose.

use super::domain::GatewayFailure;
use serde_json::Value;

/// Tries the whole body, then the outermost `[...]`, then the outermost `{...}`.
/// A lone object is returned as a one-element list.
pub(crate) fn extract_entries(body: &str) -> Result<Vec<Value>, GatewayFailure> {
    let parsed = serde_json::from_str::<Value>(body.trim())
        .ok()
        .or_else(|| outermost(body, '[', ']'))
        .or_else(|| outermost(body, '{', '}'))
        .ok_or_else(|| GatewayFailure::Malformed("no JSON found in reply".to_string()))?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        Value::Object(_) => vec![parsed],
        other => {
            return Err(GatewayFailure::Malformed(format!(
                "expected a list or object, found {}",
                kind_of(&other)
            )))
        }
    };

    if entries.is_empty() {
        return Err(GatewayFailure::Malformed("reply contained no entries".to_string()));
    }
    Ok(entries)
}

fn outermost(body: &str, open: char, close: char) -> Option<Value> {
    let start = body.find(open)?;
    let end = body.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

/// Every `fields` entry must be present and non-null on each object.
pub(crate) fn require_fields(
    entries: &[Value],
    fields: &[&'static [&'static str]],
) -> Result<(), GatewayFailure> {
    for (index, entry) in entries.iter().enumerate() {
        let Some(object) = entry.as_object() else {
            return Err(GatewayFailure::Malformed(format!(
                "entry {index} is {}, not an object",
                kind_of(entry)
            )));
        };
        for alternatives in fields {
            let present = alternatives
                .iter()
                .any(|name| object.get(*name).is_some_and(|value| !value.is_null()));
            if !present {
                return Err(GatewayFailure::MissingField {
                    index,
                    field: alternatives[0],
                });
            }
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_json() {
        let entries = extract_entries(r#"[{"title": "a"}, {"title": "b"}]"#).expect("list");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn digs_a_list_out_of_prose() {
        let body = "Here are your plans:\n```json\n[{\"title\": \"a\"}]\n```\nGood luck!";
        let entries = extract_entries(body).expect("embedded list");
        assert_eq!(entries[0]["title"], "a");
    }

    #[test]
    fn wraps_a_single_object() {
        let body = "Sure! {\"title\": \"only\"} Let me know.";
        let entries = extract_entries(body).expect("embedded object");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn rejects_prose_and_empty_lists() {
        assert!(matches!(
            extract_entries("I cannot help with that."),
            Err(GatewayFailure::Malformed(_))
        ));
        assert!(extract_entries("[]").is_err());
        assert!(extract_entries("42").is_err());
    }

    #[test]
    fn required_fields_accept_aliases() {
        let entries = extract_entries(r#"[{"title": "a", "target_kpi": "x"}]"#).expect("list");
        assert!(require_fields(&entries, &[&["title"], &["target_metric", "target_kpi"]]).is_ok());

        let err = require_fields(&entries, &[&["title"], &["steps"]]).expect_err("no steps");
        assert_eq!(
            err,
            GatewayFailure::MissingField {
                index: 0,
                field: "steps"
            }
        );
    }
}
