//! Coercion of loosely typed upstream/stored values into the numbers and maps
//! the differencing engine compares. Nothing here fails: malformed input
//! degrades to zero or an empty collection.

use std::collections::BTreeMap;

use serde_json::Value;

/// Parse a JSON number or numeric string. `None` for anything else.
fn parse_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Missing, null or non-numeric values become 0.
pub fn coerce_number(v: Option<&Value>) -> f64 {
    v.and_then(parse_number).unwrap_or(0.0)
}

/// Like [`coerce_number`], but an absent or null value stays `None` so optional
/// comparisons can be skipped. A present but unparseable value is `Some(0.0)`.
pub fn optional_number(v: Option<&Value>) -> Option<f64> {
    match v {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_number(v).unwrap_or(0.0)),
    }
}

/// Accepts an object (`{"Yes": 0.4}`), an array (`[0.4, 0.6]`, keyed by index)
/// or a string holding either as JSON. Entries that are not numeric are read as 0.
pub fn parse_outcome_prices(v: Option<&Value>) -> BTreeMap<String, f64> {
    match v {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, p)| (k.clone(), coerce_number(Some(p))))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, p)| (i.to_string(), coerce_number(Some(p))))
            .collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parse_outcome_prices(Some(&parsed)),
            _ => BTreeMap::new(),
        },
        _ => BTreeMap::new(),
    }
}

/// Outcome labels arrive either as a list or as a JSON-encoded list string.
pub fn parse_string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| match i {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Array(_)) => parse_string_list(Some(&parsed)),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Identifiers come back as numbers from one endpoint and strings from another.
pub fn parse_id(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_number_defaults_to_zero() {
        assert_eq!(coerce_number(None), 0.0);
        assert_eq!(coerce_number(Some(&Value::Null)), 0.0);
        assert_eq!(coerce_number(Some(&json!("abc"))), 0.0);
        assert_eq!(coerce_number(Some(&json!(true))), 0.0);
        assert_eq!(coerce_number(Some(&json!("1250.5"))), 1250.5);
        assert_eq!(coerce_number(Some(&json!(42))), 42.0);
    }

    #[test]
    fn optional_number_keeps_absence() {
        assert_eq!(optional_number(None), None);
        assert_eq!(optional_number(Some(&Value::Null)), None);
        assert_eq!(optional_number(Some(&json!("oops"))), Some(0.0));
        assert_eq!(optional_number(Some(&json!("0.52"))), Some(0.52));
    }

    #[test]
    fn outcome_prices_from_encoded_array() {
        let prices = parse_outcome_prices(Some(&json!("[\"0.35\", \"0.65\"]")));
        assert_eq!(prices.get("0"), Some(&0.35));
        assert_eq!(prices.get("1"), Some(&0.65));
    }

    #[test]
    fn outcome_prices_from_object() {
        let prices = parse_outcome_prices(Some(&json!({"Yes": 0.4, "No": "0.6"})));
        assert_eq!(prices.get("Yes"), Some(&0.4));
        assert_eq!(prices.get("No"), Some(&0.6));
    }

    #[test]
    fn malformed_outcome_prices_are_empty() {
        assert!(parse_outcome_prices(Some(&json!("not json"))).is_empty());
        assert!(parse_outcome_prices(Some(&json!("12"))).is_empty());
        assert!(parse_outcome_prices(Some(&json!(3.5))).is_empty());
        assert!(parse_outcome_prices(None).is_empty());
    }

    #[test]
    fn string_list_accepts_both_encodings() {
        assert_eq!(parse_string_list(Some(&json!(["Yes", "No"]))), vec!["Yes", "No"]);
        assert_eq!(parse_string_list(Some(&json!("[\"Up\",\"Down\"]"))), vec!["Up", "Down"]);
        assert!(parse_string_list(Some(&json!("[broken"))).is_empty());
    }

    #[test]
    fn ids_normalise_to_strings() {
        assert_eq!(parse_id(Some(&json!(12345))), Some("12345".to_string()));
        assert_eq!(parse_id(Some(&json!(" 99 "))), Some("99".to_string()));
        assert_eq!(parse_id(Some(&json!(""))), None);
        assert_eq!(parse_id(None), None);
    }
}
