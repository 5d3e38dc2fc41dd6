//! Lenient deserializers for backend payload fields.
//!
//! The backend is inconsistent about scalar encodings: amounts come back as
//! `"6000.00"` or `6000`, ids as `42` or `"42"`, nested objects sometimes as
//! JSON-encoded strings. These helpers normalize once, at the boundary.

use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a JSON value as a number, accepting numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Interpret a JSON value as an integer id, accepting numeric strings.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Interpret a JSON value as a non-empty string, stringifying numbers.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_string))
}

pub fn id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_i64(&value).ok_or_else(|| D::Error::custom(format!("invalid id: {}", value)))
}

pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// A non-negative count sent as a number or a numeric string. `null` and
/// unparseable values count as zero.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let n = value
        .as_ref()
        .and_then(|v| value_as_i64(v).or_else(|| value_as_f64(v).map(|f| f as i64)))
        .unwrap_or(0);
    Ok(n.max(0) as u64)
}

/// `null` becomes the type's default (e.g. an empty list).
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept either an embedded object or a JSON-encoded string of one.
pub fn embedded_json<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => serde_json::from_str(&s).map(Some).map_err(D::Error::custom),
        Some(other) => serde_json::from_value(other).map(Some).map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&json!(6000)), Some(6000.0));
        assert_eq!(value_as_f64(&json!("6000.00")), Some(6000.0));
        assert_eq!(value_as_f64(&json!("12,500.50")), Some(12500.5));
        assert_eq!(value_as_f64(&json!("n/a")), None);
        assert_eq!(value_as_f64(&json!(null)), None);
    }

    #[test]
    fn test_value_as_string() {
        assert_eq!(value_as_string(&json!("TX-1")), Some("TX-1".to_string()));
        assert_eq!(value_as_string(&json!(991)), Some("991".to_string()));
        assert_eq!(value_as_string(&json!("  ")), None);
        assert_eq!(value_as_string(&json!(false)), None);
    }

    #[derive(Deserialize)]
    struct Counted {
        #[serde(default, deserialize_with = "count")]
        n: u64,
    }

    #[test]
    fn test_count_accepts_numbers_strings_and_null() {
        let n = |json: &str| serde_json::from_str::<Counted>(json).unwrap().n;
        assert_eq!(n(r#"{"n": 12}"#), 12);
        assert_eq!(n(r#"{"n": "12"}"#), 12);
        assert_eq!(n(r#"{"n": "3.0"}"#), 3);
        assert_eq!(n(r#"{"n": null}"#), 0);
        assert_eq!(n(r#"{"n": -4}"#), 0);
        assert_eq!(n(r#"{}"#), 0);
    }
}
