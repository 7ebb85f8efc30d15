//! Lenient field decoders for feed payloads.
//!
//! Inspection feeds are inconsistent about scalar encodings: zip codes and ids
//! arrive as numbers or strings, coordinates as numbers or numeric strings,
//! violations as a list or a single `|`-delimited string.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// String or number, blank strings become `None`.
pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_blank(&s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a string, found {other}"))),
    }
}

/// Number or numeric string, blank strings become `None`.
pub(crate) fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("number {n} is not representable as f64"))),
        Some(Value::String(s)) => match non_blank(&s) {
            None => Ok(None),
            Some(v) => v
                .parse::<f64>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number '{v}': {e}"))),
        },
        Some(other) => Err(D::Error::custom(format!("expected a number, found {other}"))),
    }
}

/// Parses a calendar date from the formats seen across feeds.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Date string in any supported format.
pub(crate) fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = opt_string(deserializer)? else {
        return Ok(None);
    };
    parse_date(&raw)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("unrecognized date '{raw}'")))
}

/// Splits a `|`-delimited violations string into trimmed entries.
pub(crate) fn split_violations(raw: &str) -> Vec<String> {
    raw.split('|').filter_map(non_blank).collect()
}

/// List of strings, or one `|`-delimited string.
pub(crate) fn violations<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(split_violations(&s)),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => non_blank(&s).map(Ok),
                Value::Null => None,
                other => Some(Err(D::Error::custom(format!(
                    "expected violation text, found {other}"
                )))),
            })
            .collect(),
        Some(other) => Err(D::Error::custom(format!(
            "expected a list or string of violations, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_string")]
        zip: Option<String>,
        #[serde(default, deserialize_with = "opt_f64")]
        lat: Option<f64>,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "violations")]
        violations: Vec<String>,
    }

    #[test]
    fn numbers_and_strings_are_both_accepted() {
        let p: Probe = serde_json::from_str(r#"{"zip": 60601, "lat": "41.5"}"#).unwrap();
        assert_eq!(p.zip.as_deref(), Some("60601"));
        assert_eq!(p.lat, Some(41.5));
        assert!(p.date.is_none());
        assert!(p.violations.is_empty());
    }

    #[test]
    fn blank_values_become_none() {
        let p: Probe = serde_json::from_str(r#"{"zip": "  ", "lat": ""}"#).unwrap();
        assert!(p.zip.is_none());
        assert!(p.lat.is_none());
    }

    #[test]
    fn dates_parse_in_feed_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 3, 1);
        assert_eq!(parse_date("2019-03-01"), expected);
        assert_eq!(parse_date("03/01/2019"), expected);
        assert_eq!(parse_date("2019-03-01T00:00:00.000"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn violations_accept_delimited_string_or_list() {
        let p: Probe =
            serde_json::from_str(r#"{"violations": "32. FOOD AND NON-FOOD | 33. SURFACES |"}"#)
                .unwrap();
        assert_eq!(p.violations, vec!["32. FOOD AND NON-FOOD", "33. SURFACES"]);

        let p: Probe = serde_json::from_str(r#"{"violations": ["a", null, " b "]}"#).unwrap();
        assert_eq!(p.violations, vec!["a", "b"]);
    }

    #[test]
    fn invalid_date_is_rejected() {
        let err = serde_json::from_str::<Probe>(r#"{"date": "soon"}"#).unwrap_err();
        assert!(err.to_string().contains("unrecognized date"));
    }
}
