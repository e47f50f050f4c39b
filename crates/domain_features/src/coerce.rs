//! Lenient coercion of loosely typed JSON values
//!
//! Each helper returns `None` when the value cannot be read as the requested
//! type; the extractor decides the default.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Reads an integer from a JSON integer, an integral float, or an integer string
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Reads a finite number from a JSON number or a numeric string
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Reads a yes/no flag
pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) => match as_integer(value)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Counts conditions in free text (by words) or in a list (non-empty entries)
pub fn count_conditions(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(0),
        Value::String(s) => Some(s.split_whitespace().count()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| match item {
                    Value::Null => false,
                    Value::String(s) => !s.trim().is_empty(),
                    _ => true,
                })
                .count(),
        ),
        _ => None,
    }
}

/// Reads a timestamp, localizing offset-less values into `timezone`
///
/// Accepts RFC 3339 strings, naive date-times, plain dates, epoch
/// milliseconds and extended-JSON `{"$date": …}` wrappers.
pub fn as_datetime(value: &Value, timezone: Tz) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => parse_datetime_str(s.trim(), timezone),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.fixed_offset())
        }
        Value::Object(map) => map.get("$date").and_then(|inner| as_datetime(inner, timezone)),
        _ => None,
    }
}

fn parse_datetime_str(s: &str, timezone: Tz) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_as_integer() {
        assert_eq!(as_integer(&json!(4)), Some(4));
        assert_eq!(as_integer(&json!(4.0)), Some(4));
        assert_eq!(as_integer(&json!(" 7 ")), Some(7));
        assert_eq!(as_integer(&json!(2.5)), None);
        assert_eq!(as_integer(&json!("2.5")), None);
        assert_eq!(as_integer(&json!("abc")), None);
        assert_eq!(as_integer(&json!(true)), None);
        assert_eq!(as_integer(&Value::Null), None);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&json!(12.5)), Some(12.5));
        assert_eq!(as_number(&json!("1200.75")), Some(1200.75));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!("inf")), None);
        assert_eq!(as_number(&json!([1])), None);
    }

    #[test]
    fn test_as_flag() {
        assert_eq!(as_flag(&json!(true)), Some(true));
        assert_eq!(as_flag(&json!("Yes")), Some(true));
        assert_eq!(as_flag(&json!(0)), Some(false));
        assert_eq!(as_flag(&json!(3)), None);
        assert_eq!(as_flag(&json!("sometimes")), None);
    }

    #[test]
    fn test_count_conditions() {
        assert_eq!(count_conditions(&json!("asthma diabetes")), Some(2));
        assert_eq!(count_conditions(&json!("")), Some(0));
        assert_eq!(count_conditions(&json!(["asthma", "", null, "hypertension"])), Some(2));
        assert_eq!(count_conditions(&Value::Null), Some(0));
        assert_eq!(count_conditions(&json!(5)), None);
    }

    #[test]
    fn test_datetime_with_offset() {
        let dt = as_datetime(&json!("1990-06-15T00:00:00Z"), Tz::UTC).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (1990, 6, 15));
    }

    #[test]
    fn test_naive_date_is_localized() {
        let dt = as_datetime(&json!("1990-06-15"), chrono_tz::Europe::Paris).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_extended_json_date() {
        let dt = as_datetime(&json!({"$date": "1985-01-02T10:00:00.000Z"}), Tz::UTC).unwrap();
        assert_eq!(dt.year(), 1985);
        assert!(as_datetime(&json!({"$oid": "x"}), Tz::UTC).is_none());
    }

    #[test]
    fn test_epoch_millis() {
        let dt = as_datetime(&json!(0), Tz::UTC).unwrap();
        assert_eq!(dt.year(), 1970);
    }
}
