/// Timestamps reported by devices.
pub mod date_time {
    use chrono::{DateTime, Utc};

    /// Parses an RFC 3339 string such as `2024-05-01T08:30:00Z` or
    /// `2024-05-01T08:30:00.123+05:30`.
    pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
    }
}

/// Lenient conversions for loosely typed JSON input. Clients written in
/// dynamically typed languages tend to send numbers as strings and ids as
/// numbers.
pub mod coerce {
    use serde_json::Value;

    /// A finite float from a JSON number or a string holding one.
    pub fn to_f64(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        number.is_finite().then_some(number)
    }

    /// A non-empty identifier from a JSON string or integer.
    pub fn to_id(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Value::Number(number) if number.is_u64() || number.is_i64() => {
                Some(number.to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{coerce, date_time};

    #[test]
    fn parses_offsets_into_utc() {
        let parsed = date_time::parse_rfc3339("2024-05-01T14:00:00+05:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn coerces_numeric_strings() {
        assert_eq!(coerce::to_f64(&json!("13.08")), Some(13.08));
        assert_eq!(coerce::to_f64(&json!(80.27)), Some(80.27));
        assert_eq!(coerce::to_f64(&json!(0)), Some(0.0));
        assert_eq!(coerce::to_f64(&json!("north")), None);
        assert_eq!(coerce::to_f64(&json!("NaN")), None);
        assert_eq!(coerce::to_f64(&json!(null)), None);
    }

    #[test]
    fn coerces_ids() {
        assert_eq!(coerce::to_id(&json!(" B1 ")), Some("B1".to_owned()));
        assert_eq!(coerce::to_id(&json!(42)), Some("42".to_owned()));
        assert_eq!(coerce::to_id(&json!("")), None);
        assert_eq!(coerce::to_id(&json!(1.5)), None);
        assert_eq!(coerce::to_id(&json!({"id": 1})), None);
    }
}
