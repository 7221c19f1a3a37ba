//! PostgreSQL row decoding into JSON values

use serde_json::{Map, Number, Value};
use sqlx::postgres::types::{PgInterval, PgTimeTz};
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind, PgValueFormat};
use sqlx::types::BigDecimal;
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

/// One result row: column name to value, in column order.
pub type RowMap = Map<String, Value>;

/// Zip a row's values with its column names.
///
/// A repeated column name keeps its first position and its last value.
pub fn row_to_map(row: &PgRow) -> RowMap {
    let mut map = RowMap::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn decode_column(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Value {
    let type_name = type_info.name();
    let raw = match row.try_get_raw(idx) {
        Ok(raw) if !raw.is_null() => raw,
        _ => return Value::Null,
    };

    if type_name == "NUMERIC" && raw.format() == PgValueFormat::Binary {
        if let Some(special) = raw.as_bytes().ok().and_then(numeric_special) {
            return Value::String(special.to_string());
        }
    }

    let decoded: Result<Value, sqlx::Error> = match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from),
        "OID" => row.try_get::<sqlx::postgres::types::Oid, _>(idx).map(|oid| Value::from(oid.0)),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|f| float_value(f as f64)),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(float_value),
        "NUMERIC" => row.try_get::<BigDecimal, _>(idx).map(|d| decimal_value(&d)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            row.try_get::<String, _>(idx).map(Value::String)
        }
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string())),
        "TIMETZ" => row
            .try_get::<PgTimeTz<chrono::NaiveTime, chrono::FixedOffset>, _>(idx)
            .map(|t| Value::String(format!("{}{}", t.time.format("%H:%M:%S%.f"), t.offset))),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|ts| Value::String(ts.to_rfc3339())),
        "INTERVAL" => row
            .try_get::<PgInterval, _>(idx)
            .map(|i| Value::String(interval_text(&i))),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(idx)
            .map(|u| Value::String(u.to_string())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
        "BOOL[]" => array_value::<bool, _>(row, idx, Value::Bool),
        "INT2[]" => array_value::<i16, _>(row, idx, Value::from),
        "INT4[]" => array_value::<i32, _>(row, idx, Value::from),
        "INT8[]" => array_value::<i64, _>(row, idx, Value::from),
        "FLOAT4[]" => array_value::<f32, _>(row, idx, |f| float_value(f as f64)),
        "FLOAT8[]" => array_value::<f64, _>(row, idx, float_value),
        "NUMERIC[]" => array_value::<BigDecimal, _>(row, idx, |d| decimal_value(&d)),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            array_value::<String, _>(row, idx, Value::String)
        }
        // enum labels travel as their UTF-8 text in both wire formats
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
            row.try_get_unchecked::<String, _>(idx).map(Value::String)
        }
        _ => Err(sqlx::Error::Decode(
            format!("no JSON mapping for {}", type_name).into(),
        )),
    };

    decoded.unwrap_or_else(|e| {
        debug!("Column {} ({}) not decoded: {}", idx, type_name, e);
        Value::String(format!("<unsupported type {}>", type_name))
    })
}

/// One-dimensional array with nullable elements.
fn array_value<T, F>(row: &PgRow, idx: usize, to_value: F) -> Result<Value, sqlx::Error>
where
    T: for<'a> Decode<'a, Postgres> + Type<Postgres> + PgHasArrayType,
    F: Fn(T) -> Value,
{
    row.try_get::<Vec<Option<T>>, _>(idx).map(|items| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map(&to_value).unwrap_or(Value::Null))
                .collect(),
        )
    })
}

/// NaN and the infinities have no BigDecimal form; read them off the
/// binary sign word (ndigits, weight, sign, dscale).
fn numeric_special(bytes: &[u8]) -> Option<&'static str> {
    let sign = u16::from_be_bytes([*bytes.get(4)?, *bytes.get(5)?]);
    match sign {
        0xC000 => Some("NaN"),
        0xD000 => Some("Infinity"),
        0xF000 => Some("-Infinity"),
        _ => None,
    }
}

/// NaN and infinities have no JSON number form.
fn float_value(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

/// A JSON number when serde_json accepts the digits, the exact text otherwise.
pub(crate) fn decimal_value(d: &BigDecimal) -> Value {
    let normalized = d.normalized();
    // a negative scale would print in exponent form and read back as a float
    let text = if normalized.as_bigint_and_exponent().1 < 0 {
        normalized.with_scale(0).to_string()
    } else {
        normalized.to_string()
    };
    text.parse::<Number>()
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

/// Postgres' own output style: `1 year 2 mons 3 days 04:05:06.5`.
fn interval_text(interval: &PgInterval) -> String {
    let mut parts: Vec<String> = [
        (interval.months / 12, "year"),
        (interval.months % 12, "mon"),
        (interval.days, "day"),
    ]
    .iter()
    .filter(|(n, _)| *n != 0)
    .map(|(n, unit)| format!("{} {}{}", n, unit, if n.abs() == 1 { "" } else { "s" }))
    .collect();

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            total / 3_600_000_000,
            (total / 60_000_000) % 60,
            (total / 1_000_000) % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            clock.push_str(format!(".{:06}", fraction).trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_value_as_number() {
        let d = BigDecimal::from_str("1250.50").unwrap();
        assert_eq!(decimal_value(&d), serde_json::json!(1250.5));

        let d = BigDecimal::from_str("42").unwrap();
        assert_eq!(decimal_value(&d), serde_json::json!(42));

        let d = BigDecimal::from_str("1500.00").unwrap();
        assert_eq!(decimal_value(&d), serde_json::json!(1500));
    }

    #[test]
    fn test_decimal_value_beyond_fixed_precision() {
        let d = BigDecimal::from_str("1000000000000000000000000000000.0000000000000000").unwrap();
        let value = decimal_value(&d);
        let f = value.as_f64().expect("large numeric should stay a number");
        assert!((f - 1e30).abs() / 1e30 < 1e-12);

        // out of f64 range: keep the digits
        let d = BigDecimal::from_str("1e400").unwrap();
        assert!(decimal_value(&d).is_string());
    }

    #[test]
    fn test_numeric_special_values() {
        // ndigits=0, weight=0, sign, dscale=0
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xC0, 0x00, 0, 0]), Some("NaN"));
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xD0, 0x00, 0, 0]), Some("Infinity"));
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xF0, 0x00, 0, 0]), Some("-Infinity"));
        assert_eq!(numeric_special(&[0, 1, 0, 0, 0x40, 0x00, 0, 0, 0, 7]), None);
        assert_eq!(numeric_special(&[0, 1]), None);
    }

    fn interval(months: i32, days: i32, microseconds: i64) -> PgInterval {
        PgInterval {
            months,
            days,
            microseconds,
        }
    }

    #[test]
    fn test_interval_text() {
        assert_eq!(interval_text(&interval(0, 1, 0)), "1 day");

        let clock = 4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000;
        assert_eq!(
            interval_text(&interval(14, 3, clock)),
            "1 year 2 mons 3 days 04:05:06.5"
        );

        assert_eq!(
            interval_text(&interval(0, -2, -3_600_000_000)),
            "-2 days -01:00:00"
        );
        assert_eq!(interval_text(&interval(0, 0, 0)), "00:00:00");
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), Value::String("NaN".to_string()));
    }
}
