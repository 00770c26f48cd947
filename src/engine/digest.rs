//! Conversion of driver-native values into portable [`Value`]s.
//!
//! Each native engine wraps dates, decimals and wide integers in its own
//! types. Digestion turns them into the handful of scalars a [`Value`] holds:
//! decimals become floats, dates and timestamps become ISO text.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row as SqlxRow, TypeInfo, ValueRef as SqlxValueRef};

use crate::table::Value;

/// Digests one PostgreSQL cell received in text format.
///
/// `type_name` is the column's type as sqlx reports it (`INT4`, `NUMERIC`,
/// `DATE`, ...). Text that does not parse as the declared type is kept as a
/// string.
pub fn postgres_text(type_name: &str, text: Option<&str>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };

    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => match text {
            "t" | "true" => Value::Bool(true),
            "f" | "false" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },

        "INT2" | "SMALLINT" | "INT4" | "INT" | "INTEGER" | "INT8" | "BIGINT" | "OID" => text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(text.to_string())),

        "FLOAT4" | "REAL" | "FLOAT8" | "DOUBLE PRECISION" | "NUMERIC" | "DECIMAL" => text
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(text.to_string())),

        "BYTEA" => decode_bytea(text)
            .map(Value::Bytes)
            .unwrap_or_else(|| Value::String(text.to_string())),

        // DATE, TIMESTAMP, TIMESTAMPTZ, JSON, arrays: Postgres already prints ISO text.
        _ => Value::String(text.to_string()),
    }
}

/// Decodes the `\x0a1b` hex form Postgres uses for `bytea`.
fn decode_bytea(text: &str) -> Option<Vec<u8>> {
    let hex = text.strip_prefix("\\x")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Digests one SQLite cell by its storage class.
pub fn sqlite_cell(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Digests one DuckDB cell.
pub fn duckdb_cell(value: duckdb::types::ValueRef<'_>) -> Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Int(i as i64),
        ValueRef::SmallInt(i) => Value::Int(i as i64),
        ValueRef::Int(i) => Value::Int(i as i64),
        ValueRef::BigInt(i) => Value::Int(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        ValueRef::UTinyInt(i) => Value::Int(i as i64),
        ValueRef::USmallInt(i) => Value::Int(i as i64),
        ValueRef::UInt(i) => Value::Int(i as i64),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        ValueRef::Float(f) => Value::Float(f as f64),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::String(text))
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
        ValueRef::Date32(days) => chrono::DateTime::from_timestamp(days as i64 * 86_400, 0)
            .map(|dt| Value::String(dt.date_naive().to_string()))
            .unwrap_or(Value::Int(days as i64)),
        ValueRef::Timestamp(unit, raw) => {
            let micros = unit.to_micros(raw);
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| Value::String(dt.naive_utc().to_string()))
                .unwrap_or(Value::Int(micros))
        }
        other => Value::String(format!("{:?}", duckdb::types::Value::from(other))),
    }
}

/// Normalizes a cell before it lands in a frame.
///
/// Negative zero becomes zero and non-finite floats become text, so frames
/// compare and print the same whichever engine produced them.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Float(f) if f == 0.0 => Value::Float(0.0),
        Value::Float(f) if !f.is_finite() => Value::String(f.to_string()),
        other => other,
    }
}
