use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use super::params::date_at_midnight;
use crate::error::BoxError;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Timestamps with time zone come back as naive UTC, dates as midnight, numerics as their
/// exact decimal text.
///
/// # Errors
/// Returns the driver error if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let type_info = row.columns()[idx].type_();

    match *type_info {
        Type::INT2 => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        Type::INT4 => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        Type::INT8 => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        Type::FLOAT4 => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))))
        }
        Type::FLOAT8 => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        Type::NUMERIC => {
            let val: Option<Decimal> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string())))
        }
        Type::BOOL => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        Type::TIMESTAMP => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        Type::TIMESTAMPTZ => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())))
        }
        Type::DATE => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| {
                RowValues::Timestamp(date_at_midnight(v))
            }))
        }
        Type::TIME => {
            let val: Option<NaiveTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string())))
        }
        Type::JSON | Type::JSONB => {
            let val: Option<Value> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        Type::BYTEA => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        Type::UUID => {
            let val: Option<uuid::Uuid> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string())))
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
        _ => {
            // enums, citext and friends arrive as UTF-8; anything else stays raw
            let val: Option<RawValue> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| match String::from_utf8(v.0) {
                Ok(text) => RowValues::Text(text),
                Err(e) => RowValues::Blob(e.into_bytes()),
            }))
        }
    }
}

struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
