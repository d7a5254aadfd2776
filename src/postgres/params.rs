use std::error::Error;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                _ if is_text(ty) => i.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => parse_decimal(&f.to_string())?.to_sql(ty, out),
                _ if is_text(ty) => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Text(s) => match *ty {
                Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
                Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
                Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
                Type::NUMERIC => parse_decimal(s)?.to_sql(ty, out),
                Type::BOOL => parse_bool(s)
                    .ok_or_else(|| format!("cannot read {s:?} as a boolean"))?
                    .to_sql(ty, out),
                Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
                Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => match s.trim().parse::<DateTime<FixedOffset>>() {
                    Ok(dt) => dt.to_sql(ty, out),
                    Err(_) => Utc.from_utc_datetime(&parse_timestamp(s)?).to_sql(ty, out),
                },
                Type::DATE => s.trim().parse::<NaiveDate>()?.to_sql(ty, out),
                Type::TIME => s.trim().parse::<NaiveTime>()?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                _ if is_text(ty) => s.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    RowValues::Int(i64::from(*b)).to_sql(ty, out)
                }
                _ if is_text(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(dt).to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                Type::TIME => dt.time().to_sql(ty, out),
                _ if is_text(ty) => dt.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => match *ty {
                Type::JSON | Type::JSONB => jsval.to_sql(ty, out),
                _ if is_text(ty) => jsval.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Blob(bytes) => match *ty {
                Type::BYTEA => bytes.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_text(ty)
            || matches!(
                *ty,
                Type::INT2
                    | Type::INT4
                    | Type::INT8
                    | Type::FLOAT4
                    | Type::FLOAT8
                    | Type::NUMERIC
                    | Type::BOOL
                    | Type::TIMESTAMP
                    | Type::TIMESTAMPTZ
                    | Type::DATE
                    | Type::TIME
                    | Type::JSON
                    | Type::JSONB
                    | Type::BYTEA
                    | Type::UUID
            )
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

/// Exact decimal from `12.50` or `1.5e3` style text.
fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let s = s.trim();
    s.parse::<Decimal>().or_else(|_| Decimal::from_scientific(s))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    s.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn mismatch(value: &RowValues, ty: &Type) -> Box<dyn Error + Sync + Send> {
    let kind = match value {
        RowValues::Int(_) => "an integer",
        RowValues::Float(_) => "a float",
        RowValues::Text(_) => "text",
        RowValues::Bool(_) => "a boolean",
        RowValues::Timestamp(_) => "a timestamp",
        RowValues::Null => "null",
        RowValues::JSON(_) => "JSON",
        RowValues::Blob(_) => "a blob",
    };
    format!("cannot bind {kind} to a {ty} parameter").into()
}

/// Midnight on `date`, the shape `date` columns come back in.
pub(crate) fn date_at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}
