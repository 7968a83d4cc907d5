//! # JSON Parameter Binding
//!
//! Request values arrive as untyped JSON while the server infers a concrete
//! type for every placeholder. `JsonParam` encodes a JSON value as whatever
//! type the server asked for, so `age > $1` binds an `int4` and
//! `name = $1` binds text from the same kind of request.
//!
//! Values are sent in binary form when the type has one here and the value
//! converts cleanly. Everything else (inet, interval, bytea, a date-only
//! timestamp, ...) is sent in text form and parsed by the server.

use std::error::Error;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use pg_bigdecimal::{BigDecimal, PgNumeric};
use serde_json::Value;
use tokio_postgres::types::{to_sql_checked, Format, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A JSON value bound to a statement placeholder
#[derive(Debug)]
pub struct JsonParam<'a>(pub &'a Value);

impl JsonParam<'_> {
    /// Whether the value is written in `ty`'s binary form
    fn is_binary(&self, ty: &Type) -> bool {
        let value = self.0;
        if value.is_null() {
            return true;
        }

        match ty.kind() {
            Kind::Domain(inner) => return JsonParam(value).is_binary(inner),
            Kind::Enum(_) => return true,
            Kind::Array(member) => {
                return value
                    .as_array()
                    .map_or(true, |items| items.iter().all(|v| JsonParam(v).is_binary(member)))
            }
            _ => {}
        }

        match *ty {
            Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::JSON
            | Type::JSONB
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN => true,
            Type::NUMERIC => parse_numeric(value).is_some(),
            Type::UUID => value.as_str().and_then(parse_uuid).is_some(),
            Type::DATE => value.as_str().and_then(parse_date).is_some(),
            Type::TIME => value.as_str().and_then(parse_time).is_some(),
            Type::TIMESTAMP => value.as_str().and_then(parse_timestamp).is_some(),
            Type::TIMESTAMPTZ => value.as_str().and_then(parse_timestamptz).is_some(),
            _ => ty.name() == "citext",
        }
    }
}

impl ToSql for JsonParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let value = self.0;
        if value.is_null() {
            return Ok(IsNull::Yes);
        }

        if !self.is_binary(ty) {
            out.extend_from_slice(text_form(value, ty).as_bytes());
            return Ok(IsNull::No);
        }

        match ty.kind() {
            Kind::Domain(inner) => return JsonParam(value).to_sql(inner, out),
            Kind::Enum(_) => return as_text(value).as_str().to_sql(ty, out),
            Kind::Array(_) => {
                let items = value.as_array().ok_or_else(|| mismatch(value, ty))?;
                let params: Vec<JsonParam<'_>> = items.iter().map(JsonParam).collect();
                return params.to_sql(ty, out);
            }
            _ => {}
        }

        match *ty {
            Type::BOOL => as_bool(value, ty)?.to_sql(ty, out),
            Type::INT2 => i16::try_from(as_i64(value, ty)?)
                .map_err(|_| out_of_range(value, ty))?
                .to_sql(ty, out),
            Type::INT4 => i32::try_from(as_i64(value, ty)?)
                .map_err(|_| out_of_range(value, ty))?
                .to_sql(ty, out),
            Type::INT8 => as_i64(value, ty)?.to_sql(ty, out),
            Type::OID => u32::try_from(as_i64(value, ty)?)
                .map_err(|_| out_of_range(value, ty))?
                .to_sql(ty, out),
            Type::FLOAT4 => (as_f64(value, ty)? as f32).to_sql(ty, out),
            Type::FLOAT8 => as_f64(value, ty)?.to_sql(ty, out),
            Type::NUMERIC => parse_numeric(value)
                .ok_or_else(|| mismatch(value, ty))?
                .to_sql(ty, out),
            Type::JSON | Type::JSONB => value.to_sql(ty, out),
            Type::UUID => parsed(value, ty, parse_uuid)?.to_sql(ty, out),
            Type::DATE => parsed(value, ty, parse_date)?.to_sql(ty, out),
            Type::TIME => parsed(value, ty, parse_time)?.to_sql(ty, out),
            Type::TIMESTAMP => parsed(value, ty, parse_timestamp)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => parsed(value, ty, parse_timestamptz)?.to_sql(ty, out),
            _ => as_text(value).as_str().to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if self.is_binary(ty) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    to_sql_checked!();
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {value} to a parameter of type {ty}").into()
}

fn out_of_range(value: &Value, ty: &Type) -> BoxError {
    format!("{value} is out of range for type {ty}").into()
}

fn as_bool(value: &Value, ty: &Type) -> Result<bool, BoxError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(mismatch(value, ty)),
    }
}

fn as_i64(value: &Value, ty: &Type) -> Result<i64, BoxError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| mismatch(value, ty)),
        Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn as_f64(value: &Value, ty: &Type) -> Result<f64, BoxError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(value, ty)),
        Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn parsed<T>(value: &Value, ty: &Type, parse: fn(&str) -> Option<T>) -> Result<T, BoxError> {
    value
        .as_str()
        .and_then(parse)
        .ok_or_else(|| mismatch(value, ty))
}

/// Text form of a value: strings as-is, anything else as JSON text
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text-format encoding for the server's input parser
fn text_form(value: &Value, ty: &Type) -> String {
    match (ty.kind(), value) {
        (Kind::Domain(inner), _) => text_form(value, inner),
        (Kind::Array(_), Value::Array(items)) => array_literal(items),
        _ => as_text(value),
    }
}

/// `{"a","b",NULL}` array input syntax
fn array_literal(items: &[Value]) -> String {
    let mut literal = String::from("{");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        match item {
            Value::Null => literal.push_str("NULL"),
            Value::Array(inner) => literal.push_str(&array_literal(inner)),
            other => {
                literal.push('"');
                for c in as_text(other).chars() {
                    if c == '"' || c == '\\' {
                        literal.push('\\');
                    }
                    literal.push(c);
                }
                literal.push('"');
            }
        }
    }
    literal.push('}');
    literal
}

fn parse_numeric(value: &Value) -> Option<PgNumeric> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text == "NaN" {
        return Some(PgNumeric { n: None });
    }
    BigDecimal::from_str(&text)
        .ok()
        .map(|n| PgNumeric { n: Some(n) })
}

fn parse_uuid(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s).ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Only strings carrying an explicit offset; the rest use the session zone
fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
