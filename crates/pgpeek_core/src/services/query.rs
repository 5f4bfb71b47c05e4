//! Query execution and row conversion.
//!
//! Statements are prepared first so the result columns are known even when no row matches.
//! Every cell is converted to a `serde_json::Value` for display and export.

use crate::error::PeekError;
use crate::models::{ColumnInfo, ResultSet, Row, SelectQuery};
use crate::services::connection::PooledConnection;

use chrono::Utc;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::time::Instant;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use uuid::Uuid;

/// Service for executing table queries.
pub struct QueryService;

impl QueryService {
    /// Run a table query and capture its columns and rows.
    pub async fn execute(
        conn: &PooledConnection,
        query: &SelectQuery,
    ) -> Result<ResultSet, PeekError> {
        let query_id = Uuid::new_v4();
        let start = Instant::now();
        let sql = query.sql();
        let values = query.params();
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        tracing::debug!(
            query_id = %query_id,
            connection_id = %conn.connection_id(),
            sql = %sql,
            param_count = params.len(),
            "Executing query"
        );

        let result = Self::run(conn, &sql, &params).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((columns, rows)) => {
                tracing::debug!(
                    query_id = %query_id,
                    execution_time_ms,
                    row_count = rows.len(),
                    "Query completed"
                );
                ResultSet::new(query_id, columns, rows, execution_time_ms)
            }
            Err(e) => {
                tracing::warn!(
                    query_id = %query_id,
                    execution_time_ms,
                    error = %e,
                    "Query failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        conn: &PooledConnection,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<(Vec<ColumnInfo>, Vec<Row>), PeekError> {
        let statement = conn.prepare(sql).await?;

        let columns = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_().oid(), col.type_().name()))
            .collect();

        let rows = conn.query_statement(&statement, params).await?;
        Ok((columns, rows.iter().map(row_to_json).collect()))
    }
}

/// Convert a PostgreSQL row to JSON values.
pub fn row_to_json(row: &tokio_postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| match col.type_().clone() {
            Type::BOOL => cell::<bool>(row, i, JsonValue::Bool),
            Type::INT2 => cell::<i16>(row, i, |v| JsonValue::Number(v.into())),
            Type::INT4 => cell::<i32>(row, i, |v| JsonValue::Number(v.into())),
            Type::INT8 => cell::<i64>(row, i, |v| JsonValue::Number(v.into())),
            Type::OID => cell::<u32>(row, i, |v| JsonValue::Number(v.into())),
            Type::FLOAT4 => cell::<f32>(row, i, float4_value),
            Type::FLOAT8 => cell::<f64>(row, i, float_value),
            Type::NUMERIC => cell::<PgNumeric>(row, i, |v| JsonValue::String(v.0)),
            Type::MONEY => cell::<PgMoney>(row, i, |v| JsonValue::String(v.0)),
            Type::UUID => cell::<Uuid>(row, i, |v| JsonValue::String(v.to_string())),
            Type::JSON | Type::JSONB => cell::<JsonValue>(row, i, |v| v),
            Type::TIMESTAMPTZ => {
                cell::<chrono::DateTime<Utc>>(row, i, |v| JsonValue::String(v.to_rfc3339()))
            }
            Type::TIMESTAMP => {
                cell::<chrono::NaiveDateTime>(row, i, |v| JsonValue::String(v.to_string()))
            }
            Type::DATE => cell::<chrono::NaiveDate>(row, i, |v| JsonValue::String(v.to_string())),
            Type::TIME => cell::<chrono::NaiveTime>(row, i, |v| JsonValue::String(v.to_string())),
            Type::TIMETZ => cell::<PgTimeTz>(row, i, |v| JsonValue::String(v.0)),
            Type::INTERVAL => cell::<PgInterval>(row, i, |v| JsonValue::String(v.0)),
            Type::INET | Type::CIDR => cell::<PgInet>(row, i, |v| JsonValue::String(v.0)),
            Type::MACADDR | Type::MACADDR8 => cell::<PgMacAddr>(row, i, |v| JsonValue::String(v.0)),
            Type::BYTEA => cell::<Vec<u8>>(row, i, |v| JsonValue::String(hex_bytes(&v))),
            Type::BOOL_ARRAY => array::<bool>(row, i, JsonValue::Bool),
            Type::INT2_ARRAY => array::<i16>(row, i, |v| JsonValue::Number(v.into())),
            Type::INT4_ARRAY => array::<i32>(row, i, |v| JsonValue::Number(v.into())),
            Type::INT8_ARRAY => array::<i64>(row, i, |v| JsonValue::Number(v.into())),
            Type::FLOAT4_ARRAY => array::<f32>(row, i, float4_value),
            Type::FLOAT8_ARRAY => array::<f64>(row, i, float_value),
            Type::NUMERIC_ARRAY => array::<PgNumeric>(row, i, |v| JsonValue::String(v.0)),
            Type::DATE_ARRAY => {
                array::<chrono::NaiveDate>(row, i, |v| JsonValue::String(v.to_string()))
            }
            Type::UUID_ARRAY => array::<Uuid>(row, i, |v| JsonValue::String(v.to_string())),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
                array::<String>(row, i, JsonValue::String)
            }
            ty if RawText::accepts(&ty) => raw_cell(row, i),
            _ => opaque_cell(row, i),
        })
        .collect()
}

type DecodeError = Box<dyn Error + Sync + Send>;

/// Decode one cell as `T`. A value that does not decode shows as its type label.
fn cell<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    index: usize,
    convert: impl FnOnce(T) -> JsonValue,
) -> JsonValue {
    match row.try_get::<_, Option<T>>(index) {
        Ok(Some(value)) => convert(value),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::trace!(column = index, error = %e, "Cell did not decode");
            opaque_cell(row, index)
        }
    }
}

/// Decode a one-dimensional array; NULL elements stay NULL.
fn array<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    index: usize,
    convert: impl Fn(T) -> JsonValue,
) -> JsonValue {
    cell::<Vec<Option<T>>>(row, index, |items| array_value(items, convert))
}

fn array_value<T>(items: Vec<Option<T>>, convert: impl Fn(T) -> JsonValue) -> JsonValue {
    JsonValue::Array(items.into_iter().map(|item| item.map_or(JsonValue::Null, &convert)).collect())
}

fn raw_cell(row: &tokio_postgres::Row, index: usize) -> JsonValue {
    match row.try_get::<_, Option<RawText>>(index) {
        Ok(Some(text)) => JsonValue::String(text.0),
        Ok(None) => JsonValue::Null,
        Err(_) => opaque_cell(row, index),
    }
}

/// NULL, or the `<type>` label for a value with no text rendering.
fn opaque_cell(row: &tokio_postgres::Row, index: usize) -> JsonValue {
    match row.try_get::<_, Option<Opaque>>(index) {
        Ok(None) => JsonValue::Null,
        _ => JsonValue::String(format!("<{}>", row.columns()[index].type_().name())),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// `real` keeps its shortest decimal form (0.1, not 0.10000000149011612).
fn float4_value(v: f32) -> JsonValue {
    float_value(v.to_string().parse::<f64>().unwrap_or(f64::from(v)))
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn be_bytes<const N: usize>(raw: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    raw.get(offset..offset + N)
        .and_then(|b| <[u8; N]>::try_from(b).ok())
        .ok_or_else(|| "value is truncated".into())
}

/// Types whose binary wire form is their text: character types, enums, `citext`.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(RawText(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::CHAR
                | Type::XML
                | Type::UNKNOWN
        ) || ty.name() == "citext"
            || matches!(ty.kind(), Kind::Enum(_))
    }
}

/// Accepts any value without reading it.
struct Opaque;

impl<'a> FromSql<'a> for Opaque {
    fn from_sql(_ty: &Type, _raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(Opaque)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// `interval` in the server's default output style (`1 year 2 mons 3 days 04:05:06`).
struct PgInterval(String);

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let micros = i64::from_be_bytes(be_bytes(raw, 0)?);
        let days = i32::from_be_bytes(be_bytes(raw, 8)?);
        let months = i32::from_be_bytes(be_bytes(raw, 12)?);
        Ok(PgInterval(format_interval(months, days, micros)))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

fn format_interval(months: i32, days: i32, micros: i64) -> String {
    let mut out = String::new();
    let mut after_negative = false;

    for (value, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        if value == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        if after_negative && value > 0 {
            out.push('+');
        }
        let plural = if value == 1 { "" } else { "s" };
        let _ = write!(out, "{value} {unit}{plural}");
        after_negative = value < 0;
    }

    if out.is_empty() || micros != 0 {
        if !out.is_empty() {
            out.push(' ');
        }
        if micros < 0 {
            out.push('-');
        } else if after_negative {
            out.push('+');
        }
        out.push_str(&clock(micros.unsigned_abs()));
    }
    out
}

/// `HH:MM:SS` plus a fraction without trailing zeros. Hours are not wrapped at 24.
fn clock(micros: u64) -> String {
    let secs = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let mut out = format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    if fraction != 0 {
        let digits = format!("{fraction:06}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// `timetz` as `HH:MM:SS[.ffffff]+HH[:MM[:SS]]`.
struct PgTimeTz(String);

impl<'a> FromSql<'a> for PgTimeTz {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let micros = u64::try_from(i64::from_be_bytes(be_bytes(raw, 0)?))?;
        // Stored as seconds west of UTC
        let zone = i32::from_be_bytes(be_bytes(raw, 8)?);

        let offset = zone.checked_neg().ok_or("time zone offset out of range")?;
        let sign = if offset < 0 { '-' } else { '+' };
        let abs = offset.unsigned_abs();
        let mut out = format!("{}{sign}{:02}", clock(micros), abs / 3600);
        let (minutes, seconds) = (abs / 60 % 60, abs % 60);
        if minutes != 0 || seconds != 0 {
            write!(out, ":{minutes:02}")?;
        }
        if seconds != 0 {
            write!(out, ":{seconds:02}")?;
        }
        Ok(PgTimeTz(out))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIMETZ
    }
}

/// `money` as a plain decimal with two fraction digits, without currency symbol.
struct PgMoney(String);

impl<'a> FromSql<'a> for PgMoney {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let cents = i64::from_be_bytes(be_bytes(raw, 0)?);
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        Ok(PgMoney(format!("{sign}{}.{:02}", abs / 100, abs % 100)))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::MONEY
    }
}

/// `inet` and `cidr`; the prefix length is shown for networks and partial masks.
struct PgInet(String);

const PGSQL_AF_INET: u8 = 2;
const PGSQL_AF_INET6: u8 = 3;

impl<'a> FromSql<'a> for PgInet {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let [family, bits, is_cidr, len] = be_bytes::<4>(raw, 0)?;
        let addr = raw.get(4..4 + len as usize).ok_or("inet value is truncated")?;

        let (ip, max_bits) = match family {
            PGSQL_AF_INET => (IpAddr::from(<[u8; 4]>::try_from(addr)?), 32),
            PGSQL_AF_INET6 => (IpAddr::from(<[u8; 16]>::try_from(addr)?), 128),
            other => return Err(format!("unknown inet family {other}").into()),
        };

        if is_cidr != 0 || bits != max_bits {
            Ok(PgInet(format!("{ip}/{bits}")))
        } else {
            Ok(PgInet(ip.to_string()))
        }
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INET || *ty == Type::CIDR
    }
}

/// `macaddr` and `macaddr8` as colon-separated hex.
struct PgMacAddr(String);

impl<'a> FromSql<'a> for PgMacAddr {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        if raw.len() != 6 && raw.len() != 8 {
            return Err(format!("invalid mac address length {}", raw.len()).into());
        }
        let parts: Vec<String> = raw.iter().map(|b| format!("{b:02x}")).collect();
        Ok(PgMacAddr(parts.join(":")))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::MACADDR || *ty == Type::MACADDR8
    }
}

/// A `numeric` value rendered to its exact decimal text.
struct PgNumeric(String);

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        decode_numeric(raw).map(PgNumeric)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Decode the binary `numeric` wire format: ndigits, weight, sign, dscale, then base-10000
/// digits.
fn decode_numeric(raw: &[u8]) -> Result<String, DecodeError> {
    let read_u16 = |offset: usize| -> Result<u16, DecodeError> {
        raw.get(offset..offset + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "numeric value is truncated".into())
    };

    let ndigits = read_u16(0)? as usize;
    let weight = read_u16(2)? as i16 as i32;
    let sign = read_u16(4)?;
    let dscale = read_u16(6)? as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| read_u16(8 + i * 2))
        .collect::<Result<Vec<u16>, _>>()?;
    let digit_at = |index: i32| -> u16 {
        if index >= 0 {
            digits.get(index as usize).copied().unwrap_or(0)
        } else {
            0
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for index in 0..=weight {
            if index == 0 {
                write!(out, "{}", digit_at(index))?;
            } else {
                write!(out, "{:04}", digit_at(index))?;
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut index = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit_at(index))?;
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}
