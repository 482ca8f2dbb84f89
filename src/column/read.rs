//! Wire-to-column decoders. One dispatch keyed on the canonical type name;
//! nested kinds recurse through boxed futures since the stream cannot be
//! pre-sliced (column byte lengths are not declared ahead of the data).

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::column::data::{Column, ColumnData};
use crate::column::enums::EnumIndex;
use crate::column::value::{I256, U256};
use crate::error::{Error, Result};
use crate::types::TypeInfo;
use crate::wire::reader::ProtocolReader;

pub(crate) type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Dictionary headers of the `LowCardinality` wire form.
pub(crate) const LOW_CARDINALITY_VERSION: u64 = 1;
pub(crate) const HAS_ADDITIONAL_KEYS: u64 = 1 << 9;
pub(crate) const NEED_UPDATE_DICTIONARY: u64 = 1 << 10;

/// Materialises one column of `rows` values.
pub async fn read_column<S>(
    reader: &mut ProtocolReader<S>,
    type_info: &Arc<TypeInfo>,
    rows: usize,
) -> Result<Column>
where
    S: AsyncRead + Unpin + Send,
{
    let data = read_column_data(reader, type_info, rows).await?;
    Ok(Column::new(Arc::clone(type_info), data))
}

async fn read_fixed<S, T, const N: usize>(
    r: &mut ProtocolReader<S>,
    rows: usize,
    decode: fn([u8; N]) -> T,
) -> Result<Vec<T>>
where
    S: AsyncRead + Unpin + Send,
{
    let bytes = r.read_vec(rows * N).await?;
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| decode(chunk.try_into().unwrap()))
        .collect())
}

pub(crate) fn parse_tz(t: &Arc<TypeInfo>, arg: usize) -> Result<Option<Tz>> {
    match t.str_arg(arg) {
        None => Ok(None),
        Some(name) => Tz::from_str(name).map(Some).map_err(|_| Error::MalformedTypeName {
            name: t.full_name.clone(),
            reason: format!("unknown time zone `{name}`"),
        }),
    }
}

pub(crate) fn datetime64_precision(t: &Arc<TypeInfo>) -> Result<u8> {
    let precision = t.int_arg(0).unwrap_or(3);
    if !(0..=9).contains(&precision) {
        return Err(Error::MalformedTypeName {
            name: t.full_name.clone(),
            reason: format!("DateTime64 precision {precision} out of range"),
        });
    }
    Ok(precision as u8)
}

pub(crate) fn decimal_scale(t: &Arc<TypeInfo>, arg: usize) -> Result<u8> {
    let scale = t
        .int_arg(arg)
        .ok_or_else(|| Error::TypeNotFullySpecified(t.full_name.clone()))?;
    if !(0..=76).contains(&scale) {
        return Err(Error::MalformedTypeName {
            name: t.full_name.clone(),
            reason: format!("decimal scale {scale} out of range"),
        });
    }
    Ok(scale as u8)
}

/// Storage width of the generic `Decimal(P, S)` form, from its precision.
pub(crate) fn decimal_width(t: &Arc<TypeInfo>) -> Result<u32> {
    let precision = t
        .int_arg(0)
        .ok_or_else(|| Error::TypeNotFullySpecified(t.full_name.clone()))?;
    match precision {
        1..=9 => Ok(32),
        10..=18 => Ok(64),
        19..=38 => Ok(128),
        39..=76 => Ok(256),
        _ => Err(Error::MalformedTypeName {
            name: t.full_name.clone(),
            reason: format!("decimal precision {precision} out of range"),
        }),
    }
}

pub(crate) fn fixed_string_width(t: &Arc<TypeInfo>) -> Result<usize> {
    match t.int_arg(0) {
        Some(w) if w > 0 => Ok(w as usize),
        _ => Err(Error::TypeNotFullySpecified(t.full_name.clone())),
    }
}

/// ClickHouse stores a UUID as two little-endian 64-bit halves.
fn decode_uuid(wire: [u8; 16]) -> Uuid {
    let mut bytes = wire;
    bytes[..8].reverse();
    bytes[8..].reverse();
    Uuid::from_bytes(bytes)
}

pub(crate) fn low_cardinality_inner(
    t: &Arc<TypeInfo>,
) -> Result<(Arc<TypeInfo>, bool)> {
    let inner = t.generic(0)?;
    if inner.name == "Nullable" {
        Ok((Arc::clone(inner.generic(0)?), true))
    } else {
        Ok((Arc::clone(inner), false))
    }
}

fn read_column_data<'r, S>(
    r: &'r mut ProtocolReader<S>,
    t: &'r Arc<TypeInfo>,
    rows: usize,
) -> BoxFut<'r, ColumnData>
where
    S: AsyncRead + Unpin + Send,
{
    Box::pin(async move {
        match t.name.as_str() {
            "Int8" => Ok(ColumnData::Int8(
                read_fixed(r, rows, |b: [u8; 1]| b[0] as i8).await?,
            )),
            "Int16" => Ok(ColumnData::Int16(read_fixed(r, rows, i16::from_le_bytes).await?)),
            "Int32" => Ok(ColumnData::Int32(read_fixed(r, rows, i32::from_le_bytes).await?)),
            "Int64" => Ok(ColumnData::Int64(read_fixed(r, rows, i64::from_le_bytes).await?)),
            "Int128" => Ok(ColumnData::Int128(
                read_fixed(r, rows, i128::from_le_bytes).await?,
            )),
            "Int256" => Ok(ColumnData::Int256(
                read_fixed(r, rows, I256::from_le_bytes).await?,
            )),
            "UInt8" => Ok(ColumnData::UInt8(r.read_vec(rows).await?)),
            "UInt16" => Ok(ColumnData::UInt16(read_fixed(r, rows, u16::from_le_bytes).await?)),
            "UInt32" => Ok(ColumnData::UInt32(read_fixed(r, rows, u32::from_le_bytes).await?)),
            "UInt64" => Ok(ColumnData::UInt64(read_fixed(r, rows, u64::from_le_bytes).await?)),
            "UInt128" => Ok(ColumnData::UInt128(
                read_fixed(r, rows, u128::from_le_bytes).await?,
            )),
            "UInt256" => Ok(ColumnData::UInt256(
                read_fixed(r, rows, U256::from_le_bytes).await?,
            )),
            "Float32" => Ok(ColumnData::Float32(
                read_fixed(r, rows, f32::from_le_bytes).await?,
            )),
            "Float64" => Ok(ColumnData::Float64(
                read_fixed(r, rows, f64::from_le_bytes).await?,
            )),
            "Bool" => Ok(ColumnData::Bool(r.read_vec(rows).await?)),
            "String" => {
                let mut out = Vec::with_capacity(rows);
                for _ in 0..rows {
                    out.push(r.read_str_bytes().await?);
                }
                Ok(ColumnData::String(out))
            }
            "FixedString" => {
                let width = fixed_string_width(t)?;
                let bytes = r.read_vec(width * rows).await?;
                Ok(ColumnData::FixedString { width, bytes })
            }
            "UUID" => Ok(ColumnData::Uuid(read_fixed(r, rows, decode_uuid).await?)),
            "Date" => Ok(ColumnData::Date(read_fixed(r, rows, u16::from_le_bytes).await?)),
            "Date32" => Ok(ColumnData::Date32(
                read_fixed(r, rows, i32::from_le_bytes).await?,
            )),
            "DateTime" => Ok(ColumnData::DateTime {
                tz: parse_tz(t, 0)?,
                values: read_fixed(r, rows, u32::from_le_bytes).await?,
            }),
            "DateTime64" => Ok(ColumnData::DateTime64 {
                precision: datetime64_precision(t)?,
                tz: parse_tz(t, 1)?,
                values: read_fixed(r, rows, i64::from_le_bytes).await?,
            }),
            "Decimal32" => Ok(ColumnData::Decimal32 {
                scale: decimal_scale(t, 0)?,
                values: read_fixed(r, rows, i32::from_le_bytes).await?,
            }),
            "Decimal64" => Ok(ColumnData::Decimal64 {
                scale: decimal_scale(t, 0)?,
                values: read_fixed(r, rows, i64::from_le_bytes).await?,
            }),
            "Decimal128" => Ok(ColumnData::Decimal128 {
                scale: decimal_scale(t, 0)?,
                values: read_fixed(r, rows, i128::from_le_bytes).await?,
            }),
            "Decimal256" => Ok(ColumnData::Decimal256 {
                scale: decimal_scale(t, 0)?,
                values: read_fixed(r, rows, I256::from_le_bytes).await?,
            }),
            "Decimal" => {
                let scale = decimal_scale(t, 1)?;
                match decimal_width(t)? {
                    32 => Ok(ColumnData::Decimal32 {
                        scale,
                        values: read_fixed(r, rows, i32::from_le_bytes).await?,
                    }),
                    64 => Ok(ColumnData::Decimal64 {
                        scale,
                        values: read_fixed(r, rows, i64::from_le_bytes).await?,
                    }),
                    128 => Ok(ColumnData::Decimal128 {
                        scale,
                        values: read_fixed(r, rows, i128::from_le_bytes).await?,
                    }),
                    _ => Ok(ColumnData::Decimal256 {
                        scale,
                        values: read_fixed(r, rows, I256::from_le_bytes).await?,
                    }),
                }
            }
            "Enum8" => {
                let index = EnumIndex::from_type(t)?;
                let values = read_fixed(r, rows, |b: [u8; 1]| b[0] as i8).await?;
                for &v in &values {
                    index.name_of(v as i64)?;
                }
                Ok(ColumnData::Enum8 { index, values })
            }
            "Enum16" => {
                let index = EnumIndex::from_type(t)?;
                let values = read_fixed(r, rows, i16::from_le_bytes).await?;
                for &v in &values {
                    index.name_of(v as i64)?;
                }
                Ok(ColumnData::Enum16 { index, values })
            }
            "IPv4" => Ok(ColumnData::Ipv4(read_fixed(r, rows, u32::from_le_bytes).await?)),
            "IPv6" => Ok(ColumnData::Ipv6(read_fixed(r, rows, |b: [u8; 16]| b).await?)),
            "Nullable" => {
                let nulls = r.read_vec(rows).await?;
                let values = read_column_data(&mut *r, t.generic(0)?, rows).await?;
                Ok(ColumnData::Nullable {
                    nulls,
                    values: Box::new(values),
                })
            }
            "Array" => {
                let offsets = read_fixed(r, rows, u64::from_le_bytes).await?;
                let total = offsets.last().copied().unwrap_or(0) as usize;
                let values = read_column_data(&mut *r, t.generic(0)?, total).await?;
                Ok(ColumnData::Array {
                    offsets,
                    values: Box::new(values),
                })
            }
            "Tuple" => {
                let mut fields = Vec::with_capacity(t.generics.len());
                if t.generics.is_empty() {
                    return Err(Error::TypeNotFullySpecified(t.full_name.clone()));
                }
                for inner in &t.generics {
                    fields.push(read_column_data(&mut *r, inner, rows).await?);
                }
                Ok(ColumnData::Tuple(fields))
            }
            "LowCardinality" => read_low_cardinality(r, t, rows).await,
            "Nothing" => {
                r.skip(rows).await?;
                Ok(ColumnData::Nothing(rows))
            }
            _ => Err(Error::TypeNotSupported(t.full_name.clone())),
        }
    })
}

async fn read_low_cardinality<S>(
    r: &mut ProtocolReader<S>,
    t: &Arc<TypeInfo>,
    rows: usize,
) -> Result<ColumnData>
where
    S: AsyncRead + Unpin + Send,
{
    let (inner, nullable) = low_cardinality_inner(t)?;

    let version = r.read_u64().await?;
    if version != LOW_CARDINALITY_VERSION {
        return Err(Error::UnexpectedResponse(format!(
            "low-cardinality serialization version {version}"
        )));
    }
    if rows == 0 {
        return Ok(ColumnData::LowCardinality {
            dict: Box::new(ColumnData::Nothing(0)),
            keys: Vec::new(),
            nullable,
        });
    }

    let flags = r.read_u64().await?;
    if flags & HAS_ADDITIONAL_KEYS == 0 {
        return Err(Error::UnexpectedResponse(
            "low-cardinality column without additional keys".into(),
        ));
    }
    let key_width = flags & 0xff;

    let dict_len = r.read_u64().await? as usize;
    let dict = read_column_data(&mut *r, &inner, dict_len).await?;

    let key_count = r.read_u64().await? as usize;
    if key_count != rows {
        return Err(Error::UnexpectedResponse(format!(
            "low-cardinality key count {key_count} does not match row count {rows}"
        )));
    }
    let keys: Vec<u32> = match key_width {
        0 => read_fixed(r, rows, |b: [u8; 1]| b[0] as u32).await?,
        1 => read_fixed(r, rows, |b: [u8; 2]| u16::from_le_bytes(b) as u32).await?,
        2 => read_fixed(r, rows, u32::from_le_bytes).await?,
        3 => {
            let wide = read_fixed(r, rows, u64::from_le_bytes).await?;
            let mut keys = Vec::with_capacity(rows);
            for k in wide {
                keys.push(u32::try_from(k).map_err(|_| {
                    Error::UnexpectedResponse("low-cardinality key exceeds u32".into())
                })?);
            }
            keys
        }
        other => {
            return Err(Error::UnexpectedResponse(format!(
                "low-cardinality key width tag {other}"
            )))
        }
    };
    for &k in &keys {
        if k as usize >= dict_len {
            return Err(Error::UnexpectedResponse(format!(
                "low-cardinality key {k} outside dictionary of {dict_len}"
            )));
        }
    }

    Ok(ColumnData::LowCardinality {
        dict: Box::new(dict),
        keys,
        nullable,
    })
}

/// Consumes one column without materialising it; used for columns the
/// caller asked to drop.
pub async fn skip_column<S>(
    reader: &mut ProtocolReader<S>,
    type_info: &Arc<TypeInfo>,
    rows: usize,
) -> Result<()>
where
    S: AsyncRead + Unpin + Send,
{
    skip_column_data(reader, type_info, rows).await
}

fn skip_column_data<'r, S>(
    r: &'r mut ProtocolReader<S>,
    t: &'r Arc<TypeInfo>,
    rows: usize,
) -> BoxFut<'r, ()>
where
    S: AsyncRead + Unpin + Send,
{
    Box::pin(async move {
        match t.name.as_str() {
            "Int8" | "UInt8" | "Bool" | "Enum8" | "Nothing" => r.skip(rows).await,
            "Int16" | "UInt16" | "Date" | "Enum16" => r.skip(rows * 2).await,
            "Int32" | "UInt32" | "Float32" | "Date32" | "DateTime" | "Decimal32" | "IPv4" => {
                r.skip(rows * 4).await
            }
            "Int64" | "UInt64" | "Float64" | "DateTime64" | "Decimal64" => r.skip(rows * 8).await,
            "Int128" | "UInt128" | "Decimal128" | "UUID" | "IPv6" => r.skip(rows * 16).await,
            "Int256" | "UInt256" | "Decimal256" => r.skip(rows * 32).await,
            "Decimal" => r.skip(rows * (decimal_width(t)? as usize / 8)).await,
            "FixedString" => r.skip(rows * fixed_string_width(t)?).await,
            "String" => {
                for _ in 0..rows {
                    let len = r.read_varint().await? as usize;
                    r.skip(len).await?;
                }
                Ok(())
            }
            "Nullable" => {
                r.skip(rows).await?;
                skip_column_data(&mut *r, t.generic(0)?, rows).await
            }
            "Array" => {
                let offsets = read_fixed(r, rows, u64::from_le_bytes).await?;
                let total = offsets.last().copied().unwrap_or(0) as usize;
                skip_column_data(&mut *r, t.generic(0)?, total).await
            }
            "Tuple" => {
                for inner in &t.generics {
                    skip_column_data(&mut *r, inner, rows).await?;
                }
                Ok(())
            }
            "LowCardinality" => {
                // The header cannot be skipped blindly: the key width and
                // dictionary length live in it.
                read_low_cardinality(r, t, rows).await.map(|_| ())
            }
            _ => Err(Error::TypeNotSupported(t.full_name.clone())),
        }
    })
}
