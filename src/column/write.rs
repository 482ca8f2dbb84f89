//! Column-to-wire encoders, the inverse of the read dispatch. These are
//! synchronous: primitives land in the writer's buffer (or its compression
//! staging area) and the session decides when the socket sees them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use uuid::Uuid;

use crate::column::data::ColumnData;
use crate::column::read::{
    decimal_width, fixed_string_width, low_cardinality_inner, HAS_ADDITIONAL_KEYS,
    LOW_CARDINALITY_VERSION, NEED_UPDATE_DICTIONARY,
};
use crate::error::{Error, Result};
use crate::types::TypeInfo;
use crate::wire::writer::ProtocolWriter;

/// Serialises one column body. The caller has already written the block
/// header and the column's name and type strings.
pub fn write_column<S>(
    writer: &mut ProtocolWriter<S>,
    type_info: &Arc<TypeInfo>,
    data: &ColumnData,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    write_column_data(writer, type_info, data)
}

fn mismatch(t: &Arc<TypeInfo>, data: &ColumnData) -> Error {
    Error::TypeNotSupported(format!(
        "column of {} cannot be written from {} buffers",
        t.full_name,
        variant_name(data)
    ))
}

fn variant_name(data: &ColumnData) -> &'static str {
    match data {
        ColumnData::Int8(_) => "Int8",
        ColumnData::Int16(_) => "Int16",
        ColumnData::Int32(_) => "Int32",
        ColumnData::Int64(_) => "Int64",
        ColumnData::Int128(_) => "Int128",
        ColumnData::Int256(_) => "Int256",
        ColumnData::UInt8(_) => "UInt8",
        ColumnData::UInt16(_) => "UInt16",
        ColumnData::UInt32(_) => "UInt32",
        ColumnData::UInt64(_) => "UInt64",
        ColumnData::UInt128(_) => "UInt128",
        ColumnData::UInt256(_) => "UInt256",
        ColumnData::Float32(_) => "Float32",
        ColumnData::Float64(_) => "Float64",
        ColumnData::Bool(_) => "Bool",
        ColumnData::String(_) => "String",
        ColumnData::FixedString { .. } => "FixedString",
        ColumnData::Uuid(_) => "UUID",
        ColumnData::Date(_) => "Date",
        ColumnData::Date32(_) => "Date32",
        ColumnData::DateTime { .. } => "DateTime",
        ColumnData::DateTime64 { .. } => "DateTime64",
        ColumnData::Decimal32 { .. } => "Decimal32",
        ColumnData::Decimal64 { .. } => "Decimal64",
        ColumnData::Decimal128 { .. } => "Decimal128",
        ColumnData::Decimal256 { .. } => "Decimal256",
        ColumnData::Enum8 { .. } => "Enum8",
        ColumnData::Enum16 { .. } => "Enum16",
        ColumnData::Ipv4(_) => "IPv4",
        ColumnData::Ipv6(_) => "IPv6",
        ColumnData::Nullable { .. } => "Nullable",
        ColumnData::Array { .. } => "Array",
        ColumnData::Tuple(_) => "Tuple",
        ColumnData::LowCardinality { .. } => "LowCardinality",
        ColumnData::Nothing(_) => "Nothing",
    }
}

fn write_fixed<S, T, const N: usize>(
    w: &mut ProtocolWriter<S>,
    values: &[T],
    encode: fn(&T) -> [u8; N],
) -> Result<()>
where
    S: AsyncWrite + Unpin,
    T: Copy,
{
    let total = values.len() * N;
    if total == 0 {
        return Ok(());
    }
    w.write_raw(total, |window| {
        for (chunk, value) in window.chunks_exact_mut(N).zip(values) {
            chunk.copy_from_slice(&encode(value));
        }
        Ok(total)
    })?;
    Ok(())
}

fn encode_uuid(value: &Uuid) -> [u8; 16] {
    let mut bytes = *value.as_bytes();
    bytes[..8].reverse();
    bytes[8..].reverse();
    bytes
}

fn write_column_data<S>(
    w: &mut ProtocolWriter<S>,
    t: &Arc<TypeInfo>,
    data: &ColumnData,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    match (t.name.as_str(), data) {
        ("Int8", ColumnData::Int8(v)) => write_fixed(w, v, |x| [*x as u8]),
        ("Int16", ColumnData::Int16(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Int32", ColumnData::Int32(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Int64", ColumnData::Int64(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Int128", ColumnData::Int128(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Int256", ColumnData::Int256(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("UInt8", ColumnData::UInt8(v)) => w.write_bytes(v),
        ("UInt16", ColumnData::UInt16(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("UInt32", ColumnData::UInt32(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("UInt64", ColumnData::UInt64(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("UInt128", ColumnData::UInt128(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("UInt256", ColumnData::UInt256(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Float32", ColumnData::Float32(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Float64", ColumnData::Float64(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Bool", ColumnData::Bool(v)) => w.write_bytes(v),
        ("String", ColumnData::String(v)) => {
            for item in v {
                w.write_str_bytes(item)?;
            }
            Ok(())
        }
        ("FixedString", ColumnData::FixedString { width, bytes }) => {
            if *width != fixed_string_width(t)? {
                return Err(mismatch(t, data));
            }
            w.write_bytes(bytes)
        }
        ("UUID", ColumnData::Uuid(v)) => write_fixed(w, v, encode_uuid),
        ("Date", ColumnData::Date(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("Date32", ColumnData::Date32(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("DateTime", ColumnData::DateTime { values, .. }) => {
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("DateTime64", ColumnData::DateTime64 { values, .. }) => {
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("Decimal32", ColumnData::Decimal32 { values, .. })
        | ("Decimal", ColumnData::Decimal32 { values, .. }) => {
            check_decimal_width(t, 32)?;
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("Decimal64", ColumnData::Decimal64 { values, .. })
        | ("Decimal", ColumnData::Decimal64 { values, .. }) => {
            check_decimal_width(t, 64)?;
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("Decimal128", ColumnData::Decimal128 { values, .. })
        | ("Decimal", ColumnData::Decimal128 { values, .. }) => {
            check_decimal_width(t, 128)?;
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("Decimal256", ColumnData::Decimal256 { values, .. })
        | ("Decimal", ColumnData::Decimal256 { values, .. }) => {
            check_decimal_width(t, 256)?;
            write_fixed(w, values, |x| x.to_le_bytes())
        }
        ("Enum8", ColumnData::Enum8 { values, .. }) => write_fixed(w, values, |x| [*x as u8]),
        ("Enum16", ColumnData::Enum16 { values, .. }) => write_fixed(w, values, |x| x.to_le_bytes()),
        ("IPv4", ColumnData::Ipv4(v)) => write_fixed(w, v, |x| x.to_le_bytes()),
        ("IPv6", ColumnData::Ipv6(v)) => write_fixed(w, v, |x| *x),
        ("Nullable", ColumnData::Nullable { nulls, values }) => {
            w.write_bytes(nulls)?;
            write_column_data(w, t.generic(0)?, values)
        }
        ("Array", ColumnData::Array { offsets, values }) => {
            write_fixed(w, offsets, |x| x.to_le_bytes())?;
            write_column_data(w, t.generic(0)?, values)
        }
        ("Tuple", ColumnData::Tuple(fields)) => {
            if fields.len() != t.generics.len() {
                return Err(mismatch(t, data));
            }
            for (inner, field) in t.generics.iter().zip(fields) {
                write_column_data(w, inner, field)?;
            }
            Ok(())
        }
        ("Nothing", ColumnData::Nothing(rows)) => {
            if *rows == 0 {
                return Ok(());
            }
            w.write_raw(*rows, |window| {
                window[..*rows].fill(0);
                Ok(*rows)
            })?;
            Ok(())
        }
        ("LowCardinality", _) => write_low_cardinality(w, t, data),
        _ => Err(mismatch(t, data)),
    }
}

fn check_decimal_width(t: &Arc<TypeInfo>, width: u32) -> Result<()> {
    if t.name == "Decimal" && decimal_width(t)? != width {
        return Err(Error::TypeNotSupported(format!(
            "{} written from Decimal{width} buffers",
            t.full_name
        )));
    }
    Ok(())
}

/// Smallest key width covering the dictionary, as a flags tag.
fn key_width_tag(dict_len: usize) -> u64 {
    if dict_len <= u8::MAX as usize + 1 {
        0
    } else if dict_len <= u16::MAX as usize + 1 {
        1
    } else {
        2
    }
}

fn write_low_cardinality<S>(
    w: &mut ProtocolWriter<S>,
    t: &Arc<TypeInfo>,
    data: &ColumnData,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let (inner_type, type_nullable) = low_cardinality_inner(t)?;

    // Either pre-dictionarised data or a plain string column to be
    // dictionarised here.
    let (dict, keys, nullable): (ColumnData, Vec<u32>, bool) = match data {
        ColumnData::LowCardinality {
            dict,
            keys,
            nullable,
        } => ((**dict).clone(), keys.clone(), *nullable),
        ColumnData::String(items) => {
            let mut seen: HashMap<&[u8], u32> = HashMap::new();
            let mut dict_items: Vec<Vec<u8>> = Vec::new();
            if type_nullable {
                dict_items.push(Vec::new());
                seen.insert(&[], 0);
            }
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                let next = dict_items.len() as u32;
                match seen.entry(item.as_slice()) {
                    std::collections::hash_map::Entry::Occupied(e) => keys.push(*e.get()),
                    std::collections::hash_map::Entry::Vacant(e) => {
                        e.insert(next);
                        dict_items.push(item.clone());
                        keys.push(next);
                    }
                }
            }
            (ColumnData::String(dict_items), keys, type_nullable)
        }
        _ => return Err(mismatch(t, data)),
    };
    if nullable != type_nullable {
        return Err(mismatch(t, data));
    }

    w.write_u64(LOW_CARDINALITY_VERSION)?;
    if keys.is_empty() {
        return Ok(());
    }

    let width_tag = key_width_tag(dict.len());
    w.write_u64(width_tag | HAS_ADDITIONAL_KEYS | NEED_UPDATE_DICTIONARY)?;
    w.write_u64(dict.len() as u64)?;
    write_column_data(w, &inner_type, &dict)?;

    w.write_u64(keys.len() as u64)?;
    match width_tag {
        0 => write_fixed(w, &keys, |x| [*x as u8]),
        1 => write_fixed(w, &keys, |x| (*x as u16).to_le_bytes()),
        _ => write_fixed(w, &keys, |x| x.to_le_bytes()),
    }
}
