pub mod data;
pub mod enums;
pub mod read;
pub mod value;
pub mod write;

use std::sync::Arc;

pub use data::{Column, ColumnData, ColumnPrimitive};
pub use enums::EnumIndex;
pub use read::{read_column, skip_column};
pub use value::{DbType, Decimal, Decimal256, Value, I256, U256};
pub use write::write_column;

use crate::error::{Error, Result};
use crate::types::TypeInfo;

#[cfg(test)]
mod data_test;

/// Storage tag of a type expression. Wrappers that do not change the
/// stored kind (`Nullable`, `LowCardinality`) answer for their inner type.
pub fn db_type(t: &Arc<TypeInfo>) -> Result<DbType> {
    match t.name.as_str() {
        "Int8" => Ok(DbType::Int8),
        "Int16" => Ok(DbType::Int16),
        "Int32" => Ok(DbType::Int32),
        "Int64" => Ok(DbType::Int64),
        "Int128" => Ok(DbType::Int128),
        "Int256" => Ok(DbType::Int256),
        "UInt8" => Ok(DbType::UInt8),
        "UInt16" => Ok(DbType::UInt16),
        "UInt32" => Ok(DbType::UInt32),
        "UInt64" => Ok(DbType::UInt64),
        "UInt128" => Ok(DbType::UInt128),
        "UInt256" => Ok(DbType::UInt256),
        "Float32" => Ok(DbType::Float32),
        "Float64" => Ok(DbType::Float64),
        "Bool" => Ok(DbType::Bool),
        "String" => Ok(DbType::String),
        "FixedString" => Ok(DbType::FixedString),
        "UUID" => Ok(DbType::Uuid),
        "Date" => Ok(DbType::Date),
        "Date32" => Ok(DbType::Date32),
        "DateTime" => Ok(DbType::DateTime),
        "DateTime64" => Ok(DbType::DateTime64),
        "Decimal" | "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => Ok(DbType::Decimal),
        "Enum8" => Ok(DbType::Enum8),
        "Enum16" => Ok(DbType::Enum16),
        "IPv4" => Ok(DbType::IpV4),
        "IPv6" => Ok(DbType::IpV6),
        "Array" => Ok(DbType::Array),
        "Tuple" => Ok(DbType::Tuple),
        "Nothing" => Ok(DbType::Nothing),
        "Nullable" | "LowCardinality" => db_type(t.generic(0)?),
        _ => Err(Error::TypeNotSupported(t.full_name.clone())),
    }
}
