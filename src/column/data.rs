use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::column::enums::EnumIndex;
use crate::column::value::{Decimal, Decimal256, Value, I256, U256};
use crate::error::{Error, Result};
use crate::types::TypeInfo;

/// Inclusive day-count ceiling of the 16-bit `Date` type: 2149-06-06.
pub const MAX_DATE_DAYS: u16 = u16::MAX;

/// Columnar buffers, one variant per storage kind. Variable-width kinds
/// nest their sub-columns the way the wire lays them out.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int128(Vec<i128>),
    Int256(Vec<I256>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    UInt128(Vec<u128>),
    UInt256(Vec<U256>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Bool(Vec<u8>),
    String(Vec<Vec<u8>>),
    FixedString {
        width: usize,
        bytes: Vec<u8>,
    },
    Uuid(Vec<Uuid>),
    /// Days since 1970-01-01.
    Date(Vec<u16>),
    /// Signed days since 1970-01-01, extended range.
    Date32(Vec<i32>),
    /// Seconds since the epoch; the zone only affects rendering.
    DateTime {
        tz: Option<Tz>,
        values: Vec<u32>,
    },
    DateTime64 {
        precision: u8,
        tz: Option<Tz>,
        values: Vec<i64>,
    },
    Decimal32 {
        scale: u8,
        values: Vec<i32>,
    },
    Decimal64 {
        scale: u8,
        values: Vec<i64>,
    },
    Decimal128 {
        scale: u8,
        values: Vec<i128>,
    },
    Decimal256 {
        scale: u8,
        values: Vec<I256>,
    },
    Enum8 {
        index: Arc<EnumIndex>,
        values: Vec<i8>,
    },
    Enum16 {
        index: Arc<EnumIndex>,
        values: Vec<i16>,
    },
    /// Numeric address value; `0x7f000001` is 127.0.0.1.
    Ipv4(Vec<u32>),
    Ipv6(Vec<[u8; 16]>),
    Nullable {
        nulls: Vec<u8>,
        values: Box<ColumnData>,
    },
    Array {
        offsets: Vec<u64>,
        values: Box<ColumnData>,
    },
    Tuple(Vec<ColumnData>),
    /// Dictionary plus row keys; `nullable` marks key 0 as NULL.
    LowCardinality {
        dict: Box<ColumnData>,
        keys: Vec<u32>,
        nullable: bool,
    },
    /// The bottom type; carries only a row count.
    Nothing(usize),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Int128(v) => v.len(),
            ColumnData::Int256(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::UInt128(v) => v.len(),
            ColumnData::UInt256(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::FixedString { width, bytes } => {
                if *width == 0 {
                    0
                } else {
                    bytes.len() / width
                }
            }
            ColumnData::Uuid(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::Date32(v) => v.len(),
            ColumnData::DateTime { values, .. } => values.len(),
            ColumnData::DateTime64 { values, .. } => values.len(),
            ColumnData::Decimal32 { values, .. } => values.len(),
            ColumnData::Decimal64 { values, .. } => values.len(),
            ColumnData::Decimal128 { values, .. } => values.len(),
            ColumnData::Decimal256 { values, .. } => values.len(),
            ColumnData::Enum8 { values, .. } => values.len(),
            ColumnData::Enum16 { values, .. } => values.len(),
            ColumnData::Ipv4(v) => v.len(),
            ColumnData::Ipv6(v) => v.len(),
            ColumnData::Nullable { nulls, .. } => nulls.len(),
            ColumnData::Array { offsets, .. } => offsets.len(),
            ColumnData::Tuple(fields) => fields.first().map_or(0, ColumnData::len),
            ColumnData::LowCardinality { keys, .. } => keys.len(),
            ColumnData::Nothing(rows) => *rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_at(&self, row: usize) -> Value {
        match self {
            ColumnData::Int8(v) => Value::Int8(v[row]),
            ColumnData::Int16(v) => Value::Int16(v[row]),
            ColumnData::Int32(v) => Value::Int32(v[row]),
            ColumnData::Int64(v) => Value::Int64(v[row]),
            ColumnData::Int128(v) => Value::Int128(v[row]),
            ColumnData::Int256(v) => Value::Int256(v[row]),
            ColumnData::UInt8(v) => Value::UInt8(v[row]),
            ColumnData::UInt16(v) => Value::UInt16(v[row]),
            ColumnData::UInt32(v) => Value::UInt32(v[row]),
            ColumnData::UInt64(v) => Value::UInt64(v[row]),
            ColumnData::UInt128(v) => Value::UInt128(v[row]),
            ColumnData::UInt256(v) => Value::UInt256(v[row]),
            ColumnData::Float32(v) => Value::Float32(v[row]),
            ColumnData::Float64(v) => Value::Float64(v[row]),
            ColumnData::Bool(v) => Value::Bool(v[row] != 0),
            ColumnData::String(v) => Value::String(v[row].clone()),
            ColumnData::FixedString { width, bytes } => {
                Value::String(bytes[row * width..(row + 1) * width].to_vec())
            }
            ColumnData::Uuid(v) => Value::Uuid(v[row]),
            ColumnData::Date(v) => Value::Date(date_from_days(v[row] as i64)),
            ColumnData::Date32(v) => Value::Date(date_from_days(v[row] as i64)),
            ColumnData::DateTime { tz, values } => {
                Value::DateTime(datetime_at(*tz, values[row] as i64, 0))
            }
            ColumnData::DateTime64 {
                precision,
                tz,
                values,
            } => {
                let divisor = 10i64.pow(*precision as u32);
                let secs = values[row].div_euclid(divisor);
                let nanos = values[row].rem_euclid(divisor) * 10i64.pow(9 - *precision as u32);
                Value::DateTime64 {
                    value: datetime_at(*tz, secs, nanos as u32),
                    precision: *precision,
                }
            }
            ColumnData::Decimal32 { scale, values } => Value::Decimal(Decimal {
                mantissa: values[row] as i128,
                scale: *scale,
            }),
            ColumnData::Decimal64 { scale, values } => Value::Decimal(Decimal {
                mantissa: values[row] as i128,
                scale: *scale,
            }),
            ColumnData::Decimal128 { scale, values } => Value::Decimal(Decimal {
                mantissa: values[row],
                scale: *scale,
            }),
            ColumnData::Decimal256 { scale, values } => Value::Decimal256(Decimal256 {
                mantissa: values[row],
                scale: *scale,
            }),
            ColumnData::Enum8 { index, values } => match index.name_of(values[row] as i64) {
                Ok(name) => Value::String(name.as_bytes().to_vec()),
                Err(_) => Value::Int8(values[row]),
            },
            ColumnData::Enum16 { index, values } => match index.name_of(values[row] as i64) {
                Ok(name) => Value::String(name.as_bytes().to_vec()),
                Err(_) => Value::Int16(values[row]),
            },
            ColumnData::Ipv4(v) => Value::Ipv4(Ipv4Addr::from(v[row])),
            ColumnData::Ipv6(v) => Value::Ipv6(Ipv6Addr::from(v[row])),
            ColumnData::Nullable { nulls, values } => {
                if nulls[row] != 0 {
                    Value::Null
                } else {
                    values.value_at(row)
                }
            }
            ColumnData::Array { offsets, values } => {
                let start = if row == 0 { 0 } else { offsets[row - 1] as usize };
                let end = offsets[row] as usize;
                Value::Array((start..end).map(|i| values.value_at(i)).collect())
            }
            ColumnData::Tuple(fields) => {
                Value::Tuple(fields.iter().map(|f| f.value_at(row)).collect())
            }
            ColumnData::LowCardinality {
                dict,
                keys,
                nullable,
            } => {
                let key = keys[row] as usize;
                if *nullable && key == 0 {
                    Value::Null
                } else {
                    dict.value_at(key)
                }
            }
            ColumnData::Nothing(_) => Value::Null,
        }
    }
}

fn epoch_date() -> NaiveDate {
    // chrono's default is the Unix epoch.
    NaiveDate::default()
}

fn date_from_days(days: i64) -> NaiveDate {
    epoch_date()
        .checked_add_signed(chrono::Duration::days(days))
        .unwrap_or_default()
}

fn datetime_at(tz: Option<Tz>, secs: i64, nanos: u32) -> chrono::DateTime<Tz> {
    let tz = tz.unwrap_or(Tz::UTC);
    match tz.timestamp_opt(secs, nanos) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.with_timezone(&tz),
    }
}

/// Primitive types a column can lend its backing buffer out as. The impls
/// double as the reinterpret table: an `IPv4` column is a `u32` column, a
/// `Date` column a `u16` one, a `Decimal64` an `i64` one.
pub trait ColumnPrimitive: Sized + Copy {
    fn slice_from(data: &ColumnData) -> Option<&[Self]>;
}

macro_rules! column_primitive {
    ($ty:ty, $($pattern:pat => $slice:expr),+ $(,)?) => {
        impl ColumnPrimitive for $ty {
            fn slice_from(data: &ColumnData) -> Option<&[Self]> {
                match data {
                    $($pattern => Some($slice),)+
                    _ => None,
                }
            }
        }
    };
}

column_primitive!(i8, ColumnData::Int8(v) => v, ColumnData::Enum8 { values, .. } => values);
column_primitive!(i16, ColumnData::Int16(v) => v, ColumnData::Enum16 { values, .. } => values);
column_primitive!(
    i32,
    ColumnData::Int32(v) => v,
    ColumnData::Date32(v) => v,
    ColumnData::Decimal32 { values, .. } => values,
);
column_primitive!(
    i64,
    ColumnData::Int64(v) => v,
    ColumnData::Decimal64 { values, .. } => values,
    ColumnData::DateTime64 { values, .. } => values,
);
column_primitive!(
    i128,
    ColumnData::Int128(v) => v,
    ColumnData::Decimal128 { values, .. } => values,
);
column_primitive!(u8, ColumnData::UInt8(v) => v, ColumnData::Bool(v) => v);
column_primitive!(u16, ColumnData::UInt16(v) => v, ColumnData::Date(v) => v);
column_primitive!(
    u32,
    ColumnData::UInt32(v) => v,
    ColumnData::DateTime { values, .. } => values,
    ColumnData::Ipv4(v) => v,
);
column_primitive!(u64, ColumnData::UInt64(v) => v);
column_primitive!(u128, ColumnData::UInt128(v) => v);
column_primitive!(f32, ColumnData::Float32(v) => v);
column_primitive!(f64, ColumnData::Float64(v) => v);

/// A named, typed column slice of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub type_info: Arc<TypeInfo>,
    pub data: ColumnData,
}

impl Column {
    pub fn new(type_info: Arc<TypeInfo>, data: ColumnData) -> Self {
        Self { type_info, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn value_at(&self, row: usize) -> Value {
        self.data.value_at(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(|row| self.value_at(row))
    }

    /// Fallible reinterpret: borrows the native buffer when the requested
    /// primitive matches the storage layout.
    pub fn try_as_slice<T: ColumnPrimitive>(&self) -> Option<&[T]> {
        T::slice_from(&self.data)
    }

    /// Temporal reinterpret; `Date`/`Date32` surface as midnight UTC.
    pub fn try_as_datetimes(&self) -> Option<Vec<chrono::DateTime<Tz>>> {
        match &self.data {
            ColumnData::DateTime { tz, values } => Some(
                values
                    .iter()
                    .map(|&secs| datetime_at(*tz, secs as i64, 0))
                    .collect(),
            ),
            ColumnData::DateTime64 {
                precision,
                tz,
                values,
            } => {
                let divisor = 10i64.pow(*precision as u32);
                Some(
                    values
                        .iter()
                        .map(|&ticks| {
                            let secs = ticks.div_euclid(divisor);
                            let nanos =
                                ticks.rem_euclid(divisor) * 10i64.pow(9 - *precision as u32);
                            datetime_at(*tz, secs, nanos as u32)
                        })
                        .collect(),
                )
            }
            ColumnData::Date(values) => Some(
                values
                    .iter()
                    .map(|&days| datetime_at(None, days as i64 * 86_400, 0))
                    .collect(),
            ),
            ColumnData::Date32(values) => Some(
                values
                    .iter()
                    .map(|&days| datetime_at(None, days as i64 * 86_400, 0))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Checked builders for the kinds whose native representation can fall
/// outside the wire type's range.
impl ColumnData {
    pub fn date_from_naive(dates: &[NaiveDate]) -> Result<ColumnData> {
        let mut out = Vec::with_capacity(dates.len());
        for date in dates {
            let days = date.num_days_from_ce() as i64 - epoch_date().num_days_from_ce() as i64;
            if days < 0 || days > MAX_DATE_DAYS as i64 {
                return Err(Error::Overflow {
                    ty: "Date".to_string(),
                    value: date.to_string(),
                });
            }
            out.push(days as u16);
        }
        Ok(ColumnData::Date(out))
    }

    pub fn strings_from<S: AsRef<str>>(items: &[S]) -> ColumnData {
        ColumnData::String(items.iter().map(|s| s.as_ref().as_bytes().to_vec()).collect())
    }

    pub fn fixed_strings_from<S: AsRef<[u8]>>(width: usize, items: &[S]) -> Result<ColumnData> {
        let mut bytes = Vec::with_capacity(width * items.len());
        for item in items {
            let item = item.as_ref();
            if item.len() > width {
                return Err(Error::Overflow {
                    ty: format!("FixedString({width})"),
                    value: String::from_utf8_lossy(item).into_owned(),
                });
            }
            bytes.extend_from_slice(item);
            bytes.extend(std::iter::repeat(0).take(width - item.len()));
        }
        Ok(ColumnData::FixedString { width, bytes })
    }

    pub fn enum8_from_names<S: AsRef<str>>(
        index: &Arc<EnumIndex>,
        names: &[S],
    ) -> Result<ColumnData> {
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let value = index.value_of(name.as_ref())?;
            values.push(i8::try_from(value).map_err(|_| Error::Overflow {
                ty: "Enum8".to_string(),
                value: value.to_string(),
            })?);
        }
        Ok(ColumnData::Enum8 {
            index: Arc::clone(index),
            values,
        })
    }
}
