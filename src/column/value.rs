use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

/// 256-bit signed scalar, little-endian limbs. Wide enough for `Int256`
/// and `Decimal256` mantissas; arithmetic is limited to what rendering
/// needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256(pub [u8; 32]);

/// 256-bit unsigned scalar, little-endian limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256(pub [u8; 32]);

fn limbs(bytes: &[u8; 32]) -> [u64; 4] {
    let mut out = [0u64; 4];
    for (i, limb) in out.iter_mut().enumerate() {
        *limb = u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap());
    }
    out
}

/// Decimal rendering of an unsigned 256-bit value by repeated division.
fn format_u256(bytes: &[u8; 32]) -> String {
    let mut limbs = limbs(bytes);
    if limbs == [0; 4] {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while limbs != [0; 4] {
        let mut rem: u64 = 0;
        for limb in limbs.iter_mut().rev() {
            let acc = ((rem as u128) << 64) | *limb as u128;
            *limb = (acc / 10) as u64;
            rem = (acc % 10) as u64;
        }
        digits.push(b'0' + rem as u8);
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn negate_le(bytes: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry = 1u16;
    for (i, b) in bytes.iter().enumerate() {
        let v = (!b) as u16 + carry;
        out[i] = v as u8;
        carry = v >> 8;
    }
    out
}

impl I256 {
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0[31] & 0x80 != 0
    }

    /// Magnitude as unsigned little-endian bytes.
    fn abs_bytes(&self) -> [u8; 32] {
        if self.is_negative() {
            negate_le(&self.0)
        } else {
            self.0
        }
    }
}

impl From<i64> for I256 {
    fn from(v: i64) -> Self {
        let mut bytes = if v < 0 { [0xff; 32] } else { [0; 32] };
        bytes[..8].copy_from_slice(&v.to_le_bytes());
        Self(bytes)
    }
}

impl From<i128> for I256 {
    fn from(v: i128) -> Self {
        let mut bytes = if v < 0 { [0xff; 32] } else { [0; 32] };
        bytes[..16].copy_from_slice(&v.to_le_bytes());
        Self(bytes)
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        f.write_str(&format_u256(&self.abs_bytes()))
    }
}

impl U256 {
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl From<u64> for U256 {
    fn from(v: u64) -> Self {
        let mut bytes = [0; 32];
        bytes[..8].copy_from_slice(&v.to_le_bytes());
        Self(bytes)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_u256(&self.0))
    }
}

/// Fixed-point decimal with an `i128` mantissa (`Decimal32/64/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub mantissa: i128,
    pub scale: u8,
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(f, self.mantissa < 0, self.mantissa.unsigned_abs().to_string(), self.scale)
    }
}

/// Fixed-point decimal with a 256-bit mantissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal256 {
    pub mantissa: I256,
    pub scale: u8,
}

impl fmt::Display for Decimal256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(
            f,
            self.mantissa.is_negative(),
            format_u256(&self.mantissa.abs_bytes()),
            self.scale,
        )
    }
}

fn format_scaled(
    f: &mut fmt::Formatter<'_>,
    negative: bool,
    magnitude: String,
    scale: u8,
) -> fmt::Result {
    if negative {
        f.write_str("-")?;
    }
    let scale = scale as usize;
    if scale == 0 {
        return f.write_str(&magnitude);
    }
    if magnitude.len() <= scale {
        write!(f, "0.{}{}", "0".repeat(scale - magnitude.len()), magnitude)
    } else {
        let (int, frac) = magnitude.split_at(magnitude.len() - scale);
        write!(f, "{int}.{frac}")
    }
}

/// Closed-set tag describing a column's storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Float32,
    Float64,
    Bool,
    String,
    FixedString,
    Uuid,
    Date,
    Date32,
    DateTime,
    DateTime64,
    Decimal,
    Enum8,
    Enum16,
    IpV4,
    IpV6,
    Array,
    Tuple,
    Nothing,
}

/// One materialised cell. Row views are produced on demand from the
/// columnar buffers; taking a `Value` copies.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(I256),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(U256),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Tz>),
    DateTime64 {
        value: DateTime<Tz>,
        precision: u8,
    },
    Decimal(Decimal),
    Decimal256(Decimal256),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Borrow the cell as UTF-8 text when it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Renders the value as a ClickHouse SQL literal for textual parameter
    /// substitution.
    pub fn render_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Int128(v) => v.to_string(),
            Value::Int256(v) => v.to_string(),
            Value::UInt8(v) => v.to_string(),
            Value::UInt16(v) => v.to_string(),
            Value::UInt32(v) => v.to_string(),
            Value::UInt64(v) => v.to_string(),
            Value::UInt128(v) => v.to_string(),
            Value::UInt256(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::String(bytes) => quote_bytes(bytes),
            Value::Uuid(v) => format!("'{v}'"),
            Value::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
            Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTime64 { value, precision } => {
                let ts = value.format("%Y-%m-%d %H:%M:%S");
                if *precision == 0 {
                    format!("'{ts}'")
                } else {
                    let nanos = value.timestamp_subsec_nanos();
                    let frac = format!("{nanos:09}");
                    format!("'{ts}.{}'", &frac[..*precision as usize])
                }
            }
            Value::Decimal(v) => v.to_string(),
            Value::Decimal256(v) => v.to_string(),
            Value::Ipv4(v) => format!("'{v}'"),
            Value::Ipv6(v) => format!("'{v}'"),
            Value::Array(items) => render_sequence(items, '[', ']'),
            Value::Tuple(items) => render_sequence(items, '(', ')'),
        }
    }
}

fn render_sequence(items: &[Value], open: char, close: char) -> String {
    let mut out = String::new();
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&item.render_literal());
    }
    out.push(close);
    out
}

fn quote_bytes(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into_bytes())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v.with_timezone(&chrono_tz::Tz::UTC))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
