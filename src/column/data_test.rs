use std::sync::Arc;

use chrono::Timelike;

use crate::column::data::{Column, ColumnData};
use crate::column::value::Value;
use crate::column::db_type;
use crate::column::value::DbType;
use crate::types::parse_type;

fn column(type_str: &str, data: ColumnData) -> Column {
    Column::new(parse_type(type_str).expect("type"), data)
}

#[test]
fn ipv4_reinterprets_as_u32() {
    let col = column("IPv4", ColumnData::Ipv4(vec![0x7f00_0001, 0x0a00_0001]));
    let raw: &[u32] = col.try_as_slice().expect("reinterpret");
    assert_eq!(raw, &[0x7f00_0001, 0x0a00_0001]);
    assert_eq!(
        col.value_at(1),
        Value::Ipv4(std::net::Ipv4Addr::new(10, 0, 0, 1))
    );
    assert!(col.try_as_slice::<u64>().is_none());
}

#[test]
fn date_reinterprets_as_u16() {
    let col = column("Date", ColumnData::Date(vec![0, 18_821]));
    let raw: &[u16] = col.try_as_slice().expect("reinterpret");
    assert_eq!(raw, &[0, 18_821]);
}

#[test]
fn decimal64_reinterprets_as_i64() {
    let col = column(
        "Decimal64(4)",
        ColumnData::Decimal64 {
            scale: 4,
            values: vec![-12_345, 67_890],
        },
    );
    let raw: &[i64] = col.try_as_slice().expect("reinterpret");
    assert_eq!(raw, &[-12_345, 67_890]);
}

#[test]
fn date32_reinterprets_as_midnight_datetimes() {
    let col = column("Date32", ColumnData::Date32(vec![0, 1, -1]));
    let datetimes = col.try_as_datetimes().expect("reinterpret");
    assert_eq!(datetimes[0].timestamp(), 0);
    assert_eq!(datetimes[1].timestamp(), 86_400);
    assert_eq!(datetimes[2].timestamp(), -86_400);
    assert!(datetimes.iter().all(|dt| dt.hour() == 0 && dt.minute() == 0));
}

#[test]
fn string_has_no_numeric_reinterpret() {
    let col = column("String", ColumnData::String(vec![b"x".to_vec()]));
    assert!(col.try_as_slice::<u8>().is_none());
    assert!(col.try_as_slice::<i64>().is_none());
}

#[test]
fn iter_walks_rows() {
    let col = column("UInt8", ColumnData::UInt8(vec![3, 1, 4]));
    let values: Vec<Value> = col.iter().collect();
    assert_eq!(
        values,
        vec![Value::UInt8(3), Value::UInt8(1), Value::UInt8(4)]
    );
}

#[test]
fn tuple_length_follows_first_field() {
    let data = ColumnData::Tuple(vec![
        ColumnData::UInt8(vec![1, 2]),
        ColumnData::String(vec![b"a".to_vec(), b"b".to_vec()]),
    ]);
    assert_eq!(data.len(), 2);
}

#[test]
fn db_type_unwraps_modifiers() {
    let cases = [
        ("Nullable(Int32)", DbType::Int32),
        ("LowCardinality(Nullable(String))", DbType::String),
        ("Decimal(15, 6)", DbType::Decimal),
        ("Array(UInt8)", DbType::Array),
        ("IPv4", DbType::IpV4),
        ("Enum8('a' = 1)", DbType::Enum8),
    ];
    for (input, expected) in cases {
        let t = parse_type(input).expect(input);
        assert_eq!(db_type(&t).expect(input), expected, "{input}");
    }
}

#[test]
fn low_cardinality_values_resolve_through_dictionary() {
    let data = ColumnData::LowCardinality {
        dict: Box::new(ColumnData::String(vec![
            Vec::new(),
            b"hot".to_vec(),
            b"cold".to_vec(),
        ])),
        keys: vec![1, 2, 1, 0],
        nullable: true,
    };
    assert_eq!(data.value_at(0), Value::String(b"hot".to_vec()));
    assert_eq!(data.value_at(1), Value::String(b"cold".to_vec()));
    assert_eq!(data.value_at(3), Value::Null);
}

#[test]
fn enum_column_materialises_names() {
    let t = parse_type("Enum16('off' = 0, 'on' = 1, 'auto' = -2)").expect("type");
    let index = crate::column::enums::EnumIndex::from_type(&t).expect("index");
    let data = ColumnData::Enum16 {
        index: Arc::clone(&index),
        values: vec![1, -2, 0],
    };
    assert_eq!(data.value_at(0), Value::String(b"on".to_vec()));
    assert_eq!(data.value_at(1), Value::String(b"auto".to_vec()));

    let raw: &[i16] = <i16 as crate::column::ColumnPrimitive>::slice_from(&data).expect("raw");
    assert_eq!(raw, &[1, -2, 0]);
}
