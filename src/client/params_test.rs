use chrono::TimeZone;
use uuid::Uuid;

use crate::client::params::Params;
use crate::column::Value;
use crate::error::Error;

#[test]
fn substitutes_typed_placeholders() {
    let id = Uuid::parse_str("61f0c404-5cb3-11e7-907b-a6006ad3dba0").expect("uuid");
    let dt = chrono_tz::Tz::UTC
        .with_ymd_and_hms(2021, 7, 14, 12, 34, 56)
        .single()
        .expect("datetime");
    let params = Params::new()
        .set("id", Value::Uuid(id))
        .set("dt", Value::DateTime(dt));

    let query = params
        .substitute("INSERT INTO t SELECT {id:UUID}, {dt:DateTime}")
        .expect("substitute");
    assert_eq!(
        query,
        "INSERT INTO t SELECT '61f0c404-5cb3-11e7-907b-a6006ad3dba0', '2021-07-14 12:34:56'"
    );
}

#[test]
fn braces_inside_string_literals_survive() {
    let params = Params::new().set("x", 1i32);
    let query = params
        .substitute("SELECT '{not:a_param}', {x:Int32}")
        .expect("substitute");
    assert_eq!(query, "SELECT '{not:a_param}', 1");
}

#[test]
fn escaped_quote_does_not_end_the_literal() {
    let params = Params::new().set("x", 1i32);
    let query = params
        .substitute(r"SELECT 'it\'s {fine}', {x:Int32}")
        .expect("substitute");
    assert_eq!(query, r"SELECT 'it\'s {fine}', 1");
}

#[test]
fn string_values_are_escaped() {
    let params = Params::new().set("name", "O'Brien \\ Co");
    let query = params
        .substitute("SELECT {name:String}")
        .expect("substitute");
    assert_eq!(query, "SELECT 'O\\'Brien \\\\ Co'");
}

#[test]
fn missing_parameter_is_reported() {
    let params = Params::new();
    match params.substitute("SELECT {gone:Int32}") {
        Err(Error::NotSupported(msg)) => assert!(msg.contains("gone")),
        other => panic!("expected missing-parameter error, got {other:?}"),
    }
}

#[test]
fn invalid_declared_type_is_reported() {
    let params = Params::new().set("x", 1i32);
    assert!(matches!(
        params.substitute("SELECT {x:Array(}"),
        Err(Error::MalformedTypeName { .. })
    ));
}

#[test]
fn queries_without_placeholders_pass_through() {
    let params = Params::new();
    let query = "SELECT count() FROM system.tables";
    assert_eq!(params.substitute(query).expect("substitute"), query);
}
