//! Scenarios against a real server at 127.0.0.1:9000 with default
//! credentials. Run with `cargo test -- --ignored` when one is available.

use ch_native::column::data::ColumnData;
use ch_native::{ClientOptions, Column, Params, Session, Value};

fn local_options() -> ClientOptions {
    ClientOptions {
        host: "127.0.0.1".to_string(),
        port: 9000,
        receive_timeout_ms: 1_000,
        ..ClientOptions::default()
    }
}

#[tokio::test]
#[ignore = "needs a clickhouse server on 127.0.0.1:9000"]
async fn hello_ping_dispose() {
    let mut session = Session::open(local_options()).await.expect("open");
    assert!(session.server_info().revision >= 54_453);
    session.ping().await.expect("ping");
    assert!(session.is_drained());
    session.dispose().await.expect("dispose");
}

#[tokio::test]
#[ignore = "needs a clickhouse server on 127.0.0.1:9000"]
async fn scalar_select() {
    let mut session = Session::open(local_options()).await.expect("open");
    let blocks = session
        .execute("SELECT currentUser()", &Params::new())
        .await
        .expect("execute")
        .collect()
        .await
        .expect("collect");

    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.row_count(), 1);
    assert_eq!(block.column_count(), 1);
    let column = block.column_at(0).expect("column");
    assert_eq!(column.type_info.full_name, "String");
    assert_eq!(column.value_at(0), Value::String(b"default".to_vec()));
}

#[tokio::test]
#[ignore = "needs a clickhouse server on 127.0.0.1:9000"]
async fn bulk_insert_ten_thousand_rows() {
    let mut session = Session::open(local_options()).await.expect("open");
    session
        .execute("DROP TABLE IF EXISTS table_with_two_fields", &Params::new())
        .await
        .expect("drop")
        .collect()
        .await
        .expect("drop result");
    session
        .execute(
            "CREATE TABLE table_with_two_fields(id Int32, name String) engine=Memory",
            &Params::new(),
        )
        .await
        .expect("create")
        .collect()
        .await
        .expect("create result");

    let ids: Vec<i32> = (1..=10_000).collect();
    let names: Vec<String> = ids.iter().map(|id| format!("Name #{id}")).collect();
    session
        .insert(
            "table_with_two_fields",
            vec![
                (
                    "id",
                    Column::new(ch_native::parse_type("Int32").expect("type"), ColumnData::Int32(ids)),
                ),
                (
                    "name",
                    Column::new(
                        ch_native::parse_type("String").expect("type"),
                        ColumnData::strings_from(&names),
                    ),
                ),
            ],
        )
        .await
        .expect("insert");

    let blocks = session
        .execute(
            "SELECT count(), min(id), max(id) FROM table_with_two_fields",
            &Params::new(),
        )
        .await
        .expect("verify")
        .collect()
        .await
        .expect("collect");
    let block = &blocks[0];
    assert_eq!(block.column_at(0).expect("count").value_at(0), Value::UInt64(10_000));
    assert_eq!(block.column_at(1).expect("min").value_at(0), Value::Int32(1));
    assert_eq!(block.column_at(2).expect("max").value_at(0), Value::Int32(10_000));
}

#[tokio::test]
#[ignore = "needs a clickhouse server on 127.0.0.1:9000"]
async fn parameterised_insert_roundtrip() {
    let mut session = Session::open(local_options()).await.expect("open");
    session
        .execute("DROP TABLE IF EXISTS param_insert_t", &Params::new())
        .await
        .expect("drop")
        .collect()
        .await
        .expect("drop result");
    session
        .execute(
            "CREATE TABLE param_insert_t(id UUID, dt DateTime('UTC')) engine=Memory",
            &Params::new(),
        )
        .await
        .expect("create")
        .collect()
        .await
        .expect("create result");

    let id = uuid::Uuid::parse_str("61f0c404-5cb3-11e7-907b-a6006ad3dba0").expect("uuid");
    let dt = chrono::TimeZone::with_ymd_and_hms(&chrono_tz::Tz::UTC, 2021, 7, 14, 12, 34, 56)
        .single()
        .expect("datetime");
    let params = Params::new()
        .set("id", Value::Uuid(id))
        .set("dt", Value::DateTime(dt));
    session
        .execute("INSERT INTO param_insert_t SELECT {id:UUID}, {dt:DateTime}", &params)
        .await
        .expect("insert")
        .collect()
        .await
        .expect("insert result");

    let blocks = session
        .execute("SELECT id, dt FROM param_insert_t", &Params::new())
        .await
        .expect("select")
        .collect()
        .await
        .expect("collect");
    let block = &blocks[0];
    assert_eq!(block.column("id").expect("id").value_at(0), Value::Uuid(id));
    match block.column("dt").expect("dt").value_at(0) {
        Value::DateTime(read_back) => assert_eq!(read_back.timestamp(), dt.timestamp()),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
#[ignore = "needs a clickhouse server on 127.0.0.1:9000"]
async fn compressed_million_row_scan() {
    let options = ClientOptions {
        compression: true,
        receive_timeout_ms: 30_000,
        ..local_options()
    };
    let mut session = Session::open(options).await.expect("open");
    let mut result = session
        .execute("SELECT number FROM numbers(1000000)", &Params::new())
        .await
        .expect("execute");

    let mut expected = 0u64;
    while let Some(block) = result.next_block().await.expect("block") {
        let numbers: &[u64] = block
            .column("number")
            .expect("column")
            .try_as_slice()
            .expect("u64 slice");
        for &n in numbers {
            assert_eq!(n, expected);
            expected += 1;
        }
    }
    assert_eq!(expected, 1_000_000);
}
