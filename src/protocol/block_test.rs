use crate::column::data::ColumnData;
use crate::column::value::Value;
use crate::protocol::block::{block_of, read_block, write_block, Block};
use crate::wire::reader::ProtocolReader;
use crate::wire::writer::ProtocolWriter;

const LIMIT: usize = 1 << 24;

async fn encode(block: &Block) -> Vec<u8> {
    let mut w = ProtocolWriter::new(Vec::new(), LIMIT, None);
    write_block(&mut w, block).expect("write");
    w.flush().await.expect("flush");
    std::mem::take(w.get_mut())
}

fn two_column_block() -> Block {
    block_of(vec![
        ("id", "Int32", ColumnData::Int32(vec![1, 2, 3])),
        (
            "name",
            "String",
            ColumnData::String(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]),
        ),
    ])
    .expect("block")
}

#[tokio::test]
async fn block_roundtrip() {
    let block = two_column_block();
    let bytes = encode(&block).await;

    let mut r = ProtocolReader::new(bytes.as_slice(), LIMIT, None);
    let back = read_block(&mut r, &[]).await.expect("read");
    assert!(r.is_drained());

    assert_eq!(back.row_count(), 3);
    assert_eq!(back.column_count(), 2);
    assert_eq!(back.names().collect::<Vec<_>>(), vec!["id", "name"]);
    assert_eq!(
        back.column("id").expect("id").data,
        ColumnData::Int32(vec![1, 2, 3])
    );
    assert_eq!(
        back.column("name").expect("name").value_at(2),
        Value::String(b"c".to_vec())
    );
    assert!(!back.info.is_overflows);
    assert_eq!(back.info.bucket_num, -1);
}

#[tokio::test]
async fn skipped_columns_are_dropped_but_consumed() {
    let block = two_column_block();
    let bytes = encode(&block).await;

    let mut r = ProtocolReader::new(bytes.as_slice(), LIMIT, None);
    let back = read_block(&mut r, &["name"]).await.expect("read");
    assert!(r.is_drained());
    assert_eq!(back.column_count(), 1);
    assert!(back.column("name").is_none());
    assert_eq!(back.column("id").expect("id").len(), 3);
}

#[tokio::test]
async fn empty_terminator_block_roundtrip() {
    let block = Block::new();
    let bytes = encode(&block).await;

    let mut r = ProtocolReader::new(bytes.as_slice(), LIMIT, None);
    let back = read_block(&mut r, &[]).await.expect("read");
    assert!(back.is_empty());
    assert_eq!(back.column_count(), 0);
    assert_eq!(back.row_count(), 0);
}

#[test]
fn mismatched_column_lengths_rejected() {
    let mut block = Block::new();
    block
        .push_column(
            "a",
            crate::column::Column::new(
                crate::types::parse_type("UInt8").expect("type"),
                ColumnData::UInt8(vec![1, 2]),
            ),
        )
        .expect("first");
    let err = block.push_column(
        "b",
        crate::column::Column::new(
            crate::types::parse_type("UInt8").expect("type"),
            ColumnData::UInt8(vec![1]),
        ),
    );
    assert!(err.is_err());
}
