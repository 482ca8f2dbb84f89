use crate::compress::frame::CompressionMethod;
use crate::error::Error;
use crate::wire::writer::ProtocolWriter;

const LIMIT: usize = 1 << 24;

async fn flushed(writer: &mut ProtocolWriter<Vec<u8>>) -> Vec<u8> {
    writer.flush().await.expect("flush");
    std::mem::take(writer.get_mut())
}

fn new_writer() -> ProtocolWriter<Vec<u8>> {
    ProtocolWriter::new(Vec::new(), LIMIT, None)
}

#[tokio::test]
async fn varint_known_encodings() {
    let cases: &[(u64, &[u8])] = &[
        (0, &[0x00]),
        (1, &[0x01]),
        (127, &[0x7f]),
        (128, &[0x80, 0x01]),
        (300, &[0xac, 0x02]),
        (u64::MAX, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
    ];
    for (value, expected) in cases {
        let mut w = new_writer();
        w.write_varint(*value).expect("encode");
        assert_eq!(&flushed(&mut w).await, expected, "value {value}");
    }
}

#[tokio::test]
async fn varint_length_formula() {
    for value in [0u64, 1, 127, 128, 16_383, 16_384, 1 << 21, u32::MAX as u64, u64::MAX] {
        let bits = 64 - value.leading_zeros() as usize;
        let expected_len = std::cmp::max(1, (bits + 6) / 7);
        let mut w = new_writer();
        w.write_varint(value).expect("encode");
        assert_eq!(flushed(&mut w).await.len(), expected_len, "value {value}");
    }
}

#[tokio::test]
async fn varint_roundtrips_through_the_reader() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(0xc11c);
    let mut values: Vec<u64> = (0..64).map(|shift| 1u64 << shift).collect();
    values.extend([0, u64::MAX]);
    values.extend((0..500).map(|_| rng.gen::<u64>()));

    let mut w = new_writer();
    for &v in &values {
        w.write_varint(v).expect("encode");
    }
    let bytes = flushed(&mut w).await;

    let mut r = crate::wire::reader::ProtocolReader::new(bytes.as_slice(), LIMIT, None);
    for &v in &values {
        assert_eq!(r.read_varint().await.expect("decode"), v);
    }
    assert!(r.is_drained());
}

#[tokio::test]
async fn string_is_length_prefixed_utf8() {
    let mut w = new_writer();
    w.write_string("héllo").expect("encode");
    let bytes = flushed(&mut w).await;
    assert_eq!(bytes[0] as usize, "héllo".len());
    assert_eq!(&bytes[1..], "héllo".as_bytes());
}

#[tokio::test]
async fn flush_during_compression_is_internal_error() {
    let mut w = new_writer();
    w.begin_compress(CompressionMethod::Lz4, 1024).expect("begin");
    w.write_u64(7).expect("write");
    match w.flush().await {
        Err(Error::Internal(_)) => {}
        other => panic!("expected internal error, got {other:?}"),
    }
}

#[tokio::test]
async fn write_raw_retries_with_larger_window() {
    let mut w = new_writer();
    let mut attempts = 0;
    let n = w
        .write_raw(4, |window| {
            attempts += 1;
            if window.len() < 32 {
                return Ok(0);
            }
            window[..32].copy_from_slice(&[0xab; 32]);
            Ok(32)
        })
        .expect("write_raw");
    assert_eq!(n, 32);
    assert!(attempts > 1);
    assert_eq!(flushed(&mut w).await, vec![0xab; 32]);
}

#[tokio::test]
async fn failed_write_raw_leaves_no_bytes() {
    let mut w = new_writer();
    w.write_u8(0x11).expect("write");
    let res = w.write_raw(16, |_| {
        Err(Error::Overflow {
            ty: "FixedString(4)".into(),
            value: "too long".into(),
        })
    });
    assert!(res.is_err());
    assert_eq!(flushed(&mut w).await, vec![0x11]);
}

#[tokio::test]
async fn abort_pending_discards_partial_message() {
    let mut w = new_writer();
    w.write_u64(1).expect("write");
    w.flush().await.expect("flush");
    let _ = std::mem::take(w.get_mut());

    w.write_bytes(b"torn message").expect("write");
    w.abort_pending();
    w.write_u8(0x7e).expect("write");
    assert_eq!(flushed(&mut w).await, vec![0x7e]);
}
