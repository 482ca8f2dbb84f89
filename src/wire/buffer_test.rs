use crate::wire::buffer::{ByteBuffer, DEFAULT_WINDOW};

#[test]
fn written_bytes_invisible_until_flush() {
    let mut buf = ByteBuffer::new(1 << 20);
    let window = buf.get_memory(0).expect("window");
    window[..3].copy_from_slice(b"abc");
    buf.confirm_write(3);

    assert_eq!(buf.readable(), 0);
    assert_eq!(buf.unflushed(), 3);

    buf.flush();
    assert_eq!(buf.read_view(), b"abc");
    assert_eq!(buf.unflushed(), 0);
}

#[test]
fn discard_drops_only_unflushed() {
    let mut buf = ByteBuffer::new(1 << 20);
    let window = buf.get_memory(0).expect("window");
    window[..2].copy_from_slice(b"ok");
    buf.confirm_write(2);
    buf.flush();

    let window = buf.get_memory(0).expect("window");
    window[..4].copy_from_slice(b"junk");
    buf.confirm_write(4);
    buf.discard();

    assert_eq!(buf.read_view(), b"ok");
    assert_eq!(buf.unflushed(), 0);
}

#[test]
fn window_respects_hint() {
    let mut buf = ByteBuffer::new(1 << 20);
    let window = buf.get_memory(100_000).expect("window");
    assert!(window.len() >= 100_000);

    let window = buf.get_memory(0).expect("window");
    assert!(window.len() >= DEFAULT_WINDOW);
}

#[test]
fn offsets_reset_when_fully_consumed() {
    let mut buf = ByteBuffer::new(1 << 20);
    for round in 0..100 {
        let window = buf.get_memory(0).expect("window");
        window[..8].copy_from_slice(&u64::to_le_bytes(round));
        buf.confirm_write(8);
        buf.flush();
        assert_eq!(buf.read_view().len(), 8);
        buf.confirm_read(8);
        assert!(buf.is_empty());
    }
}

#[test]
fn partial_reads_keep_remainder() {
    let mut buf = ByteBuffer::new(1 << 20);
    let window = buf.get_memory(0).expect("window");
    window[..6].copy_from_slice(b"abcdef");
    buf.confirm_write(6);
    buf.flush();

    buf.confirm_read(2);
    assert_eq!(buf.read_view(), b"cdef");
    buf.confirm_read(4);
    assert!(buf.is_empty());
}

#[test]
fn growth_is_capped() {
    let mut buf = ByteBuffer::new(1024);
    assert!(buf.get_memory(512).is_ok());
    assert!(buf.get_memory(4096).is_err());
}
