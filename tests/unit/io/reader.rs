use super::*;
use std::io::Cursor;

fn reader(bytes: &[u8], order: ByteOrder) -> BinaryReader<Cursor<Vec<u8>>> {
    BinaryReader::new(Cursor::new(bytes.to_vec()), order).unwrap()
}

#[test]
fn integer_reads_follow_configured_order() {
    let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
    let mut be = reader(&bytes, ByteOrder::BigEndian);
    assert_eq!(be.read_u16().unwrap(), 0x0102);
    assert_eq!(be.read_u24().unwrap(), 0x030405);
    assert_eq!(be.read_u32().unwrap(), 0x06070809);

    let mut le = reader(&bytes, ByteOrder::LittleEndian);
    assert_eq!(le.read_u16().unwrap(), 0x0201);
    assert_eq!(le.read_u24().unwrap(), 0x050403);
    assert_eq!(le.read_u32().unwrap(), 0x09080706);
    assert_eq!(le.available(), 0);
}

#[test]
fn fourcc_is_never_byte_swapped() {
    let mut r = reader(b"ANMFxxxx", ByteOrder::LittleEndian);
    assert_eq!(r.read_fourcc().unwrap(), FourCC::new(b"ANMF"));
    assert_eq!(r.position(), 4);
}

#[test]
fn peek_does_not_consume() {
    let mut r = reader(&[0x21, 0xf9], ByteOrder::LittleEndian);
    assert_eq!(r.peek_byte().unwrap(), 0x21);
    assert_eq!(r.peek_byte().unwrap(), 0x21);
    assert_eq!(r.read_u8().unwrap(), 0x21);
    assert_eq!(r.peek_byte().unwrap(), 0xf9);
}

#[test]
fn short_read_reports_truncation_with_offsets() {
    let mut r = reader(&[1, 2, 3], ByteOrder::BigEndian);
    r.skip(2).unwrap();
    match r.read_u32() {
        Err(FrameSeqError::Truncated {
            offset,
            needed,
            available,
        }) => {
            assert_eq!((offset, needed, available), (2, 4, 1));
        }
        other => panic!("expected truncation, got {other:?}"),
    }
    assert!(r.skip(5).is_err());
    assert_eq!(r.position(), 2);
}

#[test]
fn reset_returns_to_marked_start() {
    let mut r = reader(b"GIF89a\x10\x00", ByteOrder::LittleEndian);
    r.skip(6).unwrap();
    r.mark_start();
    assert_eq!(r.read_u16().unwrap(), 16);
    r.reset().unwrap();
    assert_eq!(r.position(), 6);
    assert_eq!(r.read_u16().unwrap(), 16);
}

#[test]
fn read_into_window_and_append() {
    let mut r = reader(&[9, 8, 7, 6, 5], ByteOrder::BigEndian);
    let mut buf = [0u8; 6];
    assert_eq!(r.read(&mut buf, 2, 3).unwrap(), 3);
    assert_eq!(buf, [0, 0, 9, 8, 7, 0]);
    assert!(r.read(&mut buf, 5, 2).is_err());

    let mut out = vec![1];
    r.read_append(&mut out, 2).unwrap();
    assert_eq!(out, vec![1, 6, 5]);
}

#[test]
fn logical_start_follows_initial_stream_position() {
    let mut c = Cursor::new(vec![0u8, 0, 0xaa, 0xbb]);
    c.set_position(2);
    let mut r = BinaryReader::new(c, ByteOrder::BigEndian).unwrap();
    assert_eq!(r.position(), 2);
    assert_eq!(r.available(), 2);
    assert_eq!(r.read_u16().unwrap(), 0xaabb);
    r.reset().unwrap();
    assert_eq!(r.position(), 2);
}
