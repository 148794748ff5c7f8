use super::*;

#[test]
fn integers_follow_order() {
    let mut be = ByteWriter::new(ByteOrder::BigEndian);
    be.put_u16(0x0102);
    be.put_u24(0x030405);
    be.put_u32(0x06070809);
    assert_eq!(be.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);

    let mut le = ByteWriter::new(ByteOrder::LittleEndian);
    le.put_u24(0x030405);
    le.put_u24_minus_one(100);
    assert_eq!(le.as_slice(), &[5, 4, 3, 99, 0, 0]);
}

#[test]
fn reset_keeps_capacity() {
    let mut w = ByteWriter::new(ByteOrder::LittleEndian);
    w.put_bytes(&[0u8; 64]);
    let cap = w.capacity();
    w.reset();
    assert!(w.is_empty());
    assert_eq!(w.capacity(), cap);
}

#[test]
fn patch_overwrites_in_place() {
    let mut w = ByteWriter::new(ByteOrder::LittleEndian);
    w.put_fourcc(FourCC::new(b"RIFF"));
    w.put_u32(0);
    w.patch_u32(4, 0x1234);
    assert_eq!(&w.as_slice()[4..], &[0x34, 0x12, 0, 0]);
    w.patch_u32(6, 1);
    assert_eq!(w.len(), 8);
}
