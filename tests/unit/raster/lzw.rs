use super::*;

fn encode(indices: &[u8], code_size: u8) -> Vec<u8> {
    weezl::encode::Encoder::new(BitOrder::Lsb, code_size)
        .encode(indices)
        .unwrap()
}

#[test]
fn round_trips_indices() {
    let indices: Vec<u8> = (0..64u32).map(|i| (i % 4) as u8).collect();
    let data = encode(&indices, 2);
    let mut out = Vec::new();
    let n = decode_indices(&data, 2, 64, &mut out).unwrap();
    assert_eq!(n, 64);
    assert_eq!(out, indices);
}

#[test]
fn short_stream_reports_partial_count() {
    let data = encode(&[1, 1, 2, 3], 2);
    let mut out = Vec::new();
    let n = decode_indices(&data, 2, 10, &mut out).unwrap();
    assert_eq!(n, 4);
    assert_eq!(out.len(), 10);
    assert_eq!(&out[..4], &[1, 1, 2, 3]);
}

#[test]
fn rejects_bad_code_size() {
    let mut out = Vec::new();
    assert!(decode_indices(&[0], 12, 1, &mut out).is_err());
    assert!(decode_indices(&[0], 1, 1, &mut out).is_err());
}

#[test]
fn interlace_row_map_follows_four_passes() {
    // rows 0,8 | 4 | 2,6 | 1,3,5,7,9
    let map = interlaced_rows(10);
    assert_eq!(map, vec![0, 5, 3, 6, 2, 7, 4, 8, 1, 9]);
}
