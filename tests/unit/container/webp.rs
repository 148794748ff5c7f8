use super::*;
use std::io::Cursor;

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn u24(v: u32) -> [u8; 3] {
    let b = v.to_le_bytes();
    [b[0], b[1], b[2]]
}

fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = chunks.concat();
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend(body);
    out
}

fn vp8x(flags: u8, w: u32, h: u32) -> Vec<u8> {
    let mut b = vec![flags, 0, 0, 0];
    b.extend_from_slice(&u24(w - 1));
    b.extend_from_slice(&u24(h - 1));
    chunk(b"VP8X", &b)
}

fn anim(bgra: [u8; 4], loops: u16) -> Vec<u8> {
    let mut b = bgra.to_vec();
    b.extend_from_slice(&loops.to_le_bytes());
    chunk(b"ANIM", &b)
}

fn anmf(x: u32, y: u32, w: u32, h: u32, dur: u32, flags: u8, image: &[u8]) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(&u24(x / 2));
    b.extend_from_slice(&u24(y / 2));
    b.extend_from_slice(&u24(w - 1));
    b.extend_from_slice(&u24(h - 1));
    b.extend_from_slice(&u24(dur));
    b.push(flags);
    b.extend_from_slice(image);
    chunk(b"ANMF", &b)
}

fn vp8l_stub(w: u32, h: u32) -> Vec<u8> {
    let bits = (w - 1) | ((h - 1) << 14);
    let mut b = vec![0x2f];
    b.extend_from_slice(&bits.to_le_bytes());
    b.push(0xaa);
    chunk(b"VP8L", &b)
}

fn animated() -> Vec<u8> {
    riff(&[
        vp8x(Vp8xFlags::ANIMATION | Vp8xFlags::ALPHA, 20, 10),
        anim([0x30, 0x20, 0x10, 0xff], 2),
        anmf(0, 0, 20, 10, 0, 0x02, &vp8l_stub(20, 10)),
        anmf(4, 2, 5, 3, 70, 0x01, &[chunk(b"ALPH", &[1, 2, 3]), chunk(b"VP8 ", &[9; 4])].concat()),
    ])
}

fn reader(bytes: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
    BinaryReader::new(Cursor::new(bytes), ByteOrder::LittleEndian).unwrap()
}

#[test]
fn chunk_offsets_account_for_padding() {
    let bytes = animated();
    let total = bytes.len() as u64;
    let chunks = parse_chunks(&mut reader(bytes), ParseOpts::default()).unwrap();
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[0].header().offset, 12);
    for pair in chunks.windows(2) {
        let a = pair[0].header();
        let pad = u64::from(a.length & 1);
        assert_eq!(a.offset + 8 + u64::from(a.length) + pad, pair[1].header().offset);
    }
    assert_eq!(chunks.last().unwrap().header().end(), total);
}

#[test]
fn anmf_fields_are_decoded() {
    let chunks = parse_chunks(&mut reader(animated()), ParseOpts::default()).unwrap();
    let info = build_info(&chunks).unwrap();

    assert!(info.animated);
    assert_eq!(info.loop_count, 2);
    assert_eq!(info.viewport, Size::new(20, 10));
    assert_eq!(info.background, Some(Rgba8::new(0x10, 0x20, 0x30, 0xff)));
    assert!(info.has_alpha);

    let f0 = &info.frames[0];
    assert_eq!(f0.duration_ms, 100);
    assert_eq!(f0.blend, Blend::Source);
    assert_eq!(f0.disposal, Disposal::None);
    assert!(matches!(
        f0.payload,
        FramePayload::Webp { lossless: true, alpha: false, .. }
    ));

    let f1 = &info.frames[1];
    assert_eq!((f1.x, f1.y, f1.width, f1.height), (4, 2, 5, 3));
    assert_eq!(f1.duration_ms, 70);
    assert_eq!(f1.blend, Blend::Over);
    assert_eq!(f1.disposal, Disposal::Background);
    assert!(matches!(
        f1.payload,
        FramePayload::Webp { alpha: true, lossless: false, .. }
    ));
}

#[test]
fn synthesized_still_has_vp8x_and_payload() {
    let mut r = reader(animated());
    let chunks = parse_chunks(&mut r, ParseOpts::default()).unwrap();
    let info = build_info(&chunks).unwrap();

    let mut out = ByteWriter::new(ByteOrder::LittleEndian);
    write_frame_webp(&mut r, &info.frames[0], &mut out).unwrap();
    let webp = out.as_slice().to_vec();

    assert_eq!(&webp[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes([webp[4], webp[5], webp[6], webp[7]]) as usize, webp.len() - 8);
    assert_eq!(&webp[8..16], b"WEBPVP8X");
    assert_eq!(webp[20] & Vp8xFlags::ALPHA, Vp8xFlags::ALPHA);
    assert_eq!(&webp[24..30], &[19, 0, 0, 9, 0, 0]);

    let reparsed = parse_chunks(&mut reader(webp), ParseOpts::default()).unwrap();
    assert!(matches!(reparsed[1], WebpChunk::Vp8l { size: Some(s), .. } if s == Size::new(20, 10)));
    let still = build_info(&reparsed).unwrap();
    assert!(!still.animated);
    assert_eq!(still.viewport, Size::new(20, 10));
}

#[test]
fn still_without_vp8x_probes_bitstream() {
    let lossless = riff(&[vp8l_stub(33, 17)]);
    let info = build_info(&parse_chunks(&mut reader(lossless), ParseOpts::default()).unwrap()).unwrap();
    assert_eq!(info.viewport, Size::new(33, 17));
    assert!(info.has_alpha);

    let mut key = vec![0x50, 0x01, 0x00, 0x9d, 0x01, 0x2a];
    key.extend_from_slice(&40u16.to_le_bytes());
    key.extend_from_slice(&(30u16 | 0x4000).to_le_bytes());
    let lossy = riff(&[chunk(b"VP8 ", &key)]);
    let info = build_info(&parse_chunks(&mut reader(lossy), ParseOpts::default()).unwrap()).unwrap();
    assert_eq!(info.viewport, Size::new(40, 30));
    assert!(!info.has_alpha);
}

#[test]
fn flag_accessors() {
    let f = Vp8xFlags(Vp8xFlags::ICC | Vp8xFlags::EXIF | Vp8xFlags::XMP);
    assert!(f.icc() && f.exif() && f.xmp());
    assert!(!f.alpha() && !f.animation());
}

#[test]
fn frame_past_canvas_is_malformed() {
    let bytes = riff(&[
        vp8x(Vp8xFlags::ANIMATION, 8, 8),
        anim([0; 4], 0),
        anmf(6, 0, 4, 4, 10, 0, &vp8l_stub(4, 4)),
    ]);
    let chunks = parse_chunks(&mut reader(bytes), ParseOpts::default()).unwrap();
    assert!(matches!(build_info(&chunks), Err(FrameSeqError::MalformedChunk(_))));
}

#[test]
fn missing_final_pad_is_tolerated() {
    let mut bytes = riff(&[vp8l_stub(2, 2), chunk(b"EXIF", &[1, 2, 3])]);
    bytes.pop();
    let chunks = parse_chunks(&mut reader(bytes), ParseOpts::default()).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].header().trailer_len, 0);
}

#[test]
fn truncated_chunk_body() {
    let mut bytes = animated();
    bytes.truncate(bytes.len() - 6);
    let err = parse_chunks(&mut reader(bytes), ParseOpts::default()).unwrap_err();
    assert!(matches!(err, FrameSeqError::Truncated { .. }));
}
