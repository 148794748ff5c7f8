use super::*;

#[test]
fn sniff_recognises_each_signature() {
    assert_eq!(Format::sniff(&PNG_SIGNATURE), Some(Format::Png));
    assert_eq!(Format::sniff(b"RIFF\x10\0\0\0WEBPVP8X"), Some(Format::WebP));
    assert_eq!(Format::sniff(b"GIF89a\x01\0"), Some(Format::Gif));
    assert_eq!(Format::sniff(b"GIF87a"), Some(Format::Gif));
    assert_eq!(Format::sniff(b"RIFF\x10\0\0\0WAVE"), None);
    assert_eq!(Format::sniff(b"\xff\xd8\xff"), None);
}

#[test]
fn byte_order_is_per_format() {
    assert_eq!(Format::Png.byte_order(), ByteOrder::BigEndian);
    assert_eq!(Format::WebP.byte_order(), ByteOrder::LittleEndian);
    assert_eq!(Format::Gif.byte_order(), ByteOrder::LittleEndian);
}

#[test]
fn fourcc_display_escapes_non_ascii() {
    assert_eq!(FourCC::new(b"IDAT").to_string(), "IDAT");
    assert_eq!(FourCC([0x89, b'P', b'N', b'G']).to_string(), "\\x89PNG");
    assert!(FourCC::new(b"tEXt").is_ancillary());
    assert!(!FourCC::new(b"IDAT").is_ancillary());
}

#[test]
fn sampled_rect_truncates_both_edges() {
    let r = IntRect::new(25, 25, 50, 51).sampled(2);
    assert_eq!(r, IntRect::new(12, 12, 25, 26));
    // Odd origin: the far edge 7 lands on sampled column 3.
    assert_eq!(IntRect::new(1, 1, 6, 6).sampled(2), IntRect::new(0, 0, 3, 3));
    assert_eq!(IntRect::new(1, 1, 7, 7).sampled(2), IntRect::new(0, 0, 4, 4));
    assert_eq!(IntRect::new(3, 0, 1, 1).sampled(4), IntRect::new(0, 0, 1, 0));
    assert_eq!(Size::new(101, 99).sampled(4), Size::new(25, 24));
}

#[test]
fn clip_rejects_outside_and_trims_overhang() {
    let canvas = Size::new(10, 10);
    assert_eq!(IntRect::new(8, 8, 5, 5).clip_to(canvas), Some((8, 8, 10, 10)));
    assert_eq!(IntRect::new(-2, 0, 4, 1).clip_to(canvas), Some((0, 0, 2, 1)));
    assert_eq!(IntRect::new(10, 0, 4, 4).clip_to(canvas), None);
    assert_eq!(IntRect::new(0, 0, 0, 4).clip_to(canvas), None);
}

#[test]
fn premultiply_matches_rounding() {
    assert_eq!(Rgba8::new(255, 128, 0, 128).premultiplied(), [128, 64, 0, 128]);
    assert_eq!(Rgba8::TRANSPARENT.premultiplied(), [0, 0, 0, 0]);
}
