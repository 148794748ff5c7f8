use super::*;
use image::ImageEncoder;

fn png_bytes(w: u32, h: u32, px: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let mut raw = Vec::new();
    for y in 0..h {
        for x in 0..w {
            raw.extend_from_slice(&px(x, y));
        }
    }
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(&raw, w, h, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

#[test]
fn decodes_png_premultiplied() {
    let bytes = png_bytes(2, 1, |x, _| if x == 0 { [255, 0, 0, 255] } else { [200, 100, 0, 128] });
    let mut d = ImageRasterDecoder::new();
    let out = d
        .decode(RasterRequest::Encoded { format: Format::Png, bytes: &bytes }, 1, None)
        .unwrap();
    assert_eq!(out.size(), Size::new(2, 1));
    assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(1, 0), Some([100, 50, 0, 128]));
}

#[test]
fn subsamples_and_reuses_buffer() {
    let bytes = png_bytes(5, 4, |x, y| [(x * 10) as u8, (y * 10) as u8, 0, 255]);
    let mut d = ImageRasterDecoder::new();
    let reuse = PixelBuffer::new(32, 32);
    let ptr = reuse.data().as_ptr();
    let out = d
        .decode(RasterRequest::Encoded { format: Format::Png, bytes: &bytes }, 2, Some(reuse))
        .unwrap();
    assert_eq!(out.size(), Size::new(2, 2));
    assert_eq!(out.data().as_ptr(), ptr);
    assert_eq!(out.pixel(1, 1), Some([20, 20, 0, 255]));
}

#[test]
fn garbage_is_a_decode_error() {
    let mut d = ImageRasterDecoder::new();
    let err = d
        .decode(RasterRequest::Encoded { format: Format::Png, bytes: b"nope" }, 1, None)
        .unwrap_err();
    assert!(matches!(err, FrameSeqError::Decode(_)));
}

#[test]
fn probe_reads_dimensions() {
    let bytes = png_bytes(7, 3, |_, _| [0, 0, 0, 255]);
    let mut d = ImageRasterDecoder::new();
    assert_eq!(d.probe(Format::Png, &bytes).unwrap(), Size::new(7, 3));
}

#[test]
fn gif_indices_expand_with_transparency_and_interlace() {
    // 2x4 image, rows stored in interlaced order: display rows 0,2,1,3 -> stored 0,2,1,3
    let display = [[1u8, 1], [2, 2], [3, 3], [0, 0]];
    let rows = interlaced_rows(4);
    let mut stored = vec![[0u8; 2]; 4];
    for (row, px) in display.iter().enumerate() {
        stored[rows[row] as usize] = *px;
    }
    let flat: Vec<u8> = stored.concat();
    let data = weezl::encode::Encoder::new(weezl::BitOrder::Lsb, 2)
        .encode(&flat)
        .unwrap();
    let palette = [[0, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]];

    let mut d = ImageRasterDecoder::new();
    let out = d
        .decode(
            RasterRequest::GifIndexed {
                data: &data,
                min_code_size: 2,
                width: 2,
                height: 4,
                palette: &palette,
                transparent: Some(0),
                interlaced: true,
            },
            1,
            None,
        )
        .unwrap();
    assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(1, 1), Some([0, 255, 0, 255]));
    assert_eq!(out.pixel(0, 2), Some([0, 0, 255, 255]));
    assert_eq!(out.pixel(0, 3), Some([0, 0, 0, 0]));
}

#[test]
fn gif_short_data_leaves_rest_transparent() {
    let data = weezl::encode::Encoder::new(weezl::BitOrder::Lsb, 2)
        .encode(&[1, 1])
        .unwrap();
    let palette = [[0, 0, 0], [9, 9, 9], [0, 0, 0], [0, 0, 0]];
    let mut d = ImageRasterDecoder::new();
    let out = d
        .decode(
            RasterRequest::GifIndexed {
                data: &data,
                min_code_size: 2,
                width: 2,
                height: 2,
                palette: &palette,
                transparent: None,
                interlaced: false,
            },
            1,
            None,
        )
        .unwrap();
    assert_eq!(out.pixel(1, 0), Some([9, 9, 9, 255]));
    assert_eq!(out.pixel(0, 1), Some([0, 0, 0, 0]));
}

#[test]
fn sample_too_large_is_buffer_size_error() {
    let bytes = png_bytes(3, 3, |_, _| [0, 0, 0, 255]);
    let mut d = ImageRasterDecoder::new();
    let err = d
        .decode(RasterRequest::Encoded { format: Format::Png, bytes: &bytes }, 4, None)
        .unwrap_err();
    assert!(matches!(err, FrameSeqError::BufferSize { .. }));
}
