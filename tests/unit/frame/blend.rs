use super::*;

#[test]
fn over_identity_cases() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [0, 0, 0, 0]), dst);
    assert_eq!(over(dst, [1, 2, 3, 255]), [1, 2, 3, 255]);
    assert_eq!(over([0, 0, 0, 0], [50, 0, 0, 128]), [50, 0, 0, 128]);
}

#[test]
fn over_half_alpha_on_opaque() {
    // 50% red over opaque blue
    let out = over([0, 0, 255, 255], [128, 0, 0, 128]);
    assert_eq!(out, [128, 0, 127, 255]);
}

#[test]
fn fill_and_copy_are_clipped() {
    let mut a = PixelBuffer::new(4, 4);
    fill_rect(&mut a, IntRect::new(2, 2, 10, 10), [1, 1, 1, 1]);
    assert_eq!(a.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(a.pixel(3, 3), Some([1, 1, 1, 1]));

    let mut b = PixelBuffer::new(4, 4);
    copy_rect(&mut b, &a, IntRect::new(3, 0, 1, 4));
    assert_eq!(b.pixel(3, 3), Some([1, 1, 1, 1]));
    assert_eq!(b.pixel(2, 2), Some([0, 0, 0, 0]));
}

#[test]
fn draw_source_replaces_and_over_blends() {
    let mut canvas = PixelBuffer::new(3, 3);
    canvas.fill([0, 0, 255, 255]);
    let mut frame = PixelBuffer::new(2, 2);
    frame.fill([0, 0, 0, 0]);

    draw(&mut canvas, &frame, 1, 1, Blend::Over);
    assert_eq!(canvas.pixel(2, 2), Some([0, 0, 255, 255]));

    draw(&mut canvas, &frame, 1, 1, Blend::Source);
    assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 0]));
    assert_eq!(canvas.pixel(0, 0), Some([0, 0, 255, 255]));
}

#[test]
fn draw_clips_negative_and_overflowing_offsets() {
    let mut canvas = PixelBuffer::new(2, 2);
    let mut frame = PixelBuffer::new(2, 2);
    frame.fill([9, 9, 9, 255]);
    draw(&mut canvas, &frame, -1, 1, Blend::Source);
    assert_eq!(canvas.pixel(0, 1), Some([9, 9, 9, 255]));
    assert_eq!(canvas.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn underlay_fills_transparent_only() {
    let mut buf = PixelBuffer::new(2, 1);
    buf.data_mut()[0..4].copy_from_slice(&[10, 10, 10, 255]);
    underlay(&mut buf, [200, 0, 0, 255]);
    assert_eq!(buf.pixel(0, 0), Some([10, 10, 10, 255]));
    assert_eq!(buf.pixel(1, 0), Some([200, 0, 0, 255]));
}
