use crate::foundation::core::IntRect;
use crate::foundation::math::mul_div255_u8;
use crate::frame::model::Blend;
use crate::render::buffer::PixelBuffer;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// `src` over `dst`, both premultiplied.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);
    std::array::from_fn(|i| src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv)))
}

/// Set every pixel of `rect` (clipped to the buffer) to `px`.
pub fn fill_rect(buf: &mut PixelBuffer, rect: IntRect, px: PremulRgba8) {
    let Some((x0, y0, x1, y1)) = rect.clip_to(buf.size()) else {
        return;
    };
    let stride = buf.width() as usize * 4;
    let data = buf.data_mut();
    for y in y0..y1 {
        let row = y as usize * stride;
        for d in data[row + x0 as usize * 4..row + x1 as usize * 4].chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }
}

/// Copy `rect` from `src` into `dst`; both buffers must share dimensions.
pub fn copy_rect(dst: &mut PixelBuffer, src: &PixelBuffer, rect: IntRect) {
    if dst.size() != src.size() {
        return;
    }
    let Some((x0, y0, x1, y1)) = rect.clip_to(dst.size()) else {
        return;
    };
    let stride = dst.width() as usize * 4;
    for y in y0..y1 {
        let a = y as usize * stride + x0 as usize * 4;
        let b = y as usize * stride + x1 as usize * 4;
        dst.data_mut()[a..b].copy_from_slice(&src.data()[a..b]);
    }
}

/// Draw `src` with its top-left corner at `(x, y)`, clipped to `dst`.
pub fn draw(dst: &mut PixelBuffer, src: &PixelBuffer, x: i32, y: i32, blend: Blend) {
    let rect = IntRect::new(x, y, src.width(), src.height());
    let Some((x0, y0, x1, y1)) = rect.clip_to(dst.size()) else {
        return;
    };
    let dst_stride = dst.width() as usize * 4;
    let src_stride = src.width() as usize * 4;
    let sx0 = (i64::from(x0) - i64::from(x)) as usize;
    let sy0 = (i64::from(y0) - i64::from(y)) as usize;
    let w = (x1 - x0) as usize * 4;

    for row in 0..(y1 - y0) as usize {
        let d = (y0 as usize + row) * dst_stride + x0 as usize * 4;
        let s = (sy0 + row) * src_stride + sx0 * 4;
        let src_row = &src.data()[s..s + w];
        let dst_row = &mut dst.data_mut()[d..d + w];
        match blend {
            Blend::Source => dst_row.copy_from_slice(src_row),
            Blend::Over => {
                for (dp, sp) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                    let out = over([dp[0], dp[1], dp[2], dp[3]], [sp[0], sp[1], sp[2], sp[3]]);
                    dp.copy_from_slice(&out);
                }
            }
        }
    }
}

/// Composite `px` underneath every pixel of the buffer.
pub fn underlay(buf: &mut PixelBuffer, px: PremulRgba8) {
    if px[3] == 0 {
        return;
    }
    for d in buf.data_mut().chunks_exact_mut(4) {
        let out = over(px, [d[0], d[1], d[2], d[3]]);
        d.copy_from_slice(&out);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/blend.rs"]
mod tests;
