use weezl::{BitOrder, LzwStatus, decode::Decoder};

use crate::foundation::error::{FrameSeqError, FrameSeqResult};

/// Expand GIF LZW data into palette indices.
///
/// `out` is resized to `pixel_count`; returns how many indices were actually produced.
/// A stream that ends early is not an error, the missing pixels stay unset.
pub fn decode_indices(
    data: &[u8],
    min_code_size: u8,
    pixel_count: usize,
    out: &mut Vec<u8>,
) -> FrameSeqResult<usize> {
    if !(2..=11).contains(&min_code_size) {
        return Err(FrameSeqError::decode(format!(
            "unsupported LZW code size {min_code_size}"
        )));
    }
    out.clear();
    out.resize(pixel_count, 0);

    let mut decoder = Decoder::new(BitOrder::Lsb, min_code_size);
    let mut consumed = 0usize;
    let mut produced = 0usize;
    while produced < pixel_count {
        let res = decoder.decode_bytes(&data[consumed..], &mut out[produced..]);
        consumed += res.consumed_in;
        produced += res.consumed_out;
        match res.status {
            Ok(LzwStatus::Done) | Ok(LzwStatus::NoProgress) => break,
            Ok(LzwStatus::Ok) => {
                if res.consumed_in == 0 && res.consumed_out == 0 {
                    break;
                }
            }
            Err(err) => {
                if produced == 0 {
                    return Err(FrameSeqError::decode(format!("lzw: {err}")));
                }
                tracing::debug!(%err, produced, "lzw stream ended with an error");
                break;
            }
        }
    }
    Ok(produced)
}

/// Stored row index for each display row of an interlaced image.
pub fn interlaced_rows(height: u32) -> Vec<u32> {
    let mut map = vec![0u32; height as usize];
    let mut stored = 0u32;
    for (start, step) in [(0u32, 8u32), (4, 8), (2, 4), (1, 2)] {
        let mut row = start;
        while row < height {
            map[row as usize] = stored;
            stored += 1;
            row += step;
        }
    }
    map
}

#[cfg(test)]
#[path = "../../tests/unit/raster/lzw.rs"]
mod tests;
