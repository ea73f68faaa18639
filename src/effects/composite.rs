use rayon::prelude::*;

use crate::foundation::error::{FramecutError, FramecutResult};
use crate::foundation::math::mul_div255_u8;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for one premultiplied pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite a premultiplied layer over `dst`, row-parallel.
///
/// `dst` is an opaque video frame, so straight and premultiplied storage coincide and the result
/// stays opaque.
pub fn over_in_place(dst: &mut [u8], src: &[u8], width: u32, opacity: f32) -> FramecutResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FramecutError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    let stride = (width as usize * 4).max(4);
    dst.par_chunks_mut(stride)
        .zip(src.par_chunks(stride))
        .for_each(|(d_row, s_row)| {
            for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
                if s[3] == 0 {
                    continue;
                }
                let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
                d.copy_from_slice(&out);
            }
        });
    Ok(())
}

/// Return `true` when every pixel of a premultiplied buffer is fully transparent.
pub fn is_fully_transparent(buf: &[u8]) -> bool {
    buf.chunks_exact(4).all(|px| px[3] == 0)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
