use rayon::prelude::*;

use crate::foundation::core::Point;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::OrientationInfo;
use crate::render::frame::FrameRGBA;

/// Turn a natural-size decoded frame into an upright `render_size` frame.
///
/// Each render pixel center is pulled back through the inverse presentation transform and sampled
/// nearest-neighbor, which is exact for the quarter-turn and half-turn cases. Pixels that map
/// outside the source stay transparent black.
pub fn orient_frame(natural: FrameRGBA, info: &OrientationInfo) -> FramecutResult<FrameRGBA> {
    if natural.size() != info.natural_size {
        return Err(FramecutError::validation(format!(
            "decoded frame is {}x{}, expected {}x{}",
            natural.width, natural.height, info.natural_size.width, info.natural_size.height
        )));
    }
    if info.presentation_transform.as_coeffs() == [1.0, 0.0, 0.0, 1.0, 0.0, 0.0] {
        return Ok(natural);
    }

    let inv = info.render_to_natural();
    let out_size = info.render_size;
    let src_w = i64::from(natural.width);
    let src_h = i64::from(natural.height);
    let src_stride = natural.stride();
    let mut data = vec![0u8; out_size.rgba_len()];

    data.par_chunks_mut(out_size.width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let p = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let sx = p.x.floor() as i64;
                let sy = p.y.floor() as i64;
                if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
                    continue;
                }
                let i = sy as usize * src_stride + sx as usize * 4;
                px.copy_from_slice(&natural.data[i..i + 4]);
            }
        });

    Ok(FrameRGBA {
        width: out_size.width,
        height: out_size.height,
        data,
        premultiplied: natural.premultiplied,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/orient.rs"]
mod tests;
