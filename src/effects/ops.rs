//! Pixel kernels behind the filter registry.
//!
//! All kernels take opaque straight-alpha RGBA8 frames and leave alpha untouched. Point operations
//! run per row on the rayon pool of the caller.

use rayon::prelude::*;

use crate::foundation::error::{FramecutError, FramecutResult};
use crate::foundation::math::clamp_u8;
use crate::render::frame::FrameRGBA;

/// Rec. 709 luma weights.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA[0] + rgb[1] * LUMA[1] + rgb[2] * LUMA[2]
}

/// Apply `f` to every pixel's normalized RGB.
pub(crate) fn map_rgb<F>(frame: &mut FrameRGBA, f: F)
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync,
{
    let stride = frame.stride();
    frame.data.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let rgb = [
                f32::from(px[0]) / 255.0,
                f32::from(px[1]) / 255.0,
                f32::from(px[2]) / 255.0,
            ];
            let out = f(rgb);
            px[0] = clamp_u8(out[0] * 255.0);
            px[1] = clamp_u8(out[1] * 255.0);
            px[2] = clamp_u8(out[2] * 255.0);
        }
    });
}

/// Saturation, then brightness offset, then contrast about mid-grey.
pub(crate) fn color_controls(frame: &mut FrameRGBA, saturation: f32, brightness: f32, contrast: f32) {
    map_rgb(frame, |rgb| {
        let l = luma(rgb);
        rgb.map(|c| {
            let c = l + (c - l) * saturation;
            let c = c + brightness;
            (c - 0.5) * contrast + 0.5
        })
    });
}

/// Luma with a contrast curve and black lift.
pub(crate) fn monochrome(frame: &mut FrameRGBA, contrast: f32, lift: f32) {
    map_rgb(frame, |rgb| {
        let l = (luma(rgb) - 0.5) * contrast + 0.5;
        let l = lift + l * (1.0 - lift);
        [l, l, l]
    });
}

/// Washed-out look: lifted blacks and reduced saturation.
pub(crate) fn fade(frame: &mut FrameRGBA) {
    map_rgb(frame, |rgb| {
        let l = luma(rgb);
        rgb.map(|c| {
            let c = l + (c - l) * 0.7;
            0.12 + c * 0.8
        })
    });
}

/// Sepia tone blended with the source by `intensity`.
pub(crate) fn sepia(frame: &mut FrameRGBA, intensity: f32) {
    let k = intensity.clamp(0.0, 1.0);
    map_rgb(frame, |[r, g, b]| {
        let sr = 0.393 * r + 0.769 * g + 0.189 * b;
        let sg = 0.349 * r + 0.686 * g + 0.168 * b;
        let sb = 0.272 * r + 0.534 * g + 0.131 * b;
        [r + (sr - r) * k, g + (sg - g) * k, b + (sb - b) * k]
    });
}

/// Invert color channels.
pub(crate) fn invert(frame: &mut FrameRGBA) {
    map_rgb(frame, |rgb| rgb.map(|c| 1.0 - c));
}

/// Quantize each channel to `levels` steps.
pub(crate) fn posterize(frame: &mut FrameRGBA, levels: f32) {
    let steps = (levels.round().max(2.0)) - 1.0;
    map_rgb(frame, |rgb| rgb.map(|c| (c * steps).round() / steps));
}

/// Piecewise-linear tone curve through `points` (x ascending), applied per channel.
pub(crate) fn tone_curve(frame: &mut FrameRGBA, points: &[[f32; 2]]) {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let x = i as f32 / 255.0;
        *v = clamp_u8(eval_curve(points, x) * 255.0);
    }
    let stride = frame.stride();
    frame.data.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            px[0] = lut[px[0] as usize];
            px[1] = lut[px[1] as usize];
            px[2] = lut[px[2] as usize];
        }
    });
}

fn eval_curve(points: &[[f32; 2]], x: f32) -> f32 {
    let Some(first) = points.first() else {
        return x;
    };
    if x <= first[0] {
        return first[1];
    }
    for w in points.windows(2) {
        let [x0, y0] = w[0];
        let [x1, y1] = w[1];
        if x <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    points.last().map_or(x, |p| p[1])
}

/// Darken toward the corners. `radius` scales how far in from the corners the falloff starts.
pub(crate) fn vignette(frame: &mut FrameRGBA, intensity: f32, radius: f32) {
    let w = frame.width as f32;
    let h = frame.height as f32;
    let cx = w / 2.0;
    let cy = h / 2.0;
    let max_d = (cx * cx + cy * cy).sqrt().max(1.0);
    let stride = frame.stride();
    frame
        .data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 + 0.5 - cx;
                let d = ((dx * dx + dy * dy).sqrt() / max_d * radius.max(0.0)).clamp(0.0, 1.0);
                let falloff = d * d * (3.0 - 2.0 * d);
                let gain = (1.0 - intensity * falloff).clamp(0.0, 1.0);
                for c in &mut px[..3] {
                    *c = clamp_u8(f32::from(*c) * gain);
                }
            }
        });
}

/// Replace each `scale x scale` block with its average color.
pub(crate) fn pixellate(frame: &mut FrameRGBA, scale: f32) {
    let block = (scale.round() as u32).max(1) as usize;
    if block == 1 {
        return;
    }
    let w = frame.width as usize;
    let h = frame.height as usize;
    let stride = frame.stride();
    frame
        .data
        .par_chunks_mut(stride * block)
        .for_each(|band| {
            let rows = band.len() / stride;
            let mut bx = 0usize;
            while bx < w {
                let bw = block.min(w - bx);
                let mut acc = [0u64; 3];
                for r in 0..rows {
                    for x in bx..bx + bw {
                        let i = r * stride + x * 4;
                        for c in 0..3 {
                            acc[c] += u64::from(band[i + c]);
                        }
                    }
                }
                let n = (rows * bw) as u64;
                let avg = acc.map(|a| ((a + n / 2) / n) as u8);
                for r in 0..rows {
                    for x in bx..bx + bw {
                        let i = r * stride + x * 4;
                        band[i..i + 3].copy_from_slice(&avg);
                    }
                }
                bx += block;
            }
        });
    debug_assert!(h == 0 || frame.data.len() == h * stride);
}

/// Separable gaussian blur. `radius` is the standard deviation in pixels.
pub(crate) fn gaussian_blur(frame: &mut FrameRGBA, radius: f32) -> FramecutResult<()> {
    if radius <= 0.0 {
        return Ok(());
    }
    let kernel = gaussian_kernel_q16((radius * 3.0).ceil() as u32, radius)?;
    let mut tmp = vec![0u8; frame.data.len()];
    horizontal_blur_q16(&frame.data, &mut tmp, frame.width, &kernel);
    vertical_blur_q16(&tmp, &mut frame.data, frame.width, frame.height, &kernel);
    Ok(())
}

/// Add a blurred copy on top of the source.
pub(crate) fn bloom(frame: &mut FrameRGBA, radius: f32, intensity: f32) -> FramecutResult<()> {
    let mut glow = frame.clone();
    gaussian_blur(&mut glow, radius)?;
    frame
        .data
        .par_chunks_mut(4)
        .zip(glow.data.par_chunks(4))
        .for_each(|(d, g)| {
            for c in 0..3 {
                let base = f32::from(d[c]) / 255.0;
                let add = f32::from(g[c]) / 255.0 * intensity;
                // screen blend keeps highlights from clipping hard
                let v = 1.0 - (1.0 - base) * (1.0 - add.clamp(0.0, 1.0));
                d[c] = clamp_u8(v * 255.0);
            }
        });
    Ok(())
}

/// Unsharp mask on luma.
pub(crate) fn sharpen_luminance(frame: &mut FrameRGBA, sharpness: f32) -> FramecutResult<()> {
    let mut soft = frame.clone();
    gaussian_blur(&mut soft, 1.5)?;
    frame
        .data
        .par_chunks_mut(4)
        .zip(soft.data.par_chunks(4))
        .for_each(|(d, s)| {
            let px = [f32::from(d[0]), f32::from(d[1]), f32::from(d[2])];
            let bl = [f32::from(s[0]), f32::from(s[1]), f32::from(s[2])];
            let detail = (luma(px) - luma(bl)) * sharpness;
            for c in 0..3 {
                d[c] = clamp_u8(px[c] + detail);
            }
        });
    Ok(())
}

/// Sobel gradient magnitude per channel, scaled by `intensity`.
pub(crate) fn edges(frame: &mut FrameRGBA, intensity: f32) {
    let src = frame.data.clone();
    let w = frame.width as i64;
    let h = frame.height as i64;
    let stride = frame.stride();
    let at = |x: i64, y: i64, c: usize| -> f32 {
        let x = x.clamp(0, w - 1) as usize;
        let y = y.clamp(0, h - 1) as usize;
        f32::from(src[y * stride + x * 4 + c])
    };
    frame
        .data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let x = x as i64;
                for c in 0..3 {
                    let gx = -at(x - 1, y - 1, c) - 2.0 * at(x - 1, y, c) - at(x - 1, y + 1, c)
                        + at(x + 1, y - 1, c)
                        + 2.0 * at(x + 1, y, c)
                        + at(x + 1, y + 1, c);
                    let gy = -at(x - 1, y - 1, c) - 2.0 * at(x, y - 1, c) - at(x + 1, y - 1, c)
                        + at(x - 1, y + 1, c)
                        + 2.0 * at(x, y + 1, c)
                        + at(x + 1, y + 1, c);
                    px[c] = clamp_u8((gx * gx + gy * gy).sqrt() * intensity);
                }
            }
        });
}

/// Posterized color with dark outlines.
pub(crate) fn comic(frame: &mut FrameRGBA) {
    let mut outline = frame.clone();
    monochrome(&mut outline, 1.0, 0.0);
    edges(&mut outline, 1.0);
    posterize(frame, 4.0);
    frame
        .data
        .par_chunks_mut(4)
        .zip(outline.data.par_chunks(4))
        .for_each(|(d, e)| {
            let ink = (f32::from(e[0]) / 255.0 * 2.0).clamp(0.0, 1.0);
            for c in &mut d[..3] {
                *c = clamp_u8(f32::from(*c) * (1.0 - ink));
            }
        });
}

/// Halftone dot screen on luma. `width` is the dot pitch in pixels.
pub(crate) fn dot_screen(frame: &mut FrameRGBA, width: f32, sharpness: f32) {
    let pitch = width.max(1.0);
    let k = std::f32::consts::TAU / pitch;
    let stride = frame.stride();
    frame
        .data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let cy = (y as f32 * k).cos();
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let l = luma([
                    f32::from(px[0]) / 255.0,
                    f32::from(px[1]) / 255.0,
                    f32::from(px[2]) / 255.0,
                ]);
                let pattern = ((x as f32 * k).cos() + cy) * 0.25 + 0.5;
                let v = ((l - pattern) * sharpness + 0.5).clamp(0.0, 1.0);
                let v = clamp_u8(v * 255.0);
                px[0] = v;
                px[1] = v;
                px[2] = v;
            }
        });
}

/// Voronoi cells of roughly `radius` pixels, each filled with the color at its site.
pub(crate) fn crystallize(frame: &mut FrameRGBA, radius: f32) {
    let cell = radius.round().max(1.0) as i64;
    let w = frame.width as i64;
    let h = frame.height as i64;
    let stride = frame.stride();
    let src = frame.data.clone();

    let site = |gx: i64, gy: i64| -> (i64, i64) {
        let hsh = site_hash(gx, gy);
        let jx = (hsh & 0xffff) as i64 % cell;
        let jy = ((hsh >> 16) & 0xffff) as i64 % cell;
        (gx * cell + jx, gy * cell + jy)
    };

    frame
        .data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            let gy = y.div_euclid(cell);
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let x = x as i64;
                let gx = x.div_euclid(cell);
                let mut best = (i64::MAX, 0i64, 0i64);
                for oy in -1..=1 {
                    for ox in -1..=1 {
                        let (sx, sy) = site(gx + ox, gy + oy);
                        let d = (sx - x) * (sx - x) + (sy - y) * (sy - y);
                        if d < best.0 {
                            best = (d, sx, sy);
                        }
                    }
                }
                let sx = best.1.clamp(0, w - 1) as usize;
                let sy = best.2.clamp(0, h - 1) as usize;
                let i = sy * stride + sx * 4;
                px[..3].copy_from_slice(&src[i..i + 3]);
            }
        });
}

fn site_hash(x: i64, y: i64) -> u64 {
    let mut v = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    v ^= v >> 29;
    v = v.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    v ^ (v >> 32)
}

pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> FramecutResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FramecutError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push rounding error into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let stride = width as usize * 4;
    dst.par_chunks_mut(stride)
        .zip(src.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(in_row[idx + c]);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    out_row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let stride = width as usize * 4;
    dst.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..width as usize {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                    let idx = sy * stride + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    out_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/ops.rs"]
mod tests;
