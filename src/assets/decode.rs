use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{FramecutError, FramecutResult};

/// Decoded raster image, premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Sticker source as loaded from disk.
#[derive(Clone, Debug)]
pub enum StickerSource {
    /// Raster image.
    Raster(PreparedImage),
    /// Vector image, rasterized at placement size.
    Svg(Arc<usvg::Tree>),
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> FramecutResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse SVG bytes into a `usvg` tree.
pub fn parse_svg(bytes: &[u8]) -> FramecutResult<Arc<usvg::Tree>> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(Arc::new(tree))
}

/// Load a sticker file, choosing the SVG path by extension.
pub fn load_sticker(path: &Path) -> FramecutResult<StickerSource> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read sticker '{}'", path.display()))?;
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        Ok(StickerSource::Svg(parse_svg(&bytes)?))
    } else {
        let img = decode_image(&bytes)?;
        if img.width == 0 || img.height == 0 {
            return Err(FramecutError::validation(format!(
                "sticker '{}' has zero size",
                path.display()
            )));
        }
        Ok(StickerSource::Raster(img))
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
