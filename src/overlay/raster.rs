//! Rasterize overlays once per export and flatten them into one static premultiplied layer.

use std::sync::Arc;

use crate::assets::decode::{StickerSource, load_sticker};
use crate::assets::svg_raster::rasterize_svg_to_premul_rgba8;
use crate::assets::text::{TextBrushRgba8, TextLayoutEngine, load_font_bytes};
use crate::foundation::core::{Affine, PixelSize, Vec2};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::overlay::element::{OverlayElement, OverlayKind, TextOverlay};
use crate::overlay::mapper::{MappedOverlay, VerticalConvention, map_overlay};
use crate::render::frame::FrameRGBA;

/// Standalone premultiplied raster of one overlay's content.
#[derive(Clone, Debug)]
pub struct OverlayImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixels.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// One overlay ready to draw: its raster plus where it lands on the render frame.
#[derive(Clone, Debug)]
pub struct PlacedOverlay {
    /// Content raster.
    pub image: OverlayImage,
    /// Mapped placement in render pixels.
    pub mapped: MappedOverlay,
}

impl PlacedOverlay {
    /// Transform from raster pixels to render-frame pixels.
    pub fn image_transform(&self) -> Affine {
        let rect = self.mapped.pixel_rect;
        self.mapped.content_transform()
            * Affine::scale_non_uniform(
                rect.width() / f64::from(self.image.width),
                rect.height() / f64::from(self.image.height),
            )
    }
}

/// Rasterizes overlay content, reusing one text layout engine across overlays.
pub struct OverlayRasterizer {
    text_engine: TextLayoutEngine,
}

impl Default for OverlayRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRasterizer {
    /// Create a rasterizer.
    pub fn new() -> Self {
        Self {
            text_engine: TextLayoutEngine::new(),
        }
    }

    /// Map and rasterize every overlay for a frame of `render_size`.
    #[tracing::instrument(skip(self, overlays), fields(count = overlays.len()))]
    pub fn place_all(
        &mut self,
        overlays: &[OverlayElement],
        render_size: PixelSize,
        is_portrait: bool,
        convention: VerticalConvention,
    ) -> FramecutResult<Vec<PlacedOverlay>> {
        overlays
            .iter()
            .map(|el| {
                el.validate()?;
                let mapped = map_overlay(&el.placement, render_size, is_portrait, convention)?;
                let image = self.rasterize(el, &mapped)?;
                tracing::debug!(
                    id = el.id.0,
                    w = image.width,
                    h = image.height,
                    x = mapped.pixel_rect.x0,
                    y = mapped.pixel_rect.y0,
                    "overlay rasterized"
                );
                Ok(PlacedOverlay { image, mapped })
            })
            .collect()
    }

    /// Rasterize one overlay's content at its mapped pixel size.
    pub fn rasterize(
        &mut self,
        element: &OverlayElement,
        mapped: &MappedOverlay,
    ) -> FramecutResult<OverlayImage> {
        let (w, h) = raster_dims(mapped)?;
        match &element.kind {
            OverlayKind::Text(text) => self.rasterize_text(text, mapped.content_scale, w, h),
            OverlayKind::Sticker(sticker) => match load_sticker(&sticker.image_path)? {
                StickerSource::Raster(img) => Ok(OverlayImage {
                    width: img.width,
                    height: img.height,
                    rgba8_premul: img.rgba8_premul,
                }),
                StickerSource::Svg(tree) => Ok(OverlayImage {
                    width: w,
                    height: h,
                    rgba8_premul: Arc::new(rasterize_svg_to_premul_rgba8(&tree, w, h)?),
                }),
            },
        }
    }

    fn rasterize_text(
        &mut self,
        text: &TextOverlay,
        content_scale: f64,
        w: u32,
        h: u32,
    ) -> FramecutResult<OverlayImage> {
        let font_bytes = load_font_bytes(text.font_path.as_deref())?;
        let size_px = text.font_size * content_scale as f32;
        let layout = self.text_engine.layout_plain(
            &text.text,
            &font_bytes,
            size_px,
            TextBrushRgba8::from(text.color),
            Some(w as f32),
        )?;
        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);

        let (wu, hu) = (to_u16(w)?, to_u16(h)?);
        let mut ctx = vello_cpu::RenderContext::new(wu, hu);
        // centered in the widget box, like a label with centered alignment
        let offset = Vec2::new(
            ((f64::from(w) - f64::from(layout.width())) / 2.0).max(0.0),
            ((f64::from(h) - f64::from(layout.height())) / 2.0).max(0.0),
        );
        ctx.set_transform(affine_to_cpu(Affine::translate(offset)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(wu, hu);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(OverlayImage {
            width: w,
            height: h,
            rgba8_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
        })
    }
}

/// Draw placed overlays, in list order, into one transparent premultiplied layer.
///
/// Returns `None` when there is nothing to draw so the per-frame composite can be skipped.
pub fn flatten_overlays(
    placed: &[PlacedOverlay],
    render_size: PixelSize,
) -> FramecutResult<Option<FrameRGBA>> {
    if placed.is_empty() {
        return Ok(None);
    }
    let (wu, hu) = (to_u16(render_size.width)?, to_u16(render_size.height)?);
    let mut ctx = vello_cpu::RenderContext::new(wu, hu);
    for p in placed {
        let pixmap = pixmap_from_premul_bytes(&p.image.rgba8_premul, p.image.width, p.image.height)?;
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(affine_to_cpu(p.image_transform()));
        ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(p.image.width),
            f64::from(p.image.height),
        ));
    }
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(wu, hu);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(Some(FrameRGBA {
        width: render_size.width,
        height: render_size.height,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    }))
}

fn raster_dims(mapped: &MappedOverlay) -> FramecutResult<(u32, u32)> {
    let w = mapped.pixel_rect.width().ceil();
    let h = mapped.pixel_rect.height().ceil();
    if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
        return Err(FramecutError::validation(format!(
            "overlay maps to an empty pixel rect ({w}x{h})"
        )));
    }
    Ok((w as u32, h as u32))
}

fn to_u16(v: u32) -> FramecutResult<u16> {
    v.try_into()
        .map_err(|_| FramecutError::validation(format!("raster dimension {v} exceeds u16")))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> FramecutResult<vello_cpu::Pixmap> {
    let w = to_u16(width)?;
    let h = to_u16(height)?;
    if bytes.len() != PixelSize::new(width, height).rgba_len() {
        return Err(FramecutError::validation("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/raster.rs"]
mod tests;
