use crate::foundation::core::{Affine, PixelSize, Point, Rect, Size, Vec2};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::overlay::element::OverlayPlacement;

/// Vertical-axis convention of the layer that receives mapped overlays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VerticalConvention {
    /// y grows downward in both editor and render space. The raster compositor uses this for
    /// every orientation.
    #[default]
    TopDown,
    /// Bottom-up layer trees that invert y only for portrait-rotated content.
    FlipWhenPortrait,
}

/// Overlay placement in render-size pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MappedOverlay {
    /// Axis-aligned box before rotation and gesture scale, centered on the mapped center.
    pub pixel_rect: Rect,
    /// Rotation in radians about the rect center.
    pub rotation: f64,
    /// Gesture scale along x, about the rect center.
    pub scale_x: f64,
    /// Gesture scale along y, about the rect center.
    pub scale_y: f64,
    /// Render pixels per editor point; text font sizes are multiplied by this.
    pub content_scale: f64,
}

impl MappedOverlay {
    /// Transform taking content drawn in `[0, w) x [0, h)` of the pixel rect to render space.
    pub fn content_transform(&self) -> Affine {
        let c = self.pixel_rect.center();
        Affine::translate(c.to_vec2())
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate(Vec2::new(
                -self.pixel_rect.width() / 2.0,
                -self.pixel_rect.height() / 2.0,
            ))
    }
}

/// Largest rect with `content`'s aspect ratio that fits in `container`, centered.
pub fn aspect_fit_rect(content: Size, container: Size) -> Rect {
    let content_aspect = content.width / content.height;
    let container_aspect = container.width / container.height;
    if container_aspect > content_aspect {
        // pillarbox
        let w = container.height * content_aspect;
        Rect::new(
            (container.width - w) / 2.0,
            0.0,
            (container.width + w) / 2.0,
            container.height,
        )
    } else {
        // letterbox
        let h = container.width / content_aspect;
        Rect::new(
            0.0,
            (container.height - h) / 2.0,
            container.width,
            (container.height + h) / 2.0,
        )
    }
}

/// Map an editor-space placement onto a render frame of `render_size`.
///
/// The overlay center is normalized against the aspect-fit rect of the video inside the editor
/// viewport (what the user actually saw), then scaled onto the render frame. The overlay size is
/// scaled by `min(render.w / rect.w, render.h / rect.h)`.
pub fn map_overlay(
    placement: &OverlayPlacement,
    render_size: PixelSize,
    is_portrait: bool,
    convention: VerticalConvention,
) -> FramecutResult<MappedOverlay> {
    placement.validate()?;
    if render_size.is_empty() {
        return Err(FramecutError::validation("render size must be non-empty"));
    }

    let render = render_size.to_kurbo();
    let video_rect = aspect_fit_rect(render, placement.editor_viewport);

    let nx = (placement.center.x - video_rect.x0) / video_rect.width();
    let mut ny = (placement.center.y - video_rect.y0) / video_rect.height();
    if convention == VerticalConvention::FlipWhenPortrait && is_portrait {
        ny = 1.0 - ny;
    }

    let content_scale =
        (render.width / video_rect.width()).min(render.height / video_rect.height());
    let w = placement.size.width * content_scale;
    let h = placement.size.height * content_scale;
    let center = Point::new(nx * render.width, ny * render.height);

    Ok(MappedOverlay {
        pixel_rect: Rect::from_center_size(center, Size::new(w, h)),
        rotation: placement.rotation,
        scale_x: placement.scale_x,
        scale_y: placement.scale_y,
        content_scale,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/mapper.rs"]
mod tests;
