use std::path::PathBuf;

use crate::foundation::core::{Affine, Point, Rgba8, Size};
use crate::foundation::error::{FramecutError, FramecutResult};

/// Stable identifier for an overlay within one edit session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct OverlayId(pub u64);

/// Text caption content.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextOverlay {
    /// Caption text; may contain newlines.
    pub text: String,
    /// Fill color.
    #[serde(default)]
    pub color: Rgba8,
    /// Font file; `None` selects a system sans-serif face.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    /// Font size in editor points.
    pub font_size: f32,
}

/// Image sticker content (PNG/JPEG/WebP or SVG).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StickerOverlay {
    /// Image file.
    pub image_path: PathBuf,
}

/// What an overlay draws.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayKind {
    /// Text caption.
    Text(TextOverlay),
    /// Image sticker.
    Sticker(StickerOverlay),
}

/// Final placement of an overlay widget as captured in the editor.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayPlacement {
    /// Widget center in editor viewport points.
    pub center: Point,
    /// Unscaled widget size in editor points.
    pub size: Size,
    /// Rotation in radians, clockwise in a y-down space.
    #[serde(default)]
    pub rotation: f64,
    /// Horizontal gesture scale.
    #[serde(default = "one")]
    pub scale_x: f64,
    /// Vertical gesture scale.
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Size of the editor viewport the placement was captured against.
    pub editor_viewport: Size,
}

fn one() -> f64 {
    1.0
}

impl OverlayPlacement {
    /// Placement with no rotation or gesture scale.
    pub fn new(center: Point, size: Size, editor_viewport: Size) -> Self {
        Self {
            center,
            size,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            editor_viewport,
        }
    }

    /// Placement from a widget's final view transform (rotation and scale baked into `transform`).
    pub fn from_view_transform(
        center: Point,
        bounds: Size,
        transform: Affine,
        editor_viewport: Size,
    ) -> Self {
        let [a, b, c, d, _, _] = transform.as_coeffs();
        Self {
            center,
            size: bounds,
            rotation: b.atan2(a),
            scale_x: (a * a + b * b).sqrt(),
            scale_y: (c * c + d * d).sqrt(),
            editor_viewport,
        }
    }

    pub(crate) fn validate(&self) -> FramecutResult<()> {
        let finite = [
            self.center.x,
            self.center.y,
            self.size.width,
            self.size.height,
            self.rotation,
            self.scale_x,
            self.scale_y,
            self.editor_viewport.width,
            self.editor_viewport.height,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(FramecutError::validation(
                "overlay placement values must be finite",
            ));
        }
        if self.editor_viewport.width <= 0.0 || self.editor_viewport.height <= 0.0 {
            return Err(FramecutError::validation(
                "overlay editor viewport must be non-empty",
            ));
        }
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return Err(FramecutError::validation("overlay size must be > 0"));
        }
        if self.scale_x <= 0.0 || self.scale_y <= 0.0 {
            return Err(FramecutError::validation("overlay scale must be > 0"));
        }
        Ok(())
    }
}

/// A positioned text or sticker overlay. Immutable once handed to the engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayElement {
    /// Session-local identifier.
    pub id: OverlayId,
    /// Content.
    #[serde(flatten)]
    pub kind: OverlayKind,
    /// Editor-space placement.
    pub placement: OverlayPlacement,
}

impl OverlayElement {
    /// Text overlay.
    pub fn text(id: OverlayId, text: TextOverlay, placement: OverlayPlacement) -> Self {
        Self {
            id,
            kind: OverlayKind::Text(text),
            placement,
        }
    }

    /// Sticker overlay.
    pub fn sticker(id: OverlayId, image_path: impl Into<PathBuf>, placement: OverlayPlacement) -> Self {
        Self {
            id,
            kind: OverlayKind::Sticker(StickerOverlay {
                image_path: image_path.into(),
            }),
            placement,
        }
    }

    pub(crate) fn validate(&self) -> FramecutResult<()> {
        self.placement.validate()?;
        if let OverlayKind::Text(t) = &self.kind
            && (!t.font_size.is_finite() || t.font_size <= 0.0)
        {
            return Err(FramecutError::validation(
                "text overlay font_size must be finite and > 0",
            ));
        }
        Ok(())
    }
}
