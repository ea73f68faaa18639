//! Classify a stored preferred transform and derive the upright render geometry.

use crate::foundation::core::{Affine, PixelSize, Point};

const COEFF_EPS: f64 = 1e-6;

/// Canonical orientation of a video track's preferred transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Orientation {
    /// Identity linear part.
    Up,
    /// Rotated 180 degrees (`a = -1, d = -1`).
    Down,
    /// Rotated 90 degrees clockwise (`b = 1, c = -1`), typical of portrait phone capture.
    Right,
    /// Rotated 90 degrees counter-clockwise (`b = -1, c = 1`).
    Left,
    /// Any other matrix; rendered as if upright.
    Unsupported,
}

impl Orientation {
    /// Classify the linear part of `transform`.
    pub fn classify(transform: Affine) -> Self {
        let [a, b, c, d, _, _] = transform.as_coeffs();
        let is = |v: f64, want: f64| (v - want).abs() <= COEFF_EPS;
        if is(a, 0.0) && is(b, 1.0) && is(c, -1.0) && is(d, 0.0) {
            Self::Right
        } else if is(a, 0.0) && is(b, -1.0) && is(c, 1.0) && is(d, 0.0) {
            Self::Left
        } else if is(a, 1.0) && is(b, 0.0) && is(c, 0.0) && is(d, 1.0) {
            Self::Up
        } else if is(a, -1.0) && is(b, 0.0) && is(c, 0.0) && is(d, -1.0) {
            Self::Down
        } else {
            Self::Unsupported
        }
    }

    /// Return `true` for the two quarter-turn cases.
    pub fn is_portrait(self) -> bool {
        matches!(self, Self::Right | Self::Left)
    }

    /// Preferred transform a container stores for a clockwise `degrees` display rotation.
    ///
    /// Used when probing containers that report rotation as an angle instead of a matrix.
    pub fn preferred_transform_for_rotation(degrees: i32, natural: PixelSize) -> Affine {
        let w = f64::from(natural.width);
        let h = f64::from(natural.height);
        match degrees.rem_euclid(360) {
            90 => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
            180 => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
            270 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
            _ => Affine::IDENTITY,
        }
    }
}

/// Upright render geometry for one source, resolved once per edit session.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrientationInfo {
    /// Classified orientation of the source transform.
    pub orientation: Orientation,
    /// Natural (stored) frame size of the source.
    pub natural_size: PixelSize,
    /// Size of the upright output frame.
    pub render_size: PixelSize,
    /// `true` for quarter-turn sources.
    pub is_portrait: bool,
    /// Maps natural-frame pixel coordinates onto `[0, w) x [0, h)` of `render_size`, upright.
    pub presentation_transform: Affine,
}

impl OrientationInfo {
    /// Resolve the render geometry for a source's preferred transform and natural size.
    pub fn resolve(preferred_transform: Affine, natural_size: PixelSize) -> Self {
        let orientation = Orientation::classify(preferred_transform);
        let w = f64::from(natural_size.width);
        let h = f64::from(natural_size.height);

        let (render_size, presentation_transform) = match orientation {
            Orientation::Right => (
                natural_size.swapped(),
                Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
            ),
            Orientation::Left => (
                natural_size.swapped(),
                Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
            ),
            Orientation::Down => (natural_size, Affine::new([-1.0, 0.0, 0.0, -1.0, w, h])),
            Orientation::Up => (natural_size, preferred_transform),
            Orientation::Unsupported => {
                tracing::warn!(
                    coeffs = ?preferred_transform.as_coeffs(),
                    "unsupported preferred transform; rendering as upright"
                );
                (natural_size, Affine::IDENTITY)
            }
        };

        Self {
            orientation,
            natural_size,
            render_size,
            is_portrait: orientation.is_portrait(),
            presentation_transform,
        }
    }

    /// Inverse of the presentation transform: render-space point to natural-frame point.
    pub fn render_to_natural(&self) -> Affine {
        self.presentation_transform.inverse()
    }

    /// Map a natural-frame point into render space.
    pub fn present(&self, p: Point) -> Point {
        self.presentation_transform * p
    }
}

#[cfg(test)]
#[path = "../tests/unit/orientation.rs"]
mod tests;
