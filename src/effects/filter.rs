use std::collections::BTreeMap;

use crate::effects::ops;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::render::frame::FrameRGBA;

/// One filter parameter value as written in edit files.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FilterParam {
    /// Scalar parameter such as `intensity` or `radius`.
    Number(f64),
    /// Vector parameter such as tone-curve `points` (`[x0, y0, x1, y1, ...]`).
    Vector(Vec<f64>),
}

/// A named filter with optional overrides for its default parameters.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterSpec {
    /// Registry name, for example `"Mono"` or `"1977"`.
    pub name: String,
    /// Overrides keyed by parameter name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, FilterParam>,
}

impl FilterSpec {
    /// Spec using the registry defaults for `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a scalar override.
    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), FilterParam::Number(value));
        self
    }

    /// Resolve into a concrete filter.
    pub fn resolve(&self) -> FramecutResult<FilterKind> {
        FilterKind::from_spec(self)
    }
}

/// Registry names in display order.
pub const FILTER_NAMES: [&str; 23] = [
    "Original",
    "Vivid",
    "Dramatic",
    "Mono",
    "Nashville",
    "Toaster",
    "1977",
    "Noir",
    "Comic",
    "Crystallize",
    "Bloom",
    "Pixellate",
    "Blur",
    "Sepia",
    "Fade",
    "Sharpen",
    "HDR",
    "Vignette",
    "Tonal",
    "Dot Matrix",
    "Edge Work",
    "X-Ray",
    "Posterize",
];

/// Every filter the engine knows, with its resolved parameters.
///
/// Variant field names double as the override keys accepted in [`FilterSpec::parameters`].
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum FilterKind {
    /// Pass-through.
    Original,
    /// Boosted saturation and contrast.
    Vivid { saturation: f32, contrast: f32 },
    /// Hard contrast with a small lift.
    Dramatic {
        saturation: f32,
        contrast: f32,
        brightness: f32,
    },
    /// Neutral black and white.
    Mono,
    /// Warm, slightly saturated.
    Nashville {
        saturation: f32,
        contrast: f32,
        brightness: f32,
    },
    /// Strong sepia.
    Toaster { intensity: f32 },
    /// Bright and saturated.
    Seventy7 {
        saturation: f32,
        contrast: f32,
        brightness: f32,
    },
    /// High-contrast black and white.
    Noir,
    /// Posterized color with ink outlines.
    Comic,
    /// Voronoi cells.
    Crystallize { radius: f32 },
    /// Soft glow.
    Bloom { radius: f32, intensity: f32 },
    /// Square mosaic.
    Pixellate { scale: f32 },
    /// Gaussian blur.
    Blur { radius: f32 },
    /// Sepia tone.
    Sepia { intensity: f32 },
    /// Lifted blacks, muted color.
    Fade,
    /// Luma unsharp mask.
    Sharpen { sharpness: f32 },
    /// S-shaped tone curve.
    Hdr { points: Vec<[f32; 2]> },
    /// Corner darkening.
    Vignette { intensity: f32, radius: f32 },
    /// Flat black and white.
    Tonal,
    /// Halftone dot screen.
    DotMatrix { width: f32, sharpness: f32 },
    /// Sobel edges.
    EdgeWork { intensity: f32 },
    /// Inverted colors.
    XRay,
    /// Reduced color levels.
    Posterize { levels: f32 },
}

impl FilterKind {
    /// Defaults for a registry name, or `None` if unknown.
    pub fn by_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Original" => Self::Original,
            "Vivid" => Self::Vivid {
                saturation: 1.3,
                contrast: 0.3,
            },
            "Dramatic" => Self::Dramatic {
                saturation: 1.0,
                contrast: 0.5,
                brightness: 0.1,
            },
            "Mono" => Self::Mono,
            "Nashville" => Self::Nashville {
                saturation: 1.2,
                contrast: 0.2,
                brightness: 0.04,
            },
            "Toaster" => Self::Toaster { intensity: 0.7 },
            "1977" => Self::Seventy7 {
                saturation: 1.3,
                contrast: 0.2,
                brightness: 0.1,
            },
            "Noir" => Self::Noir,
            "Comic" => Self::Comic,
            "Crystallize" => Self::Crystallize { radius: 20.0 },
            "Bloom" => Self::Bloom {
                radius: 10.0,
                intensity: 1.0,
            },
            "Pixellate" => Self::Pixellate { scale: 10.0 },
            "Blur" => Self::Blur { radius: 5.0 },
            "Sepia" => Self::Sepia { intensity: 0.8 },
            "Fade" => Self::Fade,
            "Sharpen" => Self::Sharpen { sharpness: 0.5 },
            "HDR" => Self::Hdr {
                points: vec![
                    [0.0, 0.0],
                    [0.25, 0.2],
                    [0.5, 0.5],
                    [0.75, 0.8],
                    [1.0, 1.0],
                ],
            },
            "Vignette" => Self::Vignette {
                intensity: 0.7,
                radius: 1.0,
            },
            "Tonal" => Self::Tonal,
            "Dot Matrix" => Self::DotMatrix {
                width: 6.0,
                sharpness: 0.7,
            },
            "Edge Work" => Self::EdgeWork { intensity: 1.0 },
            "X-Ray" => Self::XRay,
            "Posterize" => Self::Posterize { levels: 6.0 },
            _ => return None,
        };
        Some(kind)
    }

    /// Look up `spec.name` and apply its parameter overrides.
    pub fn from_spec(spec: &FilterSpec) -> FramecutResult<Self> {
        let mut kind = Self::by_name(&spec.name)
            .ok_or_else(|| FramecutError::UnknownFilter(spec.name.clone()))?;
        for (key, value) in &spec.parameters {
            kind.set_param(&spec.name, key, value)?;
        }
        Ok(kind)
    }

    /// Registry name of this filter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::Vivid { .. } => "Vivid",
            Self::Dramatic { .. } => "Dramatic",
            Self::Mono => "Mono",
            Self::Nashville { .. } => "Nashville",
            Self::Toaster { .. } => "Toaster",
            Self::Seventy7 { .. } => "1977",
            Self::Noir => "Noir",
            Self::Comic => "Comic",
            Self::Crystallize { .. } => "Crystallize",
            Self::Bloom { .. } => "Bloom",
            Self::Pixellate { .. } => "Pixellate",
            Self::Blur { .. } => "Blur",
            Self::Sepia { .. } => "Sepia",
            Self::Fade => "Fade",
            Self::Sharpen { .. } => "Sharpen",
            Self::Hdr { .. } => "HDR",
            Self::Vignette { .. } => "Vignette",
            Self::Tonal => "Tonal",
            Self::DotMatrix { .. } => "Dot Matrix",
            Self::EdgeWork { .. } => "Edge Work",
            Self::XRay => "X-Ray",
            Self::Posterize { .. } => "Posterize",
        }
    }

    /// Return `true` for the pass-through filter.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Original)
    }

    fn set_param(&mut self, filter: &str, key: &str, value: &FilterParam) -> FramecutResult<()> {
        let slot: &mut f32 = match (self, key) {
            (Self::Hdr { points }, "points") => {
                *points = parse_points(filter, value)?;
                return Ok(());
            }
            (
                Self::Vivid { saturation, .. }
                | Self::Dramatic { saturation, .. }
                | Self::Nashville { saturation, .. }
                | Self::Seventy7 { saturation, .. },
                "saturation",
            ) => saturation,
            (
                Self::Vivid { contrast, .. }
                | Self::Dramatic { contrast, .. }
                | Self::Nashville { contrast, .. }
                | Self::Seventy7 { contrast, .. },
                "contrast",
            ) => contrast,
            (
                Self::Dramatic { brightness, .. }
                | Self::Nashville { brightness, .. }
                | Self::Seventy7 { brightness, .. },
                "brightness",
            ) => brightness,
            (
                Self::Toaster { intensity }
                | Self::Sepia { intensity }
                | Self::Bloom { intensity, .. }
                | Self::Vignette { intensity, .. }
                | Self::EdgeWork { intensity },
                "intensity",
            ) => intensity,
            (
                Self::Crystallize { radius }
                | Self::Bloom { radius, .. }
                | Self::Blur { radius }
                | Self::Vignette { radius, .. },
                "radius",
            ) => radius,
            (Self::Pixellate { scale }, "scale") => scale,
            (Self::Sharpen { sharpness } | Self::DotMatrix { sharpness, .. }, "sharpness") => {
                sharpness
            }
            (Self::DotMatrix { width, .. }, "width") => width,
            (Self::Posterize { levels }, "levels") => levels,
            _ => {
                return Err(FramecutError::validation(format!(
                    "filter '{filter}' has no parameter '{key}'"
                )));
            }
        };
        *slot = parse_number(filter, key, value)?;
        Ok(())
    }

    /// Apply in place to an opaque frame.
    pub fn apply(&self, frame: &mut FrameRGBA) -> FramecutResult<()> {
        match self {
            Self::Original => {}
            Self::Vivid {
                saturation,
                contrast,
            } => ops::color_controls(frame, *saturation, 0.0, *contrast),
            Self::Dramatic {
                saturation,
                contrast,
                brightness,
            }
            | Self::Nashville {
                saturation,
                contrast,
                brightness,
            }
            | Self::Seventy7 {
                saturation,
                contrast,
                brightness,
            } => ops::color_controls(frame, *saturation, *brightness, *contrast),
            Self::Mono => ops::monochrome(frame, 1.0, 0.0),
            Self::Noir => ops::monochrome(frame, 1.4, 0.0),
            Self::Tonal => ops::monochrome(frame, 0.85, 0.05),
            Self::Toaster { intensity } | Self::Sepia { intensity } => {
                ops::sepia(frame, *intensity);
            }
            Self::Comic => ops::comic(frame),
            Self::Crystallize { radius } => ops::crystallize(frame, *radius),
            Self::Bloom { radius, intensity } => ops::bloom(frame, *radius, *intensity)?,
            Self::Pixellate { scale } => ops::pixellate(frame, *scale),
            Self::Blur { radius } => ops::gaussian_blur(frame, *radius)?,
            Self::Fade => ops::fade(frame),
            Self::Sharpen { sharpness } => ops::sharpen_luminance(frame, *sharpness)?,
            Self::Hdr { points } => ops::tone_curve(frame, points),
            Self::Vignette { intensity, radius } => ops::vignette(frame, *intensity, *radius),
            Self::DotMatrix { width, sharpness } => ops::dot_screen(frame, *width, *sharpness),
            Self::EdgeWork { intensity } => ops::edges(frame, *intensity),
            Self::XRay => ops::invert(frame),
            Self::Posterize { levels } => ops::posterize(frame, *levels),
        }
        Ok(())
    }
}

fn parse_number(filter: &str, key: &str, value: &FilterParam) -> FramecutResult<f32> {
    match value {
        FilterParam::Number(v) if v.is_finite() => Ok(*v as f32),
        _ => Err(FramecutError::validation(format!(
            "filter '{filter}' parameter '{key}' must be a finite number"
        ))),
    }
}

fn parse_points(filter: &str, value: &FilterParam) -> FramecutResult<Vec<[f32; 2]>> {
    let FilterParam::Vector(v) = value else {
        return Err(FramecutError::validation(format!(
            "filter '{filter}' parameter 'points' must be a list of x,y pairs"
        )));
    };
    if v.len() < 4 || v.len() % 2 != 0 || v.iter().any(|x| !x.is_finite()) {
        return Err(FramecutError::validation(format!(
            "filter '{filter}' parameter 'points' needs at least two finite x,y pairs"
        )));
    }
    let points: Vec<[f32; 2]> = v.chunks_exact(2).map(|p| [p[0] as f32, p[1] as f32]).collect();
    if points.windows(2).any(|w| w[1][0] < w[0][0]) {
        return Err(FramecutError::validation(format!(
            "filter '{filter}' curve points must be sorted by x"
        )));
    }
    Ok(points)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/filter.rs"]
mod tests;
