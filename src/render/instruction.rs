use std::sync::Arc;

use crate::effects::composite::over_in_place;
use crate::effects::filter::FilterKind;
use crate::foundation::core::PixelSize;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::OrientationInfo;
use crate::overlay::mapper::MappedOverlay;
use crate::render::frame::FrameRGBA;
use crate::render::orient::orient_frame;
use crate::time::TimeRange;

/// Per-frame compositing instruction covering one span of the output timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderInstruction {
    /// Output timeline span this instruction applies to.
    pub time_range: TimeRange,
    /// Upright output frame size.
    pub render_size: PixelSize,
    /// How the natural frame is turned upright.
    pub orientation: OrientationInfo,
    /// Filter applied to the oriented frame, if any.
    pub filter: Option<FilterKind>,
    /// Where each overlay lands, in draw order.
    pub overlays: Vec<MappedOverlay>,
}

/// Single-pass frame processor: orient, filter, then composite the static overlay layer.
///
/// Cheap to share across rayon workers; it holds no per-frame state.
#[derive(Clone, Debug)]
pub struct FrameProcessor {
    instruction: Arc<RenderInstruction>,
    overlay_layer: Option<Arc<FrameRGBA>>,
}

impl FrameProcessor {
    /// Pair an instruction with its pre-flattened overlay layer.
    pub fn new(
        instruction: RenderInstruction,
        overlay_layer: Option<FrameRGBA>,
    ) -> FramecutResult<Self> {
        if let Some(layer) = &overlay_layer
            && (layer.size() != instruction.render_size || !layer.premultiplied)
        {
            return Err(FramecutError::validation(
                "overlay layer must be premultiplied and match the render size",
            ));
        }
        if instruction.render_size != instruction.orientation.render_size {
            return Err(FramecutError::validation(
                "render size disagrees with the resolved orientation",
            ));
        }
        Ok(Self {
            instruction: Arc::new(instruction),
            overlay_layer: overlay_layer.map(Arc::new),
        })
    }

    /// The instruction this processor executes.
    pub fn instruction(&self) -> &RenderInstruction {
        &self.instruction
    }

    /// Process one decoded natural-size frame into an upright, filtered, overlaid frame.
    pub fn process(&self, natural: FrameRGBA) -> FramecutResult<FrameRGBA> {
        let mut frame = orient_frame(natural, &self.instruction.orientation)?;
        // decoded video is opaque; orientation may leave uncovered pixels transparent
        for px in frame.data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        frame.premultiplied = false;

        if let Some(filter) = &self.instruction.filter
            && !filter.is_identity()
        {
            filter.apply(&mut frame)?;
        }

        if let Some(layer) = &self.overlay_layer {
            over_in_place(&mut frame.data, &layer.data, frame.width, 1.0)?;
        }
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/instruction.rs"]
mod tests;
