//! Immutable edit snapshots handed from an edit session to composition and export.

use std::sync::Arc;

use crate::assets::media::MediaAsset;
use crate::effects::filter::{FilterKind, FilterSpec};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::OrientationInfo;
use crate::overlay::element::OverlayElement;
use crate::time::{DEFAULT_TIMESCALE, SpeedFactor, TimeRange};

/// Which audio ends up in the output. Exactly one is active per plan.
#[derive(Clone, Debug)]
pub enum AudioSelection {
    /// Keep the source's own audio, or drop it when `muted`.
    Original {
        /// Drop the source audio entirely.
        muted: bool,
    },
    /// Replace the source audio with another asset's audio.
    Replacement {
        /// Asset supplying the audio track.
        asset: Arc<MediaAsset>,
        /// Repeat the replacement until the output is covered.
        looped: bool,
    },
}

impl Default for AudioSelection {
    fn default() -> Self {
        Self::Original { muted: false }
    }
}

/// The user's edit choices, before validation against the source.
#[derive(Clone, Debug, Default)]
pub struct EditIntent {
    /// Requested trim in source time; `None` keeps the whole asset.
    pub trim: Option<TimeRange>,
    /// Playback rate.
    pub speed: SpeedFactor,
    /// Filter to apply, if any.
    pub filter: Option<FilterSpec>,
    /// Overlays in draw order.
    pub overlays: Vec<OverlayElement>,
    /// Audio choice.
    pub audio: AudioSelection,
}

/// Validated, immutable snapshot of everything one export needs.
#[derive(Clone, Debug)]
pub struct CompositionPlan {
    /// Source asset.
    pub asset: Arc<MediaAsset>,
    /// Trim in source time, snapped to the asset timescale.
    pub trim: TimeRange,
    /// Playback rate.
    pub speed: SpeedFactor,
    /// Filter spec, already known to resolve.
    pub filter: Option<FilterSpec>,
    /// Overlays in draw order.
    pub overlays: Vec<OverlayElement>,
    /// Audio choice.
    pub audio: AudioSelection,
    /// Orientation resolved from the original source.
    pub orientation: OrientationInfo,
}

impl CompositionPlan {
    /// Output duration after retiming.
    pub fn output_range(&self) -> TimeRange {
        self.trim.at_zero().scale(self.speed)
    }

    /// Resolved filter, or `None` when no filter is set.
    pub fn resolved_filter(&self) -> FramecutResult<Option<FilterKind>> {
        self.filter.as_ref().map(FilterKind::from_spec).transpose()
    }

    /// Return `true` when the trim covers less than the whole asset.
    pub fn is_trimmed(&self) -> bool {
        self.trim != self.asset.full_range()
    }
}

/// Validate `intent` against `asset` and freeze it into a plan.
///
/// Fails fast with the same errors export would raise: bad trims are `InvalidRange`, a source
/// without video is `MissingTrack`, unknown filters are `UnknownFilter`.
pub fn build_plan(
    asset: Arc<MediaAsset>,
    orientation: OrientationInfo,
    intent: &EditIntent,
) -> FramecutResult<CompositionPlan> {
    if !asset.has_video() {
        return Err(FramecutError::missing_track(format!(
            "'{}' has no video track",
            asset.path.display()
        )));
    }
    let full = asset.full_range();
    let trim = match intent.trim {
        Some(t) => t
            .clamp(full)?
            .snap_to_timescale(DEFAULT_TIMESCALE, full.end())?,
        None => full,
    };
    if trim.is_empty() {
        return Err(FramecutError::invalid_range("trim rounds to an empty range"));
    }

    if let Some(spec) = &intent.filter {
        FilterKind::from_spec(spec)?;
    }
    for overlay in &intent.overlays {
        overlay.validate()?;
    }
    if let AudioSelection::Replacement { asset: audio, .. } = &intent.audio {
        if !audio.has_audio {
            return Err(FramecutError::missing_track(format!(
                "'{}' has no audio track",
                audio.path.display()
            )));
        }
        if !audio.duration.is_positive() {
            return Err(FramecutError::invalid_range(format!(
                "replacement audio '{}' is empty",
                audio.path.display()
            )));
        }
    }

    tracing::debug!(
        path = %asset.path.display(),
        trim_start = %trim.start,
        trim_duration = %trim.duration,
        speed = intent.speed.get(),
        filter = intent.filter.as_ref().map(|f| f.name.as_str()),
        overlays = intent.overlays.len(),
        "composition plan built"
    );

    Ok(CompositionPlan {
        asset,
        trim,
        speed: intent.speed,
        filter: intent.filter.clone(),
        overlays: intent.overlays.clone(),
        audio: intent.audio.clone(),
        orientation,
    })
}

#[cfg(test)]
#[path = "../tests/unit/plan.rs"]
mod tests;
