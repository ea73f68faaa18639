use std::path::Path;
use std::sync::Arc;

use crate::assets::media::MediaAsset;
use crate::compose::composition::{AudioRole, AudioTrack, Composition, Segment, VideoTrack};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::OrientationInfo;
use crate::plan::{AudioSelection, CompositionPlan};
use crate::time::{RationalTime, SpeedFactor, TimeRange};

fn ensure_readable(path: &Path) -> FramecutResult<()> {
    std::fs::File::open(path)
        .map(drop)
        .map_err(|source| FramecutError::CompositionInsertFailed {
            path: path.display().to_string(),
            source,
        })
}

/// Insert the trimmed source video at time zero with the orientation's presentation transform.
pub fn insert_primary_video(
    comp: &mut Composition,
    asset: &Arc<MediaAsset>,
    trim: TimeRange,
    orientation: &OrientationInfo,
) -> FramecutResult<()> {
    if !asset.has_video() {
        return Err(FramecutError::missing_track(format!(
            "'{}' has no video track",
            asset.path.display()
        )));
    }
    let trim = trim.clamp(asset.full_range())?;
    ensure_readable(&asset.path)?;

    comp.video = Some(VideoTrack {
        segments: vec![Segment {
            asset: Arc::clone(asset),
            source: trim,
            target: trim.at_zero(),
        }],
        transform: orientation.presentation_transform,
        natural_size: orientation.natural_size,
        render_size: orientation.render_size,
    });
    tracing::debug!(start = %trim.start, duration = %trim.duration, "inserted primary video");
    Ok(())
}

/// Insert the matching range of the source's own audio, unless muted or absent.
///
/// Returns `true` when a track was inserted.
pub fn insert_primary_audio(
    comp: &mut Composition,
    asset: &Arc<MediaAsset>,
    trim: TimeRange,
    muted: bool,
) -> FramecutResult<bool> {
    if muted || !asset.has_audio {
        tracing::debug!(muted, has_audio = asset.has_audio, "no primary audio");
        return Ok(false);
    }
    let trim = trim.clamp(asset.full_range())?;
    ensure_readable(&asset.path)?;

    comp.audio.retain(|t| t.role != AudioRole::Primary);
    comp.audio.push(AudioTrack {
        role: AudioRole::Primary,
        segments: vec![Segment {
            asset: Arc::clone(asset),
            source: trim,
            target: trim.at_zero(),
        }],
        volume: 1.0,
    });
    Ok(true)
}

/// Retime the video track and the primary audio track together.
///
/// Each segment's target duration becomes `source / factor`; segments stay back to back.
/// Replacement audio is left alone.
pub fn apply_speed(comp: &mut Composition, factor: SpeedFactor) -> FramecutResult<()> {
    let Some(video) = comp.video.as_mut() else {
        return Err(FramecutError::missing_track(
            "speed needs a video track in the composition",
        ));
    };
    retime(&mut video.segments, factor);
    for track in comp
        .audio
        .iter_mut()
        .filter(|t| t.role == AudioRole::Primary)
    {
        retime(&mut track.segments, factor);
    }
    comp.speed = Some(factor);
    tracing::debug!(speed = factor.get(), duration = %comp.duration(), "applied speed");
    Ok(())
}

fn retime(segments: &mut [Segment], factor: SpeedFactor) {
    let mut cursor = RationalTime::ZERO;
    for seg in segments {
        seg.target = TimeRange {
            start: cursor,
            duration: seg.source.at_zero().scale(factor).duration,
        };
        cursor = seg.target.end();
    }
}

/// Lay another asset's audio over `[0, target)`.
///
/// Looped audio is repeated back to back and the last copy is cut exactly at `target`. Otherwise
/// the audio is inserted once, cut at `target` if longer.
pub fn insert_replacement_audio(
    comp: &mut Composition,
    audio_asset: &Arc<MediaAsset>,
    target: RationalTime,
    looped: bool,
) -> FramecutResult<()> {
    if !audio_asset.has_audio {
        return Err(FramecutError::missing_track(format!(
            "'{}' has no audio track",
            audio_asset.path.display()
        )));
    }
    let piece_len = audio_asset.duration;
    if !piece_len.is_positive() {
        return Err(FramecutError::invalid_range(format!(
            "replacement audio '{}' has no duration",
            audio_asset.path.display()
        )));
    }
    ensure_readable(&audio_asset.path)?;

    let mut segments = Vec::new();
    let mut cursor = RationalTime::ZERO;
    while cursor < target {
        let len = piece_len.min(target - cursor);
        segments.push(Segment {
            asset: Arc::clone(audio_asset),
            source: TimeRange::from_zero(len)?,
            target: TimeRange::new(cursor, len)?,
        });
        cursor += len;
        if !looped {
            break;
        }
    }

    tracing::debug!(copies = segments.len(), looped, target = %target, "inserted replacement audio");
    comp.audio.retain(|t| t.role != AudioRole::Replacement);
    if !segments.is_empty() {
        comp.audio.push(AudioTrack {
            role: AudioRole::Replacement,
            segments,
            volume: 1.0,
        });
    }
    Ok(())
}

/// Build the full composition for a plan: video, primary audio, speed, then replacement audio.
#[tracing::instrument(level = "debug", skip_all, fields(path = %plan.asset.path.display()))]
pub fn compose_plan(plan: &CompositionPlan) -> FramecutResult<Composition> {
    let mut comp = Composition::new();
    insert_primary_video(&mut comp, &plan.asset, plan.trim, &plan.orientation)?;
    if let AudioSelection::Original { muted } = plan.audio {
        insert_primary_audio(&mut comp, &plan.asset, plan.trim, muted)?;
    }
    apply_speed(&mut comp, plan.speed)?;
    if let AudioSelection::Replacement { asset, looped } = &plan.audio {
        let target = comp.duration();
        insert_replacement_audio(&mut comp, asset, target, *looped)?;
    }
    Ok(comp)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/composer.rs"]
mod tests;
