use std::sync::Arc;

use crate::assets::media::MediaAsset;
use crate::foundation::core::{Affine, PixelSize};
use crate::time::{RationalTime, SpeedFactor, TimeRange};

/// A span of one source mapped onto the output timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Source asset.
    pub asset: Arc<MediaAsset>,
    /// Range read from the source.
    pub source: TimeRange,
    /// Range occupied on the output timeline.
    pub target: TimeRange,
}

impl Segment {
    /// Source seconds consumed per output second.
    pub fn playback_rate(&self) -> f64 {
        if self.target.duration.is_zero() {
            return 1.0;
        }
        self.source.duration.as_secs_f64() / self.target.duration.as_secs_f64()
    }
}

/// The primary video track.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoTrack {
    /// Segments in timeline order.
    pub segments: Vec<Segment>,
    /// Presentation transform taking natural frames upright.
    pub transform: Affine,
    /// Natural frame size of the source.
    pub natural_size: PixelSize,
    /// Upright output size.
    pub render_size: PixelSize,
}

/// What an audio track is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AudioRole {
    /// The source's own audio; retimed with the video.
    Primary,
    /// Chosen replacement audio; never retimed.
    Replacement,
}

/// One audio track.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    /// Track role.
    pub role: AudioRole,
    /// Segments in timeline order.
    pub segments: Vec<Segment>,
    /// Linear gain.
    pub volume: f32,
}

/// Timed track graph for one output: at most one video track plus audio tracks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composition {
    pub(crate) video: Option<VideoTrack>,
    pub(crate) audio: Vec<AudioTrack>,
    pub(crate) speed: Option<SpeedFactor>,
}

impl Composition {
    /// Empty composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary video track, once inserted.
    pub fn video(&self) -> Option<&VideoTrack> {
        self.video.as_ref()
    }

    /// All audio tracks in insertion order.
    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio
    }

    /// Track with the given role, if present.
    pub fn audio_track(&self, role: AudioRole) -> Option<&AudioTrack> {
        self.audio.iter().find(|t| t.role == role)
    }

    /// Speed applied so far, if any.
    pub fn speed(&self) -> Option<SpeedFactor> {
        self.speed
    }

    /// Output duration: end of the last video segment, or zero without video.
    pub fn duration(&self) -> RationalTime {
        self.video
            .as_ref()
            .and_then(|v| v.segments.iter().map(|s| s.target.end()).max())
            .unwrap_or(RationalTime::ZERO)
    }
}
