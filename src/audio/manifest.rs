use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decoder::MediaDecoder;
use crate::assets::media::AudioPcm;
use crate::compose::composition::Composition;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::time::RationalTime;

#[derive(Clone, Debug)]
/// One scheduled audio contribution in timeline sample space.
pub(crate) struct AudioSegment {
    pub(crate) timeline_start_sample: u64,
    pub(crate) timeline_end_sample: u64,
    /// Offset into `source_interleaved_f32`, in seconds.
    pub(crate) source_start_sec: f64,
    pub(crate) playback_rate: f64,
    pub(crate) volume: f32,
    pub(crate) source_sample_rate: u32,
    pub(crate) source_channels: u16,
    pub(crate) source_interleaved_f32: Arc<Vec<f32>>,
}

#[derive(Clone, Debug)]
/// Audio rendering plan for the whole output.
pub(crate) struct AudioManifest {
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) total_samples: u64,
    pub(crate) segments: Vec<AudioSegment>,
}

type PcmKey = (PathBuf, u64, u64);

const MIX_CHANNELS: u16 = 2;

pub(crate) fn time_to_sample(t: RationalTime, sample_rate: u32) -> u64 {
    let num = i128::from(t.value()) * i128::from(sample_rate);
    let den = i128::from(t.timescale());
    crate::foundation::math::div_round_i128(num, den).max(0) as u64
}

/// Build the mix manifest for every audio track in `comp`.
///
/// Each distinct source window is decoded once; looped copies share the same PCM. Returns `None`
/// when the composition carries no audio.
pub(crate) fn build_audio_manifest(
    comp: &Composition,
    decoder: &dyn MediaDecoder,
    total_samples: u64,
    sample_rate: u32,
) -> FramecutResult<Option<AudioManifest>> {
    if comp.audio_tracks().iter().all(|t| t.segments.is_empty()) {
        return Ok(None);
    }
    if sample_rate == 0 {
        return Err(FramecutError::validation("audio sample rate must be > 0"));
    }

    let mut cache: HashMap<PcmKey, Arc<Vec<f32>>> = HashMap::new();
    let mut segments = Vec::new();

    for track in comp.audio_tracks() {
        for seg in &track.segments {
            let start = time_to_sample(seg.target.start, sample_rate).min(total_samples);
            let end = time_to_sample(seg.target.end(), sample_rate).min(total_samples);
            if end <= start {
                continue;
            }

            let src_start = seg.source.start.as_secs_f64();
            let src_dur = seg.source.duration.as_secs_f64();
            let key = (
                seg.asset.path.clone(),
                src_start.to_bits(),
                src_dur.to_bits(),
            );
            let pcm = match cache.get(&key) {
                Some(p) => Arc::clone(p),
                None => {
                    let decoded = decoder.decode_audio(
                        &seg.asset.path,
                        Some((src_start, src_dur)),
                        sample_rate,
                    )?;
                    let data = Arc::new(stereo_pcm(decoded, sample_rate, &seg.asset.path)?);
                    cache.insert(key, Arc::clone(&data));
                    data
                }
            };

            segments.push(AudioSegment {
                timeline_start_sample: start,
                timeline_end_sample: end,
                source_start_sec: 0.0,
                playback_rate: seg.playback_rate(),
                volume: track.volume,
                source_sample_rate: sample_rate,
                source_channels: MIX_CHANNELS,
                source_interleaved_f32: pcm,
            });
        }
    }

    tracing::debug!(
        segments = segments.len(),
        decoded_windows = cache.len(),
        total_samples,
        "audio manifest built"
    );
    Ok(Some(AudioManifest {
        sample_rate,
        channels: MIX_CHANNELS,
        total_samples,
        segments,
    }))
}

/// Check a decoder's output against the mix format, duplicating mono into both channels.
fn stereo_pcm(decoded: AudioPcm, sample_rate: u32, path: &Path) -> FramecutResult<Vec<f32>> {
    if decoded.sample_rate != sample_rate {
        return Err(FramecutError::media(format!(
            "decoded audio for '{}' is {} Hz, expected {sample_rate} Hz",
            path.display(),
            decoded.sample_rate
        )));
    }
    match decoded.channels {
        1 => Ok(decoded
            .interleaved_f32
            .iter()
            .flat_map(|&s| [s, s])
            .collect()),
        MIX_CHANNELS => Ok(decoded.interleaved_f32),
        n => Err(FramecutError::media(format!(
            "decoded audio for '{}' has {n} channels, expected mono or stereo",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/manifest.rs"]
mod tests;
