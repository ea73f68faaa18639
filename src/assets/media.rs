use std::path::{Path, PathBuf};

use crate::foundation::core::{Affine, Fps, PixelSize};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::Orientation;
use crate::time::{DEFAULT_TIMESCALE, RationalTime, TimeRange};

/// Internal audio mixing sample rate used across decode/mix/encode pipeline.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Immutable description of a decodable source file.
///
/// Opened once and shared read-only (`Arc`) between preview and export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaAsset {
    /// Source file.
    pub path: PathBuf,
    /// Container duration.
    pub duration: RationalTime,
    /// Stored frame size of the first video stream; zero when there is no video.
    pub video_natural_size: PixelSize,
    /// Display transform stored with the video stream.
    pub preferred_transform: Affine,
    /// Whether at least one audio stream exists.
    pub has_audio: bool,
    /// Average frame rate of the video stream, when known.
    pub nominal_fps: Option<Fps>,
}

impl MediaAsset {
    /// `[0, duration)`.
    pub fn full_range(&self) -> TimeRange {
        TimeRange {
            start: RationalTime::ZERO,
            duration: self.duration,
        }
    }

    /// Return `true` when the asset has a decodable video stream.
    pub fn has_video(&self) -> bool {
        !self.video_natural_size.is_empty()
    }
}

#[derive(Clone, Debug)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

/// Probe a source file and build its [`MediaAsset`].
#[cfg(feature = "media-ffmpeg")]
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn open_asset(path: &Path) -> FramecutResult<MediaAsset> {
    #[derive(serde::Deserialize)]
    struct ProbeSideData {
        rotation: Option<f64>,
    }
    #[derive(serde::Deserialize, Default)]
    struct ProbeTags {
        rotate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        avg_frame_rate: Option<String>,
        duration: Option<String>,
        #[serde(default)]
        tags: ProbeTags,
        #[serde(default)]
        side_data_list: Vec<ProbeSideData>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    std::fs::metadata(path).map_err(|e| {
        FramecutError::media(format!("cannot open '{}': {e}", path.display()))
    })?;

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| FramecutError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(FramecutError::media(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| FramecutError::media(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    if video.is_none() && !has_audio {
        return Err(FramecutError::missing_track(format!(
            "'{}' has neither video nor audio streams",
            path.display()
        )));
    }

    // Display matrix side data reports counter-clockwise degrees; the legacy `rotate` tag
    // reports clockwise degrees.
    let display_rotation_cw = |s: &ProbeStream| -> i32 {
        if let Some(r) = s.side_data_list.iter().find_map(|d| d.rotation) {
            return (-r).round() as i32;
        }
        s.tags
            .rotate
            .as_deref()
            .and_then(|r| r.trim().parse::<i32>().ok())
            .unwrap_or(0)
    };

    let natural = video
        .map(|v| PixelSize::new(v.width.unwrap_or(0), v.height.unwrap_or(0)))
        .unwrap_or(PixelSize::new(0, 0));
    let rotation = video.map(display_rotation_cw).unwrap_or(0);
    let nominal_fps = video
        .and_then(|v| v.avg_frame_rate.as_deref())
        .and_then(parse_ffprobe_rate);

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|v| v.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| {
            FramecutError::media(format!("ffprobe reported no duration for '{}'", path.display()))
        })?;

    let asset = MediaAsset {
        path: path.to_path_buf(),
        duration: RationalTime::from_secs_f64(duration_secs, DEFAULT_TIMESCALE)?,
        video_natural_size: natural,
        preferred_transform: Orientation::preferred_transform_for_rotation(rotation, natural),
        has_audio,
        nominal_fps,
    };
    tracing::debug!(
        width = natural.width,
        height = natural.height,
        rotation,
        has_audio,
        duration = %asset.duration,
        "probed media asset"
    );
    Ok(asset)
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe a source file and build its [`MediaAsset`].
///
/// Returns an error when `media-ffmpeg` feature is disabled.
pub fn open_asset(_path: &Path) -> FramecutResult<MediaAsset> {
    Err(FramecutError::media(
        "video/audio assets require the 'media-ffmpeg' feature",
    ))
}

/// Parse an ffprobe rate such as `30000/1001`.
pub(crate) fn parse_ffprobe_rate(s: &str) -> Option<Fps> {
    let (n, d) = s.split_once('/').unwrap_or((s, "1"));
    let n = n.trim().parse::<u32>().ok()?;
    let d = d.trim().parse::<u32>().ok()?;
    Fps::new(n, d).ok()
}

#[cfg(feature = "media-ffmpeg")]
/// Decode audio from a media source to stereo interleaved `f32` PCM.
///
/// `window` limits decoding to `[start, start + duration)` of the source, in seconds.
pub fn decode_audio_f32_stereo(
    path: &Path,
    window: Option<(f64, f64)>,
    sample_rate: u32,
) -> FramecutResult<AudioPcm> {
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-v", "error"]);
    if let Some((start, dur)) = window {
        cmd.args(["-ss", &format!("{start:.6}"), "-t", &format!("{dur:.6}")]);
    }
    let out = cmd
        .arg("-i")
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| FramecutError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error. Treat it as empty PCM.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(FramecutError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(FramecutError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let pcm = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Decode audio from a media source to stereo interleaved `f32` PCM.
///
/// Returns an error when `media-ffmpeg` feature is disabled.
pub fn decode_audio_f32_stereo(
    _path: &Path,
    _window: Option<(f64, f64)>,
    _sample_rate: u32,
) -> FramecutResult<AudioPcm> {
    Err(FramecutError::media(
        "video/audio assets require the 'media-ffmpeg' feature",
    ))
}
