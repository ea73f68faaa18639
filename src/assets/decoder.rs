use std::path::{Path, PathBuf};

use crate::assets::media::AudioPcm;
use crate::foundation::core::{Fps, PixelSize};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::time::{SpeedFactor, TimeRange};

/// What the render loop needs from one video segment.
#[derive(Clone, Debug)]
pub struct VideoDecodeRequest {
    /// Source file.
    pub path: PathBuf,
    /// Stored frame size; frames are delivered unrotated at this size.
    pub natural_size: PixelSize,
    /// Source interval to read.
    pub source: TimeRange,
    /// Retiming applied to the source interval.
    pub speed: SpeedFactor,
    /// Output frame rate.
    pub fps: Fps,
    /// Number of output frames wanted.
    pub frame_count: u64,
}

/// Sequential producer of straight-alpha RGBA8 frames at the request's natural size.
pub trait VideoFrameSource: Send {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> FramecutResult<Option<Vec<u8>>>;
}

/// Decoding backend. The export worker only talks to media through this trait.
pub trait MediaDecoder: Send + Sync {
    /// Start decoding one retimed video segment.
    fn open_video(&self, req: &VideoDecodeRequest) -> FramecutResult<Box<dyn VideoFrameSource>>;

    /// Decode `[start, start + duration)` seconds of audio (or the whole file) to stereo PCM.
    fn decode_audio(
        &self,
        path: &Path,
        window: Option<(f64, f64)>,
        sample_rate: u32,
    ) -> FramecutResult<AudioPcm>;
}

/// [`MediaDecoder`] backed by the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegDecoder;

impl MediaDecoder for FfmpegDecoder {
    fn open_video(&self, req: &VideoDecodeRequest) -> FramecutResult<Box<dyn VideoFrameSource>> {
        Ok(Box::new(FfmpegFrameReader::spawn(req)?))
    }

    fn decode_audio(
        &self,
        path: &Path,
        window: Option<(f64, f64)>,
        sample_rate: u32,
    ) -> FramecutResult<AudioPcm> {
        crate::assets::media::decode_audio_f32_stereo(path, window, sample_rate)
    }
}

/// Streams raw frames from an `ffmpeg` child process.
///
/// Rotation metadata is ignored (`-noautorotate`); orientation is applied by the render pipeline
/// from the session's resolved orientation.
pub struct FfmpegFrameReader {
    child: Option<std::process::Child>,
    stdout: Option<std::process::ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    path: PathBuf,
}

impl FfmpegFrameReader {
    /// Spawn `ffmpeg` for `req`.
    #[cfg(feature = "media-ffmpeg")]
    pub fn spawn(req: &VideoDecodeRequest) -> FramecutResult<Self> {
        use std::io::Read as _;
        use std::process::{Command, Stdio};

        if req.natural_size.is_empty() {
            return Err(FramecutError::missing_track(format!(
                "'{}' has no video stream",
                req.path.display()
            )));
        }
        let (num, den) = req.speed.ratio();
        // setpts divides timestamps by the speed factor; fps resamples to the output rate.
        let filter = format!(
            "setpts=(PTS-STARTPTS)*{den}/{num},fps={}/{}",
            req.fps.num, req.fps.den
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-noautorotate"])
            .args(["-ss", &format!("{:.6}", req.source.start.as_secs_f64())])
            .args(["-t", &format!("{:.6}", req.source.duration.as_secs_f64())])
            .arg("-i")
            .arg(&req.path)
            .args([
                "-an",
                "-vf",
                &filter,
                "-frames:v",
                &req.frame_count.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FramecutError::media(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FramecutError::media("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FramecutError::media("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(
            path = %req.path.display(),
            start = %req.source.start,
            duration = %req.source.duration,
            speed = %req.speed,
            frames = req.frame_count,
            "spawned ffmpeg video reader"
        );

        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frame_len: req.natural_size.rgba_len(),
            path: req.path.clone(),
        })
    }

    /// Spawn `ffmpeg` for `req`.
    ///
    /// Returns an error when `media-ffmpeg` feature is disabled.
    #[cfg(not(feature = "media-ffmpeg"))]
    pub fn spawn(_req: &VideoDecodeRequest) -> FramecutResult<Self> {
        Err(FramecutError::media(
            "video/audio assets require the 'media-ffmpeg' feature",
        ))
    }

    fn finish(&mut self) -> FramecutResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| FramecutError::media(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = match self.stderr_drain.take() {
            Some(h) => h
                .join()
                .map_err(|_| FramecutError::media("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if !status.success() {
            return Err(FramecutError::media(format!(
                "ffmpeg video decode failed for '{}' ({status}): {}",
                self.path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl VideoFrameSource for FfmpegFrameReader {
    fn next_frame(&mut self) -> FramecutResult<Option<Vec<u8>>> {
        use std::io::Read as _;

        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = stdout
                .read(&mut buf[filled..])
                .map_err(|e| FramecutError::media(format!("failed to read ffmpeg output: {e}")))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == buf.len() {
            return Ok(Some(buf));
        }
        // Short read: the stream ended. A partial trailing frame is discarded.
        self.finish()?;
        Ok(None)
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(h) = self.stderr_drain.take() {
            let _ = h.join();
        }
    }
}
