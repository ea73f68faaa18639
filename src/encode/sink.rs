use std::path::PathBuf;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::render::frame::FrameRGBA;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional external raw PCM audio file input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that encode audio.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Where and how a sink writes its output.
#[derive(Clone, Debug)]
pub struct SinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl SinkOpts {
    /// Options for writing to `out_path` without overwriting, flattening onto black.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: false,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Consumer of rendered frames in timeline order.
///
/// `push_frame` is called with strictly increasing [`FrameIndex`] values. After a failure or a
/// cancellation the export worker calls [`FrameSink::abort`] instead of [`FrameSink::end`].
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> FramecutResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FramecutResult<()>;
    /// Finalize the output after the last frame.
    fn end(&mut self) -> FramecutResult<()>;
    /// Tear down without finalizing. Must be safe to call at any point.
    fn abort(&mut self) {}
}

/// Creates the sink for one export.
pub trait SinkFactory: Send + Sync {
    /// Build a sink writing to `opts.out_path`.
    fn create(&self, opts: &SinkOpts) -> FramecutResult<Box<dyn FrameSink>>;
}

impl<F> SinkFactory for F
where
    F: Fn(&SinkOpts) -> FramecutResult<Box<dyn FrameSink>> + Send + Sync,
{
    fn create(&self, opts: &SinkOpts) -> FramecutResult<Box<dyn FrameSink>> {
        self(opts)
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Return `true` once `end` has succeeded.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> FramecutResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FramecutResult<()> {
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(FramecutError::validation("out-of-order frame index"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> FramecutResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
