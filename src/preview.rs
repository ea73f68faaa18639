//! Preview support: latest-wins seek scheduling and single-frame rendering of a plan.
//!
//! A scrubbing UI fires far more seeks than a decoder can serve. [`SeekScheduler`] keeps one
//! pending request (newer requests replace it) and stamps each with a generation so results for
//! superseded seeks can be dropped when they finally arrive.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::assets::decoder::{MediaDecoder, VideoDecodeRequest};
use crate::export::pipeline::build_processor;
use crate::foundation::core::Fps;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::plan::CompositionPlan;
use crate::render::frame::FrameRGBA;
use crate::time::{RationalTime, TimeRange};

/// One seek, stamped with the generation it was issued in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekRequest {
    /// Output-timeline position to show.
    pub time: RationalTime,
    /// Monotonic stamp; larger is newer.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct SchedState {
    pending: Option<SeekRequest>,
    generation: u64,
    closed: bool,
}

/// Single-slot, latest-wins seek queue shared between a UI thread and a preview worker.
#[derive(Debug, Default)]
pub struct SeekScheduler {
    state: Mutex<SchedState>,
    wake: Condvar,
}

impl SeekScheduler {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a seek to `time`, replacing any request not yet taken. Returns its generation.
    pub fn request(&self, time: RationalTime) -> u64 {
        let mut st = self.lock();
        st.generation += 1;
        let generation = st.generation;
        if let Some(stale) = st.pending.replace(SeekRequest { time, generation }) {
            tracing::trace!(generation = stale.generation, "seek superseded before start");
        }
        self.wake.notify_one();
        generation
    }

    /// Take the pending request without blocking.
    pub fn take(&self) -> Option<SeekRequest> {
        self.lock().pending.take()
    }

    /// Block until a request is pending, or return `None` once the scheduler is closed.
    pub fn next(&self) -> Option<SeekRequest> {
        let mut st = self.lock();
        loop {
            if let Some(req) = st.pending.take() {
                return Some(req);
            }
            if st.closed {
                return None;
            }
            st = self.wake.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Latest generation issued.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Return `true` when no newer seek has been issued since `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Pass `value` through if `generation` is still current; otherwise drop it with a warning.
    pub fn accept<T>(&self, generation: u64, value: T) -> Option<T> {
        let latest = self.generation();
        if latest != generation {
            tracing::warn!(generation, latest, "dropping stale preview result");
            return None;
        }
        Some(value)
    }

    /// Stop the scheduler; blocked and future [`SeekScheduler::next`] calls return `None`.
    pub fn close(&self) {
        let mut st = self.lock();
        st.closed = true;
        st.pending = None;
        self.wake.notify_all();
    }
}

/// Render the output frame shown at `at` on the plan's output timeline.
///
/// Runs the same orient, filter and overlay pass as export; `at` is clamped to the last frame.
#[tracing::instrument(level = "debug", skip(plan, decoder), fields(at = %at))]
pub fn render_preview_frame(
    plan: &CompositionPlan,
    decoder: &dyn MediaDecoder,
    at: RationalTime,
    fps: Fps,
) -> FramecutResult<FrameRGBA> {
    if at.is_negative() {
        return Err(FramecutError::invalid_range(format!(
            "preview time {at} is negative"
        )));
    }
    let output = plan.output_range();
    let last_frame = output.duration.frames_at(fps).saturating_sub(1);
    let frame = at.frames_at(fps).min(last_frame);
    let out_t = RationalTime::from_frames(frame, fps);

    let (num, den) = plan.speed.ratio();
    let source_offset = out_t.mul_ratio(num, den)?;
    let start = (plan.trim.start + source_offset).min(plan.trim.end());
    let source = TimeRange::from_start_end(start, plan.trim.end())?;

    let processor = build_processor(plan, output.duration)?;
    let natural_size = plan.orientation.natural_size;
    let mut src = decoder.open_video(&VideoDecodeRequest {
        path: plan.asset.path.clone(),
        natural_size,
        source,
        speed: plan.speed,
        fps,
        frame_count: 1,
    })?;
    let bytes = src
        .next_frame()?
        .ok_or_else(|| FramecutError::media("no frame decoded at the preview position"))?;
    processor.process(FrameRGBA::from_raw(natural_size, bytes, false)?)
}

#[cfg(test)]
#[path = "../tests/unit/preview.rs"]
mod tests;
