use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use rayon::prelude::*;

use crate::assets::decoder::{MediaDecoder, VideoDecodeRequest};
use crate::assets::media::{MIX_SAMPLE_RATE, MediaAsset};
use crate::audio::manifest::build_audio_manifest;
use crate::audio::mix::{frame_to_sample, mix_manifest, write_mix_to_f32le_file};
use crate::compose::composer::compose_plan;
use crate::compose::composition::Composition;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig, SinkFactory, SinkOpts};
use crate::export::naming::free_path;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::overlay::mapper::VerticalConvention;
use crate::overlay::raster::{OverlayRasterizer, flatten_overlays};
use crate::plan::CompositionPlan;
use crate::render::frame::FrameRGBA;
use crate::render::instruction::{FrameProcessor, RenderInstruction};
use crate::time::{RationalTime, SpeedFactor, TimeRange};

const MAX_CHUNK_BYTES: u64 = 128 * 1024 * 1024;

/// Environment variable overriding [`ExportOpts::chunk_size`].
pub const CHUNK_ENV: &str = "FRAMECUT_EXPORT_CHUNK";
/// Environment variable overriding [`ExportOpts::threads`].
pub const THREADS_ENV: &str = "FRAMECUT_EXPORT_THREADS";

/// Options controlling one export.
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Output frame rate.
    pub fps: Fps,
    /// Frames decoded and processed per batch; cancellation is checked between batches.
    pub chunk_size: usize,
    /// Replace an existing file at the output path. When unset, a taken path gets a `_2`, `_3`,
    /// ... suffix instead.
    pub overwrite: bool,
    /// Mix and encode audio tracks.
    pub enable_audio: bool,
    /// Background used when flattening a non-opaque frame (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Bounded channel capacity between the frame processor and the encoder thread.
    pub channel_capacity: usize,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            chunk_size: 16,
            overwrite: false,
            enable_audio: true,
            bg_rgba: [0, 0, 0, 255],
            threads: None,
            channel_capacity: 4,
        }
    }
}

impl ExportOpts {
    /// Apply `FRAMECUT_EXPORT_CHUNK` and `FRAMECUT_EXPORT_THREADS` when set to positive integers.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = positive_env(CHUNK_ENV) {
            self.chunk_size = n;
        }
        if let Some(n) = positive_env(THREADS_ENV) {
            self.threads = Some(n);
        }
        self
    }

    /// Export at the source clip's nominal frame rate when the probe reported one.
    pub fn with_source_fps(mut self, asset: &MediaAsset) -> Self {
        if let Some(fps) = asset.nominal_fps.filter(|f| f.num > 0 && f.den > 0) {
            self.fps = fps;
        }
        self
    }

    pub(crate) fn validate(&self) -> FramecutResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(FramecutError::validation("export fps must be non-zero"));
        }
        if self.threads == Some(0) {
            return Err(FramecutError::validation(
                "export 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

fn positive_env(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Frame counters reported when an export finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Frames written to the sink.
    pub frames_total: u64,
    /// Frames the decoder produced.
    pub frames_decoded: u64,
    /// Frames repeated because the decoder ran short.
    pub frames_padded: u64,
}

/// Everything the worker needs, built synchronously so construction errors surface early.
pub(crate) struct PreparedExport {
    pub(crate) comp: Composition,
    pub(crate) processor: FrameProcessor,
    pub(crate) frame_count: u64,
    pub(crate) output: PathBuf,
    pub(crate) opts: ExportOpts,
}

/// Compose the plan, build its frame processor and settle the output path.
#[tracing::instrument(level = "debug", skip_all, fields(output = %output.display()))]
pub(crate) fn prepare(
    plan: &CompositionPlan,
    output: PathBuf,
    opts: ExportOpts,
) -> FramecutResult<PreparedExport> {
    opts.validate()?;
    let comp = compose_plan(plan)?;
    let duration = comp.duration();
    let frame_count = duration.frames_at(opts.fps);
    if frame_count == 0 {
        return Err(FramecutError::invalid_range(format!(
            "output duration {duration} is shorter than one frame"
        )));
    }
    let processor = build_processor(plan, duration)?;

    let output = if opts.overwrite {
        output
    } else {
        let free = free_path(&output);
        if free != output {
            tracing::debug!(taken = %output.display(), chosen = %free.display(), "output renamed");
        }
        free
    };

    Ok(PreparedExport {
        comp,
        processor,
        frame_count,
        output,
        opts,
    })
}

/// Resolve the plan's filter and rasterize its overlays into one static layer.
pub(crate) fn build_processor(
    plan: &CompositionPlan,
    duration: RationalTime,
) -> FramecutResult<FrameProcessor> {
    let filter = plan.resolved_filter()?;
    let orientation = plan.orientation;
    let render_size = orientation.render_size;

    let placed = OverlayRasterizer::new().place_all(
        &plan.overlays,
        render_size,
        orientation.is_portrait,
        VerticalConvention::TopDown,
    )?;
    let layer = flatten_overlays(&placed, render_size)?;

    let instruction = RenderInstruction {
        time_range: TimeRange::from_zero(duration)?,
        render_size,
        orientation,
        filter,
        overlays: placed.iter().map(|p| p.mapped).collect(),
    };
    FrameProcessor::new(instruction, layer)
}

/// Render a prepared export into `output`, writing through a `.partial` sibling file.
///
/// The partial file (and the mixed audio scratch file) is removed unless the render completes.
pub(crate) fn run(
    job: &PreparedExport,
    decoder: &dyn MediaDecoder,
    sinks: &dyn SinkFactory,
    cancel: &AtomicBool,
) -> FramecutResult<ExportStats> {
    let opts = &job.opts;
    let mut partial = PartialOutputGuard::new(partial_path(&job.output));
    if partial.path.exists() {
        std::fs::remove_file(&partial.path).map_err(|e| {
            FramecutError::session_create(format!(
                "failed to clear stale '{}': {e}",
                partial.path.display()
            ))
        })?;
    }

    let mut audio_tmp = TempFileGuard(None);
    let audio = if opts.enable_audio {
        mix_audio(job, decoder, &mut audio_tmp)?
    } else {
        None
    };

    let render_size = job.processor.instruction().render_size;
    let cfg = SinkConfig {
        width: render_size.width,
        height: render_size.height,
        fps: opts.fps,
        audio,
    };
    let sink = sinks.create(&SinkOpts {
        out_path: partial.path.clone(),
        overwrite: true,
        bg_rgba: opts.bg_rgba,
    })?;
    let stats = render_frames(job, decoder, sink, cfg, cancel)?;

    if cancel.load(Ordering::Acquire) {
        return Err(FramecutError::Cancelled);
    }
    if !opts.overwrite && job.output.exists() {
        return Err(FramecutError::unknown(format!(
            "output file '{}' appeared during export",
            job.output.display()
        )));
    }
    if partial.path.exists() {
        if opts.overwrite && job.output.exists() {
            std::fs::remove_file(&job.output).map_err(|e| {
                FramecutError::unknown(format!(
                    "failed to replace '{}': {e}",
                    job.output.display()
                ))
            })?;
        }
        std::fs::rename(&partial.path, &job.output).map_err(|e| {
            FramecutError::unknown(format!(
                "failed to move finished output to '{}': {e}",
                job.output.display()
            ))
        })?;
    } else {
        tracing::debug!(output = %job.output.display(), "sink wrote no file");
    }
    partial.keep();
    drop(audio_tmp);
    Ok(stats)
}

fn mix_audio(
    job: &PreparedExport,
    decoder: &dyn MediaDecoder,
    audio_tmp: &mut TempFileGuard,
) -> FramecutResult<Option<AudioInputConfig>> {
    let total_samples = frame_to_sample(job.frame_count, job.opts.fps, MIX_SAMPLE_RATE);
    let Some(manifest) = build_audio_manifest(&job.comp, decoder, total_samples, MIX_SAMPLE_RATE)?
    else {
        return Ok(None);
    };
    if manifest.segments.is_empty() {
        return Ok(None);
    }

    let mixed = mix_manifest(&manifest);
    let path = std::env::temp_dir().join(format!(
        "framecut_audio_mix_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    audio_tmp.0 = Some(path.clone());
    write_mix_to_f32le_file(&mixed, &path)?;
    tracing::debug!(
        segments = manifest.segments.len(),
        samples = manifest.total_samples,
        path = %path.display(),
        "audio mixed"
    );
    Ok(Some(AudioInputConfig {
        path,
        sample_rate: manifest.sample_rate,
        channels: manifest.channels,
    }))
}

#[derive(Debug)]
enum FrameMsg {
    Frame { idx: FrameIndex, frame: FrameRGBA },
    Finish,
}

fn render_frames(
    job: &PreparedExport,
    decoder: &dyn MediaDecoder,
    sink: Box<dyn FrameSink>,
    cfg: SinkConfig,
    cancel: &AtomicBool,
) -> FramecutResult<ExportStats> {
    let opts = &job.opts;
    let video = job
        .comp
        .video()
        .ok_or_else(|| FramecutError::missing_track("composition has no video track"))?;

    let bytes_per_frame = u64::from(cfg.width)
        .saturating_mul(u64::from(cfg.height))
        .saturating_mul(4)
        .max(1);
    let max_chunk_by_mem = (MAX_CHUNK_BYTES / bytes_per_frame).max(1);
    let chunk_size = normalized_chunk_size(opts.chunk_size)
        .min(max_chunk_by_mem)
        .min(job.frame_count);
    let pool = build_thread_pool(opts.threads)?;
    let cap = opts.channel_capacity.max(1);

    tracing::info!(
        frames = job.frame_count,
        width = cfg.width,
        height = cfg.height,
        fps = opts.fps.as_f64(),
        chunk_size,
        audio = cfg.audio.is_some(),
        "export render started"
    );

    std::thread::scope(|scope| -> FramecutResult<ExportStats> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);

        let enc = scope.spawn(move || -> FramecutResult<()> {
            let mut sink = sink;
            if let Err(e) = sink.begin(cfg) {
                sink.abort();
                return Err(match e {
                    FramecutError::ExportSessionCreateFailed(_) => e,
                    other => FramecutError::session_create(other.to_string()),
                });
            }
            loop {
                match rx.recv() {
                    Ok(FrameMsg::Frame { idx, frame }) => {
                        if let Err(e) = sink.push_frame(idx, &frame) {
                            sink.abort();
                            return Err(e);
                        }
                    }
                    Ok(FrameMsg::Finish) => {
                        return sink.end().inspect_err(|_| sink.abort());
                    }
                    Err(_) => {
                        // producer stopped early; its own error is the one reported
                        sink.abort();
                        return Err(FramecutError::Cancelled);
                    }
                }
            }
        });

        let produce_res = (|| -> FramecutResult<ExportStats> {
            let mut stats = ExportStats::default();
            let mut last_raw: Option<Vec<u8>> = None;
            let mut segment_start = 0u64;

            for (i, seg) in video.segments.iter().enumerate() {
                let segment_end = if i + 1 == video.segments.len() {
                    job.frame_count
                } else {
                    seg.target.end().frames_at(opts.fps).min(job.frame_count)
                };
                if segment_end <= segment_start {
                    continue;
                }
                let req = VideoDecodeRequest {
                    path: seg.asset.path.clone(),
                    natural_size: video.natural_size,
                    source: seg.source,
                    speed: SpeedFactor::new(seg.playback_rate())?,
                    fps: opts.fps,
                    frame_count: segment_end - segment_start,
                };
                let mut source = decoder.open_video(&req)?;
                let mut exhausted = false;

                let mut chunk_start = segment_start;
                while chunk_start < segment_end {
                    if cancel.load(Ordering::Acquire) {
                        return Err(FramecutError::Cancelled);
                    }
                    let chunk_end = (chunk_start + chunk_size).min(segment_end);

                    let mut raw = Vec::with_capacity((chunk_end - chunk_start) as usize);
                    for _ in chunk_start..chunk_end {
                        let next = if exhausted { None } else { source.next_frame()? };
                        match next {
                            Some(bytes) => {
                                stats.frames_decoded += 1;
                                raw.push(bytes);
                            }
                            None => {
                                exhausted = true;
                                let pad = raw.last().or(last_raw.as_ref()).cloned().ok_or_else(
                                    || FramecutError::media("decoder produced no video frames"),
                                )?;
                                stats.frames_padded += 1;
                                raw.push(pad);
                            }
                        }
                    }
                    last_raw = raw.last().cloned();

                    let processed = pool.install(|| {
                        raw.into_par_iter()
                            .map(|bytes| {
                                let natural = FrameRGBA::from_raw(video.natural_size, bytes, false)?;
                                job.processor.process(natural)
                            })
                            .collect::<FramecutResult<Vec<_>>>()
                    })?;

                    for (offset, frame) in processed.into_iter().enumerate() {
                        tx.send(FrameMsg::Frame {
                            idx: FrameIndex(chunk_start + offset as u64),
                            frame,
                        })
                        .map_err(|_| FramecutError::unknown("encoder thread is not accepting frames"))?;
                    }
                    stats.frames_total += chunk_end - chunk_start;
                    tracing::debug!(done = chunk_end, total = job.frame_count, "export chunk encoded");
                    chunk_start = chunk_end;
                }
                segment_start = segment_end;
            }

            if stats.frames_padded > 0 {
                tracing::warn!(padded = stats.frames_padded, "decoder ran short; repeated last frame");
            }
            if cancel.load(Ordering::Acquire) {
                return Err(FramecutError::Cancelled);
            }
            tx.send(FrameMsg::Finish)
                .map_err(|_| FramecutError::unknown("encoder thread is not accepting frames"))?;
            Ok(stats)
        })();

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| FramecutError::unknown("encoder thread panicked"))?;

        match (produce_res, enc_res) {
            // a sink failure makes the producer's send fail; report the sink's reason
            (_, Err(e)) if !matches!(e, FramecutError::Cancelled) => Err(e),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(stats), Ok(())) => Ok(stats),
        }
    })
}

/// `<dir>/<stem>.partial.<ext>` next to the final output.
pub(crate) fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = output
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    output.with_file_name(format!("{stem}.partial.{ext}"))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> FramecutResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FramecutError::validation(
            "export 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("framecut-fx-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FramecutError::unknown(format!("failed to build rayon thread pool: {e}")))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Deletes the partial output on drop unless [`PartialOutputGuard::keep`] was called.
struct PartialOutputGuard {
    path: PathBuf,
    armed: bool,
}

impl PartialOutputGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn keep(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutputGuard {
    fn drop(&mut self) {
        if self.armed
            && self.path.exists()
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial output");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
