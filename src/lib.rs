//! framecut is the composition and render engine behind a clip editor.
//!
//! Given a source clip and a set of edits (trim, playback rate, filter, positioned text and
//! sticker overlays, muted or replaced audio) it builds a time-accurate, orientation-correct
//! composition and renders it to a new MP4 file.
//!
//! The public API is session-oriented:
//!
//! - Open an [`EditSession`] on a source file and record edits on it
//! - Freeze the edits into a [`CompositionPlan`]
//! - Hand the plan to an [`ExportCoordinator`] and wait on the returned [`ExportTask`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod assets;
pub(crate) mod audio;
pub(crate) mod compose;
pub(crate) mod effects;
/// Encoding sinks.
pub mod encode;
/// Export coordination, naming and the render loop.
pub mod export;
pub mod orientation;
pub(crate) mod overlay;
pub mod plan;
pub mod preview;
pub(crate) mod render;
pub mod session;
pub mod time;

pub use crate::foundation::core::{
    Affine, Fps, FrameIndex, PixelSize, Point, Rect, Rgba8, Size, Vec2,
};
pub use crate::foundation::error::{ErrorKind, FramecutError, FramecutResult};

pub use crate::assets::decoder::{
    FfmpegDecoder, MediaDecoder, VideoDecodeRequest, VideoFrameSource,
};
pub use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE, MediaAsset, open_asset};
pub use crate::assets::text::system_font_available;
pub use crate::compose::composer::{
    apply_speed, compose_plan, insert_primary_audio, insert_primary_video,
    insert_replacement_audio,
};
pub use crate::compose::composition::{AudioRole, AudioTrack, Composition, Segment, VideoTrack};
pub use crate::effects::filter::{FILTER_NAMES, FilterKind, FilterParam, FilterSpec};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkFactory, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    AudioInputConfig, FrameSink, InMemorySink, SinkConfig, SinkFactory, SinkOpts,
};
pub use crate::export::coordinator::{ExportCoordinator, ExportState};
pub use crate::export::naming::{OutputKind, free_path, output_path};
pub use crate::export::pipeline::{ExportOpts, ExportStats};
pub use crate::export::task::{ExportResult, ExportTask, INTERACTIVE_EXPORT_TIMEOUT};
pub use crate::orientation::{Orientation, OrientationInfo};
pub use crate::overlay::element::{
    OverlayElement, OverlayId, OverlayKind, OverlayPlacement, StickerOverlay, TextOverlay,
};
pub use crate::overlay::mapper::{MappedOverlay, VerticalConvention, aspect_fit_rect, map_overlay};
pub use crate::overlay::raster::{OverlayImage, OverlayRasterizer, PlacedOverlay, flatten_overlays};
pub use crate::plan::{AudioSelection, CompositionPlan, EditIntent, build_plan};
pub use crate::preview::{SeekRequest, SeekScheduler, render_preview_frame};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::instruction::{FrameProcessor, RenderInstruction};
pub use crate::session::{AudioEdit, EditFile, EditSession, OverlayEntry};
pub use crate::time::{RationalTime, SpeedFactor, TimeRange};
