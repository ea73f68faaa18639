//! Edit session: the mutable editing state behind the UI, frozen into plans on demand.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::assets::media::{MediaAsset, open_asset};
use crate::effects::filter::{FilterKind, FilterSpec};
use crate::export::naming::{OutputKind, output_path};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::orientation::OrientationInfo;
use crate::overlay::element::{
    OverlayElement, OverlayId, OverlayKind, OverlayPlacement, StickerOverlay, TextOverlay,
};
use crate::plan::{AudioSelection, CompositionPlan, EditIntent, build_plan};
use crate::time::{DEFAULT_TIMESCALE, SpeedFactor, TimeRange};

/// Editing state for one source asset.
///
/// Orientation is resolved once, from the original source, when the session is created. Every
/// plan produced later carries that same value.
#[derive(Clone, Debug)]
pub struct EditSession {
    asset: Arc<MediaAsset>,
    orientation: OrientationInfo,
    intent: EditIntent,
    next_overlay_id: u64,
}

impl EditSession {
    /// Probe `path` and start a session on it.
    pub fn open(path: impl AsRef<Path>) -> FramecutResult<Self> {
        Ok(Self::new(Arc::new(open_asset(path.as_ref())?)))
    }

    /// Start a session on an already opened asset.
    pub fn new(asset: Arc<MediaAsset>) -> Self {
        let orientation = OrientationInfo::resolve(asset.preferred_transform, asset.video_natural_size);
        tracing::debug!(
            path = %asset.path.display(),
            orientation = ?orientation.orientation,
            width = orientation.render_size.width,
            height = orientation.render_size.height,
            "edit session opened"
        );
        Self {
            asset,
            orientation,
            intent: EditIntent::default(),
            next_overlay_id: 1,
        }
    }

    /// Source asset.
    pub fn asset(&self) -> &Arc<MediaAsset> {
        &self.asset
    }

    /// Orientation resolved when the session was created.
    pub fn orientation(&self) -> OrientationInfo {
        self.orientation
    }

    /// Current edit choices.
    pub fn intent(&self) -> &EditIntent {
        &self.intent
    }

    /// Set or clear the trim. The range is checked against the asset immediately.
    pub fn set_trim(&mut self, trim: Option<TimeRange>) -> FramecutResult<()> {
        if let Some(t) = trim {
            t.clamp(self.asset.full_range())?;
        }
        self.intent.trim = trim;
        Ok(())
    }

    /// Trim to `[start, end)` seconds.
    pub fn set_trim_secs(&mut self, start: f64, end: f64) -> FramecutResult<()> {
        self.set_trim(Some(TimeRange::from_secs_f64(start, end, DEFAULT_TIMESCALE)?))
    }

    /// Set the playback rate.
    pub fn set_speed(&mut self, speed: SpeedFactor) {
        self.intent.speed = speed;
    }

    /// Set or clear the filter. Unknown names and parameters are rejected here.
    pub fn set_filter(&mut self, filter: Option<FilterSpec>) -> FramecutResult<()> {
        if let Some(spec) = &filter {
            FilterKind::from_spec(spec)?;
        }
        self.intent.filter = filter;
        Ok(())
    }

    /// Choose the output audio.
    pub fn set_audio(&mut self, audio: AudioSelection) {
        self.intent.audio = audio;
    }

    /// Keep the source audio, or drop it when `muted`.
    pub fn set_muted(&mut self, muted: bool) {
        self.intent.audio = AudioSelection::Original { muted };
    }

    /// Replace the source audio with `asset`'s audio.
    pub fn replace_audio(&mut self, asset: Arc<MediaAsset>, looped: bool) -> FramecutResult<()> {
        if !asset.has_audio {
            return Err(FramecutError::missing_track(format!(
                "'{}' has no audio track",
                asset.path.display()
            )));
        }
        self.intent.audio = AudioSelection::Replacement { asset, looped };
        Ok(())
    }

    /// Overlays in draw order; later entries draw on top.
    pub fn overlays(&self) -> &[OverlayElement] {
        &self.intent.overlays
    }

    /// Add an overlay on top of the others and return its id.
    pub fn add_overlay(
        &mut self,
        kind: OverlayKind,
        placement: OverlayPlacement,
    ) -> FramecutResult<OverlayId> {
        let id = OverlayId(self.next_overlay_id);
        let element = OverlayElement {
            id,
            kind,
            placement,
        };
        element.validate()?;
        self.next_overlay_id += 1;
        self.intent.overlays.push(element);
        Ok(id)
    }

    /// Add a text caption.
    pub fn add_text(
        &mut self,
        text: TextOverlay,
        placement: OverlayPlacement,
    ) -> FramecutResult<OverlayId> {
        self.add_overlay(OverlayKind::Text(text), placement)
    }

    /// Add an image sticker.
    pub fn add_sticker(
        &mut self,
        image_path: impl Into<PathBuf>,
        placement: OverlayPlacement,
    ) -> FramecutResult<OverlayId> {
        self.add_overlay(
            OverlayKind::Sticker(StickerOverlay {
                image_path: image_path.into(),
            }),
            placement,
        )
    }

    /// Replace an overlay's placement with the final result of a gesture.
    pub fn update_placement(
        &mut self,
        id: OverlayId,
        placement: OverlayPlacement,
    ) -> FramecutResult<()> {
        placement.validate()?;
        let element = self
            .intent
            .overlays
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| FramecutError::validation(format!("no overlay with id {}", id.0)))?;
        element.placement = placement;
        Ok(())
    }

    /// Move an overlay to the top of the draw order.
    pub fn bring_to_front(&mut self, id: OverlayId) -> bool {
        let Some(pos) = self.intent.overlays.iter().position(|o| o.id == id) else {
            return false;
        };
        let element = self.intent.overlays.remove(pos);
        self.intent.overlays.push(element);
        true
    }

    /// Remove an overlay. Returns `false` when `id` is unknown.
    pub fn remove_overlay(&mut self, id: OverlayId) -> bool {
        let before = self.intent.overlays.len();
        self.intent.overlays.retain(|o| o.id != id);
        self.intent.overlays.len() != before
    }

    /// Remove every overlay.
    pub fn clear_overlays(&mut self) {
        self.intent.overlays.clear();
    }

    /// Drop all edits, keeping the asset and its orientation.
    pub fn reset(&mut self) {
        self.intent = EditIntent::default();
    }

    /// Freeze the current edits into an immutable plan.
    pub fn plan(&self) -> FramecutResult<CompositionPlan> {
        build_plan(Arc::clone(&self.asset), self.orientation, &self.intent)
    }

    /// Fresh output path in `dir` named after the kind of edit the session holds.
    pub fn output_path(&self, dir: &Path, now: NaiveDateTime) -> FramecutResult<PathBuf> {
        let plan = self.plan()?;
        Ok(output_path(dir, &OutputKind::for_plan(&plan), now))
    }
}

/// Audio choice in an [`EditFile`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum AudioEdit {
    /// Keep the source audio, or drop it.
    Original {
        /// Drop the source audio entirely.
        #[serde(default)]
        muted: bool,
    },
    /// Use another file's audio.
    Replace {
        /// File supplying the audio track.
        path: PathBuf,
        /// Repeat the replacement until the output is covered.
        #[serde(default)]
        looped: bool,
    },
}

/// One overlay in an [`EditFile`]. Ids are assigned when the file is applied.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayEntry {
    /// Content.
    #[serde(flatten)]
    pub kind: OverlayKind,
    /// Editor-space placement.
    pub placement: OverlayPlacement,
}

/// JSON form of an edit session, as read by the command line tool.
///
/// Relative paths are resolved against the directory holding the edit file.
///
/// ```json
/// {
///   "source": "clip.mov",
///   "trim": [2.0, 8.0],
///   "speed": 2.0,
///   "filter": { "name": "Mono" },
///   "audio": { "mode": "original", "muted": true }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditFile {
    /// Source clip.
    pub source: PathBuf,
    /// Trim as `[start, end)` seconds.
    #[serde(default)]
    pub trim: Option<[f64; 2]>,
    /// Playback rate.
    #[serde(default = "normal_speed")]
    pub speed: f64,
    /// Filter, if any.
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    /// Overlays in draw order.
    #[serde(default)]
    pub overlays: Vec<OverlayEntry>,
    /// Audio choice; the source audio when absent.
    #[serde(default)]
    pub audio: Option<AudioEdit>,
}

fn normal_speed() -> f64 {
    1.0
}

impl EditFile {
    /// Read an edit file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> FramecutResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FramecutError::validation(format!("open edit file '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse an edit file from a reader.
    pub fn from_reader(r: impl Read) -> FramecutResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| FramecutError::validation(format!("parse edit file JSON: {e}")))
    }

    /// Parse an edit file from a string.
    pub fn from_json_str(s: &str) -> FramecutResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Open the source and replay every edit on a fresh session.
    pub fn into_session(self, base_dir: &Path) -> FramecutResult<EditSession> {
        let mut session = EditSession::open(resolve_path(base_dir, self.source.clone()))?;
        self.apply(&mut session, base_dir)?;
        Ok(session)
    }

    /// Replay the edits on `session`, whose source is assumed to match [`EditFile::source`].
    pub fn apply(self, session: &mut EditSession, base_dir: &Path) -> FramecutResult<()> {
        let resolve = |p: PathBuf| resolve_path(base_dir, p);
        if let Some([start, end]) = self.trim {
            session.set_trim_secs(start, end)?;
        }
        session.set_speed(SpeedFactor::new(self.speed)?);
        session.set_filter(self.filter)?;
        for entry in self.overlays {
            let kind = match entry.kind {
                OverlayKind::Text(mut t) => {
                    t.font_path = t.font_path.map(resolve);
                    OverlayKind::Text(t)
                }
                OverlayKind::Sticker(s) => OverlayKind::Sticker(StickerOverlay {
                    image_path: resolve(s.image_path),
                }),
            };
            session.add_overlay(kind, entry.placement)?;
        }
        match self.audio {
            None => {}
            Some(AudioEdit::Original { muted }) => session.set_muted(muted),
            Some(AudioEdit::Replace { path, looped }) => {
                let asset = Arc::new(open_asset(&resolve(path))?);
                session.replace_audio(asset, looped)?;
            }
        }
        Ok(())
    }
}

fn resolve_path(base_dir: &Path, p: PathBuf) -> PathBuf {
    if p.is_relative() { base_dir.join(p) } else { p }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
