use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::overlay::element::OverlayKind;
use crate::plan::{AudioSelection, CompositionPlan};

/// Timestamp layout used in output file names (`yyyyMMdd_HHmmss`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Which editing screen produced an output; decides the file name prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputKind {
    /// Trim only.
    Trimmed,
    /// Filter only, carrying the filter's registry name.
    Filtered(String),
    /// Text overlays only.
    Text,
    /// Sticker overlays only.
    Sticker,
    /// Anything else, including speed and audio changes.
    Edited,
}

impl OutputKind {
    /// Classify a plan by the single edit it carries, falling back to [`OutputKind::Edited`].
    pub fn for_plan(plan: &CompositionPlan) -> Self {
        let filter = plan
            .filter
            .as_ref()
            .filter(|f| f.name != "Original")
            .map(|f| f.name.clone());
        let audio_changed = !matches!(plan.audio, AudioSelection::Original { muted: false });
        let texts = plan
            .overlays
            .iter()
            .filter(|o| matches!(o.kind, OverlayKind::Text(_)))
            .count();
        let stickers = plan.overlays.len() - texts;

        if !plan.speed.is_normal() || audio_changed {
            return Self::Edited;
        }
        match (plan.is_trimmed(), filter, texts, stickers) {
            (true, None, 0, 0) => Self::Trimmed,
            (false, Some(name), 0, 0) => Self::Filtered(name),
            (false, None, t, 0) if t > 0 => Self::Text,
            (false, None, 0, s) if s > 0 => Self::Sticker,
            _ => Self::Edited,
        }
    }

    fn stem(&self, stamp: &str) -> String {
        match self {
            Self::Trimmed => format!("TrimmedVideo_{stamp}"),
            Self::Filtered(name) => format!("Filtered_{}_{stamp}", sanitize(name)),
            Self::Text => format!("TextVideo_{stamp}"),
            Self::Sticker => format!("StickerVideo_{stamp}"),
            Self::Edited => format!("EditedVideo_{stamp}"),
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Pick a fresh `.mp4` path in `dir` for `kind` stamped with `now`.
///
/// Existing files are never reused: a `_2`, `_3`, ... suffix is appended until the name is free.
pub fn output_path(dir: &Path, kind: &OutputKind, now: NaiveDateTime) -> PathBuf {
    let stem = kind.stem(&now.format(TIMESTAMP_FORMAT).to_string());
    free_path(&dir.join(format!("{stem}.mp4")))
}

/// `path` itself when nothing exists there, otherwise the first free `<stem>_<n>.<ext>` sibling
/// with `n >= 2`.
pub fn free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2u32..)
        .map(|n| path.with_file_name(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
#[path = "../../tests/unit/export/naming.rs"]
mod tests;
