/// Convenience result type used across framecut.
pub type FramecutResult<T> = Result<T, FramecutError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Construction-time errors (ranges, tracks, filters) are returned synchronously from
/// [`crate::ExportCoordinator::export`]; anything that fails after the worker starts is folded into
/// [`crate::ExportResult::Failed`] using [`FramecutError::kind`].
#[derive(thiserror::Error, Debug)]
pub enum FramecutError {
    /// Trim range is negative, empty, or runs past the end of its asset.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Source asset lacks a track the plan requires.
    #[error("missing track: {0}")]
    MissingTrack(String),

    /// Filter name is not in the registry.
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    /// Copying a time range into the composition failed.
    #[error("failed to insert '{path}' into composition: {source}")]
    CompositionInsertFailed {
        /// Source path that could not be read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The encoder session could not be created.
    #[error("failed to create export session: {0}")]
    ExportSessionCreateFailed(String),

    /// An export is already running on this coordinator.
    #[error("an export is already in progress")]
    AlreadyExporting,

    /// Caller-side timeout elapsed before the export finished.
    #[error("export timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The export was cancelled.
    #[error("export cancelled")]
    Cancelled,

    /// Encoder or decoder failure carrying its diagnostic text.
    #[error("export failed: {0}")]
    Unknown(String),

    /// Invalid user-provided data that is not a range/track/filter problem.
    #[error("validation error: {0}")]
    Validation(String),

    /// Probing or decoding source media failed.
    #[error("media error: {0}")]
    Media(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Copyable discriminant of [`FramecutError`], reported in failed export results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// See [`FramecutError::InvalidRange`].
    InvalidRange,
    /// See [`FramecutError::MissingTrack`].
    MissingTrack,
    /// See [`FramecutError::UnknownFilter`].
    UnknownFilter,
    /// See [`FramecutError::CompositionInsertFailed`].
    CompositionInsertFailed,
    /// See [`FramecutError::ExportSessionCreateFailed`].
    ExportSessionCreateFailed,
    /// See [`FramecutError::AlreadyExporting`].
    AlreadyExporting,
    /// See [`FramecutError::Timeout`].
    Timeout,
    /// See [`FramecutError::Cancelled`].
    Cancelled,
    /// Validation, media and wrapped errors all surface as `Unknown` with their message.
    Unknown,
}

impl FramecutError {
    /// Build a [`FramecutError::InvalidRange`] value.
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Build a [`FramecutError::MissingTrack`] value.
    pub fn missing_track(msg: impl Into<String>) -> Self {
        Self::MissingTrack(msg.into())
    }

    /// Build a [`FramecutError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FramecutError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`FramecutError::Unknown`] value.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Build a [`FramecutError::ExportSessionCreateFailed`] value.
    pub fn session_create(msg: impl Into<String>) -> Self {
        Self::ExportSessionCreateFailed(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::MissingTrack(_) => ErrorKind::MissingTrack,
            Self::UnknownFilter(_) => ErrorKind::UnknownFilter,
            Self::CompositionInsertFailed { .. } => ErrorKind::CompositionInsertFailed,
            Self::ExportSessionCreateFailed(_) => ErrorKind::ExportSessionCreateFailed,
            Self::AlreadyExporting => ErrorKind::AlreadyExporting,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Unknown(_) | Self::Validation(_) | Self::Media(_) | Self::Other(_) => {
                ErrorKind::Unknown
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
