//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order and are fed by the export worker.

/// `ffmpeg`-based MP4 sink.
pub mod ffmpeg;
/// Frame sink trait, sink factories and the in-memory sink.
pub mod sink;
