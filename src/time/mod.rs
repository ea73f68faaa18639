//! Exact media time: rational instants, ranges, and playback-rate scaling.

pub(crate) mod range;
pub(crate) mod rational;
pub(crate) mod speed;

pub use range::{MIN_UI_TRIM_SECS, TimeRange};
pub use rational::{DEFAULT_TIMESCALE, RationalTime};
pub use speed::SpeedFactor;
