use crate::foundation::error::{FramecutError, FramecutResult};
use crate::time::rational::RationalTime;
use crate::time::speed::SpeedFactor;

/// Shortest trim the trim screen lets a user pick, in seconds.
pub const MIN_UI_TRIM_SECS: i64 = 1;

/// Half-open time interval `[start, start + duration)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: RationalTime,
    /// Length, never negative.
    pub duration: RationalTime,
}

impl TimeRange {
    /// Create a range; the duration must be non-negative.
    pub fn new(start: RationalTime, duration: RationalTime) -> FramecutResult<Self> {
        if duration.is_negative() {
            return Err(FramecutError::invalid_range(format!(
                "duration must be >= 0, got {duration}"
            )));
        }
        Ok(Self { start, duration })
    }

    /// `[0, duration)`.
    pub fn from_zero(duration: RationalTime) -> FramecutResult<Self> {
        Self::new(RationalTime::ZERO, duration)
    }

    /// Range between two instants.
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> FramecutResult<Self> {
        Self::new(start, end - start)
    }

    /// Range from floating-point seconds on `timescale`.
    pub fn from_secs_f64(start: f64, end: f64, timescale: i64) -> FramecutResult<Self> {
        let s = RationalTime::from_secs_f64(start, timescale)?;
        let e = RationalTime::from_secs_f64(end, timescale)?;
        Self::from_start_end(s, e)
    }

    /// Exclusive end.
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    /// Return `true` when the duration is zero.
    pub fn is_empty(self) -> bool {
        self.duration.is_zero()
    }

    /// Return `true` when `t` lies in `[start, end)`.
    pub fn contains(self, t: RationalTime) -> bool {
        t >= self.start && t < self.end()
    }

    /// Return `true` when the range is at least as long as the trim screen minimum.
    pub fn meets_ui_minimum(self) -> bool {
        self.duration >= RationalTime::from_secs(MIN_UI_TRIM_SECS)
    }

    /// Retime by `factor`: duration becomes `duration / factor`, start is unchanged.
    pub fn scale(self, factor: SpeedFactor) -> Self {
        let (num, den) = factor.ratio();
        Self {
            start: self.start,
            duration: self
                .duration
                .mul_ratio(den, num)
                .unwrap_or(self.duration),
        }
    }

    /// Validate `self` as a trim of `within`.
    ///
    /// Rejects a negative start, a non-positive duration, and an end past `within.end()`.
    pub fn clamp(self, within: TimeRange) -> FramecutResult<Self> {
        if self.start.is_negative() {
            return Err(FramecutError::invalid_range(format!(
                "trim start {} is negative",
                self.start
            )));
        }
        if !self.duration.is_positive() {
            return Err(FramecutError::invalid_range(format!(
                "trim duration must be > 0, got {}",
                self.duration
            )));
        }
        if self.start < within.start {
            return Err(FramecutError::invalid_range(format!(
                "trim start {} precedes asset start {}",
                self.start, within.start
            )));
        }
        if self.end() > within.end() {
            return Err(FramecutError::invalid_range(format!(
                "trim end {} exceeds asset end {}",
                self.end(),
                within.end()
            )));
        }
        Ok(self)
    }

    /// Round both endpoints to the nearest tick of `timescale`, never past `limit`.
    ///
    /// An end that would round past `limit` is rounded down instead.
    pub fn snap_to_timescale(self, timescale: i64, limit: RationalTime) -> FramecutResult<Self> {
        let start = self.start.rescale(timescale)?;
        let mut end = self.end().rescale(timescale)?;
        if end > limit {
            end = self.end().min(limit).rescale_floor(timescale);
        }
        let start = if start > end { end } else { start };
        Self::from_start_end(start, end)
    }

    /// Shift the start to zero, keeping the duration.
    pub fn at_zero(self) -> Self {
        Self {
            start: RationalTime::ZERO,
            duration: self.duration,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/time/range.rs"]
mod tests;
