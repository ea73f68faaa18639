use std::cmp::Ordering;
use std::fmt;

use crate::foundation::core::Fps;
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::foundation::math::{div_round_i128, gcd_i128};

/// Timescale used for trims and composition ranges (ticks per second).
pub const DEFAULT_TIMESCALE: i64 = 600;

/// Time as an integer number of ticks over a positive timescale.
///
/// Arithmetic is exact: results are computed in `i128` and reduced, so chains of trim and speed
/// changes never accumulate floating-point drift. Equality and ordering compare the represented
/// value, so `1/2` equals `300/600`.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct RationalTime {
    value: i64,
    timescale: i64,
}

impl RationalTime {
    /// Zero seconds.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    /// Create a time of `value / timescale` seconds.
    pub fn new(value: i64, timescale: i64) -> FramecutResult<Self> {
        if timescale <= 0 {
            return Err(FramecutError::validation("timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    /// Whole seconds.
    pub fn from_secs(secs: i64) -> Self {
        Self {
            value: secs,
            timescale: 1,
        }
    }

    /// Seconds rounded to the nearest tick of `timescale`.
    pub fn from_secs_f64(secs: f64, timescale: i64) -> FramecutResult<Self> {
        if !secs.is_finite() {
            return Err(FramecutError::validation("time must be finite"));
        }
        if timescale <= 0 {
            return Err(FramecutError::validation("timescale must be > 0"));
        }
        let ticks = (secs * timescale as f64).round();
        if ticks.abs() > i64::MAX as f64 {
            return Err(FramecutError::validation("time out of range"));
        }
        Ok(Self {
            value: ticks as i64,
            timescale,
        })
    }

    /// Tick count.
    pub fn value(self) -> i64 {
        self.value
    }

    /// Ticks per second.
    pub fn timescale(self) -> i64 {
        self.timescale
    }

    /// Lossy conversion for display and ffmpeg arguments.
    pub fn as_secs_f64(self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// Return `true` for exactly zero.
    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    /// Return `true` for values strictly below zero.
    pub fn is_negative(self) -> bool {
        self.value < 0
    }

    /// Return `true` for values strictly above zero.
    pub fn is_positive(self) -> bool {
        self.value > 0
    }

    /// Same value with the smallest possible timescale.
    pub fn reduced(self) -> Self {
        Self::from_i128(i128::from(self.value), i128::from(self.timescale))
    }

    /// Express on `timescale`, rounding to the nearest tick (ties away from zero).
    pub fn rescale(self, timescale: i64) -> FramecutResult<Self> {
        if timescale <= 0 {
            return Err(FramecutError::validation("timescale must be > 0"));
        }
        let num = i128::from(self.value) * i128::from(timescale);
        let value = div_round_i128(num, i128::from(self.timescale));
        Ok(Self {
            value: clamp_i64(value),
            timescale,
        })
    }

    /// Express on `timescale`, rounding down.
    pub(crate) fn rescale_floor(self, timescale: i64) -> Self {
        let num = i128::from(self.value) * i128::from(timescale);
        Self {
            value: clamp_i64(num.div_euclid(i128::from(self.timescale))),
            timescale,
        }
    }

    /// Exact `self * num / den`. `den` must be positive.
    pub fn mul_ratio(self, num: i64, den: i64) -> FramecutResult<Self> {
        if den <= 0 {
            return Err(FramecutError::validation("ratio denominator must be > 0"));
        }
        Ok(Self::from_i128(
            i128::from(self.value) * i128::from(num),
            i128::from(self.timescale) * i128::from(den),
        ))
    }

    /// Exact `self / other` as a reduced `(num, den)` pair with `den > 0`.
    pub fn ratio_to(self, other: Self) -> Option<(i128, i128)> {
        if other.value == 0 {
            return None;
        }
        let mut num = i128::from(self.value) * i128::from(other.timescale);
        let mut den = i128::from(self.timescale) * i128::from(other.value);
        if den < 0 {
            num = -num;
            den = -den;
        }
        let g = gcd_i128(num, den).max(1);
        Some((num / g, den / g))
    }

    /// Number of whole frames covered at `fps`, rounding to the nearest frame.
    pub fn frames_at(self, fps: Fps) -> u64 {
        let num = i128::from(self.value) * i128::from(fps.num);
        let den = i128::from(self.timescale) * i128::from(fps.den);
        div_round_i128(num, den).max(0) as u64
    }

    /// Start time of frame `frame` at `fps`.
    pub fn from_frames(frame: u64, fps: Fps) -> Self {
        Self::from_i128(
            i128::from(frame) * i128::from(fps.den),
            i128::from(fps.num),
        )
    }

    /// Smaller of two times.
    pub fn min(self, other: Self) -> Self {
        if other < self { other } else { self }
    }

    /// Larger of two times.
    pub fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    fn from_i128(num: i128, den: i128) -> Self {
        debug_assert!(den > 0);
        let g = gcd_i128(num, den).max(1);
        let mut num = num / g;
        let mut den = den / g;
        // Keep both parts in i64 range; precision loss here only happens far beyond any media
        // duration.
        while den > i128::from(i64::MAX) || num.abs() > i128::from(i64::MAX) {
            num = div_round_i128(num, 2);
            den /= 2;
        }
        Self {
            value: num as i64,
            timescale: den.max(1) as i64,
        }
    }

    fn common(self, other: Self) -> (i128, i128, i128) {
        let a = i128::from(self.value) * i128::from(other.timescale);
        let b = i128::from(other.value) * i128::from(self.timescale);
        (a, b, i128::from(self.timescale) * i128::from(other.timescale))
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RationalTime {}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.common(*other);
        a.cmp(&b)
    }
}

impl std::ops::Add for RationalTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.timescale == rhs.timescale {
            return Self::from_i128(
                i128::from(self.value) + i128::from(rhs.value),
                i128::from(self.timescale),
            );
        }
        let (a, b, den) = self.common(rhs);
        Self::from_i128(a + b, den)
    }
}

impl std::ops::Sub for RationalTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        if self.timescale == rhs.timescale {
            return Self::from_i128(
                i128::from(self.value) - i128::from(rhs.value),
                i128::from(self.timescale),
            );
        }
        let (a, b, den) = self.common(rhs);
        Self::from_i128(a - b, den)
    }
}

impl std::ops::AddAssign for RationalTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for RationalTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, t| acc + t)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/time/rational.rs"]
mod tests;
