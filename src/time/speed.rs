use std::fmt;

use crate::foundation::error::{FramecutError, FramecutResult};
use crate::foundation::math::gcd_i128;

/// Playback-rate multiplier. Output duration is input duration divided by the factor.
///
/// Stored both as the `f64` the caller supplied and as the closest reduced fraction with both
/// parts at most 2^40, which is what all time arithmetic uses.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SpeedFactor {
    value: f64,
    num: i64,
    den: i64,
}

const MAX_RATIO_PART: i64 = 1 << 40;
const RATIO_REL_TOLERANCE: f64 = 1e-12;

impl SpeedFactor {
    /// Speeds offered by the speed screen.
    pub const PRESETS: [f64; 6] = [0.5, 1.0, 1.5, 2.0, 3.0, 4.0];

    /// Normal playback.
    pub const NORMAL: Self = Self {
        value: 1.0,
        num: 1,
        den: 1,
    };

    /// Create a factor from any finite positive value.
    pub fn new(value: f64) -> FramecutResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(FramecutError::validation(format!(
                "speed factor must be finite and > 0, got {value}"
            )));
        }
        let (num, den) = best_ratio(value);
        Ok(Self { value, num, den })
    }

    /// Create an exact factor `num / den`.
    pub fn from_ratio(num: i64, den: i64) -> FramecutResult<Self> {
        if num <= 0 || den <= 0 {
            return Err(FramecutError::validation(
                "speed factor ratio must be positive",
            ));
        }
        let (num, den) = reduce(num, den);
        Ok(Self {
            value: num as f64 / den as f64,
            num,
            den,
        })
    }

    /// All preset factors.
    pub fn presets() -> Vec<Self> {
        Self::PRESETS
            .iter()
            .filter_map(|&v| Self::new(v).ok())
            .collect()
    }

    /// Floating-point value.
    pub fn get(self) -> f64 {
        self.value
    }

    /// Exact `(numerator, denominator)`.
    pub fn ratio(self) -> (i64, i64) {
        (self.num, self.den)
    }

    /// The factor that undoes this one.
    pub fn inverse(self) -> Self {
        Self {
            value: 1.0 / self.value,
            num: self.den,
            den: self.num,
        }
    }

    /// Return `true` for 1x.
    pub fn is_normal(self) -> bool {
        self.num == self.den
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for SpeedFactor {
    type Error = FramecutError;

    fn try_from(value: f64) -> FramecutResult<Self> {
        Self::new(value)
    }
}

impl From<SpeedFactor> for f64 {
    fn from(s: SpeedFactor) -> f64 {
        s.value
    }
}

impl fmt::Display for SpeedFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.value)
    }
}

/// Closest convergent of the continued fraction of `x` with both parts bounded.
///
/// Values outside `[2^-40, 2^40]` saturate to the bound.
fn best_ratio(x: f64) -> (i64, i64) {
    let max = MAX_RATIO_PART as f64;
    if x >= max {
        return (MAX_RATIO_PART, 1);
    }
    if x <= 1.0 / max {
        return (1, MAX_RATIO_PART);
    }

    let bound = i128::from(MAX_RATIO_PART);
    let (mut h_prev, mut h) = (0i128, 1i128);
    let (mut k_prev, mut k) = (1i128, 0i128);
    let mut r = x;
    loop {
        let a = r.floor();
        let a_i = a as i128;
        let h_next = a_i.saturating_mul(h).saturating_add(h_prev);
        let k_next = a_i.saturating_mul(k).saturating_add(k_prev);
        if h_next > bound || k_next > bound {
            break;
        }
        (h_prev, h) = (h, h_next);
        (k_prev, k) = (k, k_next);

        let frac = r - a;
        if k > 0 && ((h as f64 / k as f64) - x).abs() <= x * RATIO_REL_TOLERANCE {
            break;
        }
        if frac <= 0.0 {
            break;
        }
        r = 1.0 / frac;
    }
    reduce(h.max(1) as i64, k.max(1) as i64)
}

fn reduce(num: i64, den: i64) -> (i64, i64) {
    let g = gcd_i128(i128::from(num), i128::from(den)).max(1) as i64;
    (num / g, den / g)
}

#[cfg(test)]
#[path = "../../tests/unit/time/speed.rs"]
mod tests;
