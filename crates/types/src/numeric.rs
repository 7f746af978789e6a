//! Fixed-point NUMERIC(precision, scale) values.
//!
//! Stored as an unscaled `i128` plus a `scale` (number of digits after the
//! decimal point), the same representation most embedded SQL engines use
//! to avoid binary-floating-point drift for exact-decimal arithmetic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Numeric {
    pub unscaled: i128,
    pub scale: u32,
}

impl Numeric {
    pub fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn from_i64(v: i64) -> Self {
        Self::new(v as i128, 0)
    }

    pub fn to_f64(self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }

    fn rescale(self, scale: u32) -> i128 {
        if scale >= self.scale {
            self.unscaled * 10i128.pow(scale - self.scale)
        } else {
            self.unscaled / 10i128.pow(self.scale - scale)
        }
    }

    fn common_scale(a: Numeric, b: Numeric) -> u32 {
        a.scale.max(b.scale)
    }

    pub fn add(self, other: Numeric) -> Numeric {
        let scale = Self::common_scale(self, other);
        Numeric::new(self.rescale(scale) + other.rescale(scale), scale)
    }

    pub fn sub(self, other: Numeric) -> Numeric {
        let scale = Self::common_scale(self, other);
        Numeric::new(self.rescale(scale) - other.rescale(scale), scale)
    }

    pub fn mul(self, other: Numeric) -> Numeric {
        Numeric::new(self.unscaled * other.unscaled, self.scale + other.scale)
    }

    /// Divide preserving the wider of the two scales (plus a few guard digits).
    pub fn div(self, other: Numeric) -> Option<Numeric> {
        if other.unscaled == 0 {
            return None;
        }
        let guard_scale = self.scale.max(other.scale) + 6;
        let numerator = self.rescale(guard_scale + other.scale);
        Some(Numeric::new(numerator / other.unscaled, guard_scale))
    }

    pub fn rem(self, other: Numeric) -> Option<Numeric> {
        if other.unscaled == 0 {
            return None;
        }
        let scale = Self::common_scale(self, other);
        Some(Numeric::new(self.rescale(scale) % other.rescale(scale), scale))
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        let scale = Self::common_scale(*self, *other);
        self.rescale(scale) == other.rescale(scale)
    }
}
impl Eq for Numeric {}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = Self::common_scale(*self, *other);
        self.rescale(scale).cmp(&other.rescale(scale))
    }
}

impl std::hash::Hash for Numeric {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Normalize to scale 0 bucket plus fractional remainder so that
        // equal values (at different internal scales) hash identically.
        self.rescale(self.scale.max(18)).hash(state);
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let divisor = 10i128.pow(self.scale);
        let whole = self.unscaled / divisor;
        let frac = (self.unscaled % divisor).unsigned_abs();
        write!(f, "{}.{:0width$}", whole, frac, width = self.scale as usize)
    }
}
