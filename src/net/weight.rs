use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Scalar edge or path cost.
///
/// `NON_VIABLE` marks an edge that must never be traversed.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
    pub const ZERO: Weight = Weight(0.0);
    pub const NON_VIABLE: Weight = Weight(f64::INFINITY);

    /// Relative tolerance used when comparing accumulated path costs.
    pub const TOLERANCE: f64 = 1e-9;

    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    /// Finite and non-negative.
    pub fn is_viable(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }

    /// Equal within `TOLERANCE`, so sums reached along different orders compare equal.
    pub fn approx_eq(
        self,
        other: Weight,
    ) -> bool {
        if !self.0.is_finite() || !other.0.is_finite() {
            return self.0 == other.0;
        }
        let scale = self.0.abs().max(other.0.abs()).max(1.0);
        (self.0 - other.0).abs() <= Self::TOLERANCE * scale
    }

    pub fn total_cmp(
        &self,
        other: &Weight,
    ) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(
        self,
        rhs: Weight,
    ) -> Weight {
        Weight(self.0 + rhs.0)
    }
}

impl fmt::Display for Weight {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
