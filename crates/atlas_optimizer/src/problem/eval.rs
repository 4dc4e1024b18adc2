use std::cmp::Ordering;
use std::iter;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use jiff::SignedDuration;
use serde::Serialize;

/// Gains below this are treated as noise and never applied.
pub const MIN_GAIN: f64 = 1e-6;

/// Cost, travel duration and travel distance of a route fragment. Additive;
/// gain arithmetic is `old edges - new edges`. Ordering compares cost only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Eval {
    pub cost: f64,
    pub duration: SignedDuration,
    pub distance: f64,
}

impl Eval {
    pub const ZERO: Eval = Eval {
        cost: 0.0,
        duration: SignedDuration::ZERO,
        distance: 0.0,
    };

    /// Sentinel for "no valid move".
    pub const NO_GAIN: Eval = Eval {
        cost: f64::NEG_INFINITY,
        duration: SignedDuration::ZERO,
        distance: 0.0,
    };

    pub fn new(cost: f64, duration: SignedDuration, distance: f64) -> Self {
        Eval {
            cost,
            duration,
            distance,
        }
    }

    pub fn cost_only(cost: f64) -> Self {
        Eval {
            cost,
            duration: SignedDuration::ZERO,
            distance: 0.0,
        }
    }

    pub fn is_no_gain(&self) -> bool {
        self.cost == f64::NEG_INFINITY
    }

    /// A move is worth applying only when its cost gain clears the noise
    /// threshold.
    pub fn is_gain(&self) -> bool {
        self.cost > MIN_GAIN
    }
}

impl Default for Eval {
    fn default() -> Self {
        Eval::ZERO
    }
}

impl PartialOrd for Eval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cost.total_cmp(&other.cost))
    }
}

impl Add for Eval {
    type Output = Eval;

    fn add(self, rhs: Eval) -> Eval {
        Eval {
            cost: self.cost + rhs.cost,
            duration: self.duration + rhs.duration,
            distance: self.distance + rhs.distance,
        }
    }
}

impl Sub for Eval {
    type Output = Eval;

    fn sub(self, rhs: Eval) -> Eval {
        Eval {
            cost: self.cost - rhs.cost,
            duration: self.duration - rhs.duration,
            distance: self.distance - rhs.distance,
        }
    }
}

impl AddAssign for Eval {
    fn add_assign(&mut self, rhs: Eval) {
        *self = *self + rhs;
    }
}

impl SubAssign for Eval {
    fn sub_assign(&mut self, rhs: Eval) {
        *self = *self - rhs;
    }
}

impl Neg for Eval {
    type Output = Eval;

    fn neg(self) -> Eval {
        Eval {
            cost: -self.cost,
            duration: -self.duration,
            distance: -self.distance,
        }
    }
}

impl iter::Sum for Eval {
    fn sum<I: Iterator<Item = Eval>>(iter: I) -> Eval {
        iter.fold(Eval::ZERO, |acc, eval| acc + eval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_arithmetic() {
        let removed = Eval::new(10.0, SignedDuration::from_secs(10), 10.0)
            + Eval::new(5.0, SignedDuration::from_secs(5), 5.0);
        let added = Eval::new(7.0, SignedDuration::from_secs(7), 7.0);

        let gain = removed - added;
        assert_eq!(gain.cost, 8.0);
        assert_eq!(gain.duration, SignedDuration::from_secs(8));
        assert!(gain.is_gain());
    }

    #[test]
    fn test_no_gain_sentinel() {
        assert!(Eval::NO_GAIN.is_no_gain());
        assert!(!Eval::NO_GAIN.is_gain());
        assert!(Eval::NO_GAIN < Eval::ZERO);
    }

    #[test]
    fn test_tiny_gain_is_noise() {
        assert!(!Eval::cost_only(1e-9).is_gain());
        assert!(Eval::cost_only(0.5).is_gain());
    }
}
