use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

type Vector = SmallVec<[i64; 2]>;

/// Multi-dimensional load vector of signed integers. All amounts of one
/// problem share the same dimension; out-of-range components read as zero so
/// partially-specified amounts still compare correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount(Vector);

impl Amount {
    pub const EMPTY: Amount = Amount(Vector::new_const());

    pub fn empty() -> Self {
        Self::EMPTY
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        let mut vec = SmallVec::with_capacity(dimensions);
        vec.resize(dimensions, 0);
        Amount(vec)
    }

    pub fn from_vec(vec: Vec<i64>) -> Self {
        Amount(SmallVec::from_vec(vec))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> i64 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty() || self.0.iter().all(|&v| v == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn reset(&mut self) {
        for value in self.0.iter_mut() {
            *value = 0;
        }
    }

    pub fn update(&mut self, other: &Amount) {
        self.0.clone_from(&other.0);
    }

    /// Pointwise maximum, in place.
    pub fn max_with(&mut self, other: &Amount) {
        let max_len = self.len().max(other.len());
        self.0.resize(max_len, 0);
        for i in 0..max_len {
            self.0[i] = self.0[i].max(other.get(i));
        }
    }

    /// Pointwise `self <= capacity`, the capacity-feasibility comparison.
    pub fn fits_within(&self, capacity: &Amount) -> bool {
        let len = self.len().max(capacity.len());
        (0..len).all(|i| self.get(i) <= capacity.get(i))
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        let len = self.len().max(other.len());
        (0..len).all(|i| self.get(i) == other.get(i))
    }
}

impl Eq for Amount {}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        if self.0.len() < rhs.len() {
            self.0.resize(rhs.len(), 0);
        }
        for (i, value) in self.0.iter_mut().enumerate() {
            *value += rhs.get(i);
        }
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, rhs: &Amount) {
        if self.0.len() < rhs.len() {
            self.0.resize(rhs.len(), 0);
        }
        for (i, value) in self.0.iter_mut().enumerate() {
            *value -= rhs.get(i);
        }
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub<&Amount> for &Amount {
    type Output = Amount;

    fn sub(self, rhs: &Amount) -> Amount {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assign_extends_dimensions() {
        let mut a = Amount::from_vec(vec![10, 20]);
        let b = Amount::from_vec(vec![5, 15, 25]);

        a += &b;

        assert_eq!(a.get(0), 15);
        assert_eq!(a.get(1), 35);
        assert_eq!(a.get(2), 25);
    }

    #[test]
    fn test_sub_assign() {
        let mut a = Amount::from_vec(vec![10, 20, 30]);
        let b = Amount::from_vec(vec![5, 15]);

        a -= &b;

        assert_eq!(a, Amount::from_vec(vec![5, 5, 30]));
    }

    #[test]
    fn test_eq_ignores_trailing_zeroes() {
        assert_eq!(Amount::from_vec(vec![1, 0]), Amount::from_vec(vec![1]));
        assert_ne!(Amount::from_vec(vec![1, 2]), Amount::from_vec(vec![1]));
    }

    #[test]
    fn test_fits_within() {
        let capacity = Amount::from_vec(vec![10, 5]);

        assert!(Amount::from_vec(vec![10, 5]).fits_within(&capacity));
        assert!(Amount::from_vec(vec![3]).fits_within(&capacity));
        assert!(!Amount::from_vec(vec![11, 0]).fits_within(&capacity));
        assert!(!Amount::from_vec(vec![0, 0, 1]).fits_within(&capacity));
    }

    #[test]
    fn test_max_with() {
        let mut a = Amount::from_vec(vec![1, 7]);
        a.max_with(&Amount::from_vec(vec![4, 2, 3]));

        assert_eq!(a, Amount::from_vec(vec![4, 7, 3]));
    }
}
