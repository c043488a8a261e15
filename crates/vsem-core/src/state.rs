use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Carbon held in the three ecosystem compartments.
///
/// unit: kg C / m^2
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pools {
    pub vegetation: FloatValue,
    pub root: FloatValue,
    pub soil: FloatValue,
}

impl Pools {
    pub fn new(vegetation: FloatValue, root: FloatValue, soil: FloatValue) -> Self {
        Self {
            vegetation,
            root,
            soil,
        }
    }

    /// Total ecosystem carbon.
    pub fn total(&self) -> FloatValue {
        self.vegetation + self.root + self.soil
    }

    /// Whether any pool is below zero.
    pub fn any_negative(&self) -> bool {
        self.vegetation < 0.0 || self.root < 0.0 || self.soil < 0.0
    }

    /// Whether every pool is neither infinite nor NaN.
    pub fn is_finite(&self) -> bool {
        self.vegetation.is_finite() && self.root.is_finite() && self.soil.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_non_finite_pools_are_detected() {
        let pools = Pools::new(-0.5, 2.0, -1e-12);
        assert!(pools.any_negative());
        assert!(pools.is_finite());
        assert!(!Pools::new(3.0, 3.0, 15.0).any_negative());

        assert!(!Pools::new(f64::INFINITY, 0.0, 0.0).is_finite());
        assert!(!Pools::new(0.0, 0.0, f64::NAN).is_finite());
    }

    #[test]
    fn total_sums_pools() {
        assert_eq!(Pools::new(3.0, 3.0, 15.0).total(), 21.0);
    }
}
