//! Monetary amounts in minor currency units.
//!
//! All amounts across the engine are integers in the currency's smallest unit
//! (e.g. cents). Arithmetic is checked; callers decide how to surface overflow.

use serde::{Deserialize, Serialize};

/// An amount in minor currency units (e.g. cents).
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: MinorUnits) -> Option<MinorUnits> {
        self.0.checked_add(other.0).map(MinorUnits)
    }

    pub fn checked_sub(self, other: MinorUnits) -> Option<MinorUnits> {
        self.0.checked_sub(other.0).map(MinorUnits)
    }

    /// Multiply by a basis-point rate, rounding half-up to the minor unit.
    ///
    /// `bps` is 1/100th of a percent: 250 bps = 2.5%. Intended for
    /// non-negative amounts (fee schedules validate their inputs first).
    pub fn percent_bps(self, bps: u32) -> Option<MinorUnits> {
        let numerator = (self.0 as i128).checked_mul(bps as i128)?;
        let rounded = (numerator + 5_000) / 10_000;
        i64::try_from(rounded).ok().map(MinorUnits)
    }
}

impl core::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MinorUnits> for i64 {
    fn from(value: MinorUnits) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn percent_bps_rounds_half_up() {
        // 2.5% of 101 = 2.525 -> 3
        assert_eq!(MinorUnits::new(101).percent_bps(250), Some(MinorUnits::new(3)));
        // 2.5% of 100 = 2.5 -> 3 (half rounds up)
        assert_eq!(MinorUnits::new(100).percent_bps(250), Some(MinorUnits::new(3)));
        // 2% of 100 = 2 exactly
        assert_eq!(MinorUnits::new(100).percent_bps(200), Some(MinorUnits::new(2)));
        // 2.4% of 100 = 2.4 -> 2 (below half rounds down)
        assert_eq!(MinorUnits::new(100).percent_bps(240), Some(MinorUnits::new(2)));
    }

    #[test]
    fn percent_bps_of_zero_is_zero() {
        assert_eq!(MinorUnits::ZERO.percent_bps(10_000), Some(MinorUnits::ZERO));
    }

    #[test]
    fn checked_arithmetic_detects_overflow() {
        let max = MinorUnits::new(i64::MAX);
        assert_eq!(max.checked_add(MinorUnits::new(1)), None);
        let min = MinorUnits::new(i64::MIN);
        assert_eq!(min.checked_sub(MinorUnits::new(1)), None);
    }

    proptest! {
        /// Property: for non-negative amounts the rounded fee never differs
        /// from the exact rational value by more than half a minor unit.
        #[test]
        fn percent_bps_is_within_half_unit(amount in 0i64..1_000_000_000i64, bps in 0u32..10_000u32) {
            let fee = MinorUnits::new(amount).percent_bps(bps).unwrap().value();
            let exact_times_2 = (amount as i128) * (bps as i128) * 2;
            let fee_times_2 = (fee as i128) * 10_000 * 2;
            let diff = (fee_times_2 - exact_times_2).abs();
            prop_assert!(diff <= 10_000);
        }

        /// Property: add then sub round-trips when no overflow occurs.
        #[test]
        fn add_sub_round_trip(a in -1_000_000i64..1_000_000i64, b in -1_000_000i64..1_000_000i64) {
            let a = MinorUnits::new(a);
            let b = MinorUnits::new(b);
            let sum = a.checked_add(b).unwrap();
            prop_assert_eq!(sum.checked_sub(b).unwrap(), a);
        }
    }
}
