use serde::{Deserialize, Serialize};

use payline_core::{DomainError, DomainResult, MinorUnits};

/// Expected settlement window for a payout method, in business days.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTime {
    pub min_days: u8,
    pub max_days: u8,
}

/// Fee schedule for a payout method: a fixed component plus a percentage
/// component expressed in basis points (1 bps = 0.01%).
///
/// Either component may be zero, giving pure-fixed or pure-percentage fees.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fixed: MinorUnits,
    pub percent_bps: u32,
}

impl FeeSchedule {
    pub const fn fixed(fee: i64) -> Self {
        Self {
            fixed: MinorUnits::new(fee),
            percent_bps: 0,
        }
    }

    pub const fn percentage(bps: u32) -> Self {
        Self {
            fixed: MinorUnits::ZERO,
            percent_bps: bps,
        }
    }

    pub const fn combined(fee: i64, bps: u32) -> Self {
        Self {
            fixed: MinorUnits::new(fee),
            percent_bps: bps,
        }
    }

    /// Compute the fee for a payout amount.
    ///
    /// Pure function of the amount and this schedule. The percentage part
    /// rounds half-up to the minor unit.
    pub fn fee_for(&self, amount: MinorUnits) -> DomainResult<MinorUnits> {
        let percentage = amount
            .percent_bps(self.percent_bps)
            .ok_or_else(|| DomainError::validation("fee computation overflow"))?;
        self.fixed
            .checked_add(percentage)
            .ok_or_else(|| DomainError::validation("fee computation overflow"))
    }
}

/// One catalog entry: a named payout channel and its constraints.
///
/// Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutMethodSpec {
    pub name: String,
    pub fee: FeeSchedule,
    pub min_amount: MinorUnits,
    pub max_amount: MinorUnits,
    pub processing_time: ProcessingTime,
}

impl PayoutMethodSpec {
    /// Check an amount against this method's inclusive `[min, max]` range.
    pub fn check_amount(&self, amount: MinorUnits) -> DomainResult<()> {
        if amount < self.min_amount {
            return Err(DomainError::AmountBelowMinimum {
                minimum: self.min_amount,
            });
        }
        if amount > self.max_amount {
            return Err(DomainError::AmountAboveMaximum {
                maximum: self.max_amount,
            });
        }
        Ok(())
    }
}

/// The payout method registry.
///
/// Constructed once at process start and shared read-only (e.g. behind an
/// `Arc`). There is intentionally no runtime mutation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRegistry {
    methods: Vec<PayoutMethodSpec>,
}

impl MethodRegistry {
    /// Build a registry from externally supplied specs, validating each entry.
    pub fn from_specs(specs: Vec<PayoutMethodSpec>) -> DomainResult<Self> {
        let mut registry = MethodRegistry {
            methods: Vec::with_capacity(specs.len()),
        };

        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(DomainError::validation("method name cannot be empty"));
            }
            if !spec.min_amount.is_positive() {
                return Err(DomainError::validation("method min_amount must be positive"));
            }
            if spec.max_amount < spec.min_amount {
                return Err(DomainError::validation(
                    "method max_amount must be >= min_amount",
                ));
            }
            if spec.fee.fixed.is_negative() {
                return Err(DomainError::validation("method fixed fee cannot be negative"));
            }
            if registry.lookup(&spec.name).is_ok() {
                return Err(DomainError::DuplicateId);
            }
            registry.methods.push(spec);
        }

        Ok(registry)
    }

    /// The built-in catalog covering the supported payout channels.
    pub fn builtin() -> Self {
        MethodRegistry {
            methods: vec![
                PayoutMethodSpec {
                    name: "ach".to_string(),
                    fee: FeeSchedule::fixed(25),
                    min_amount: MinorUnits::new(100),
                    max_amount: MinorUnits::new(1_000_000),
                    processing_time: ProcessingTime {
                        min_days: 1,
                        max_days: 3,
                    },
                },
                PayoutMethodSpec {
                    name: "paypal".to_string(),
                    fee: FeeSchedule::combined(30, 290),
                    min_amount: MinorUnits::new(100),
                    max_amount: MinorUnits::new(500_000),
                    processing_time: ProcessingTime {
                        min_days: 0,
                        max_days: 1,
                    },
                },
                PayoutMethodSpec {
                    name: "venmo".to_string(),
                    fee: FeeSchedule::percentage(175),
                    min_amount: MinorUnits::new(100),
                    max_amount: MinorUnits::new(300_000),
                    processing_time: ProcessingTime {
                        min_days: 0,
                        max_days: 1,
                    },
                },
                PayoutMethodSpec {
                    name: "cash_app".to_string(),
                    fee: FeeSchedule::percentage(150),
                    min_amount: MinorUnits::new(100),
                    max_amount: MinorUnits::new(250_000),
                    processing_time: ProcessingTime {
                        min_days: 0,
                        max_days: 1,
                    },
                },
                PayoutMethodSpec {
                    name: "intl_bank".to_string(),
                    fee: FeeSchedule::fixed(1_500),
                    min_amount: MinorUnits::new(1_000),
                    max_amount: MinorUnits::new(2_500_000),
                    processing_time: ProcessingTime {
                        min_days: 3,
                        max_days: 7,
                    },
                },
            ],
        }
    }

    /// Find a method by name (case-insensitive).
    pub fn lookup(&self, name: &str) -> DomainResult<&PayoutMethodSpec> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or(DomainError::UnknownMethod)
    }

    /// Validate an amount against a named method's constraints.
    ///
    /// Fails with `UnknownMethod`, `AmountBelowMinimum`, or
    /// `AmountAboveMaximum`; boundaries are inclusive.
    pub fn validate(&self, name: &str, amount: MinorUnits) -> DomainResult<()> {
        self.lookup(name)?.check_amount(amount)
    }

    /// Compute the fee a named method charges for an amount.
    pub fn fee_for(&self, name: &str, amount: MinorUnits) -> DomainResult<MinorUnits> {
        self.lookup(name)?.fee.fee_for(amount)
    }

    /// All catalog entries, in catalog order.
    pub fn list(&self) -> &[PayoutMethodSpec] {
        &self.methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_spec(name: &str, min: i64, max: i64) -> PayoutMethodSpec {
        PayoutMethodSpec {
            name: name.to_string(),
            fee: FeeSchedule::fixed(10),
            min_amount: MinorUnits::new(min),
            max_amount: MinorUnits::new(max),
            processing_time: ProcessingTime {
                min_days: 1,
                max_days: 2,
            },
        }
    }

    #[test]
    fn lookup_unknown_method_fails() {
        let registry = MethodRegistry::builtin();
        let err = registry.lookup("wire_pigeon").unwrap_err();
        assert_eq!(err, DomainError::UnknownMethod);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = MethodRegistry::builtin();
        assert_eq!(registry.lookup("ACH").unwrap().name, "ach");
    }

    #[test]
    fn validate_accepts_boundaries_inclusive() {
        let registry = MethodRegistry::from_specs(vec![test_spec("m", 10, 1_000)]).unwrap();

        assert!(registry.validate("m", MinorUnits::new(10)).is_ok());
        assert!(registry.validate("m", MinorUnits::new(1_000)).is_ok());

        match registry.validate("m", MinorUnits::new(9)) {
            Err(DomainError::AmountBelowMinimum { minimum }) => {
                assert_eq!(minimum, MinorUnits::new(10));
            }
            other => panic!("expected AmountBelowMinimum, got {other:?}"),
        }
        match registry.validate("m", MinorUnits::new(1_001)) {
            Err(DomainError::AmountAboveMaximum { maximum }) => {
                assert_eq!(maximum, MinorUnits::new(1_000));
            }
            other => panic!("expected AmountAboveMaximum, got {other:?}"),
        }
    }

    #[test]
    fn combined_fee_adds_fixed_and_rounded_percentage() {
        // paypal: 30 fixed + 2.9%; 2.9% of 10_000 = 290 exactly.
        let registry = MethodRegistry::builtin();
        assert_eq!(
            registry.fee_for("paypal", MinorUnits::new(10_000)).unwrap(),
            MinorUnits::new(320)
        );
        // 2.9% of 101 = 2.929 -> 3, plus the 30 fixed.
        assert_eq!(
            registry.fee_for("paypal", MinorUnits::new(101)).unwrap(),
            MinorUnits::new(33)
        );
    }

    #[test]
    fn from_specs_rejects_duplicate_names() {
        let err = MethodRegistry::from_specs(vec![
            test_spec("m", 10, 100),
            test_spec("M", 10, 100),
        ])
        .unwrap_err();
        assert_eq!(err, DomainError::DuplicateId);
    }

    #[test]
    fn from_specs_rejects_inverted_range() {
        let err = MethodRegistry::from_specs(vec![test_spec("m", 100, 10)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        /// Property: validate accepts exactly the amounts inside [min, max].
        #[test]
        fn validate_matches_inclusive_range(
            amount in 0i64..10_000i64,
            min in 1i64..5_000i64,
            span in 0i64..5_000i64,
        ) {
            let max = min + span;
            let registry = MethodRegistry::from_specs(vec![test_spec("m", min, max)]).unwrap();
            let amount = MinorUnits::new(amount);

            let accepted = registry.validate("m", amount).is_ok();
            let in_range = amount >= MinorUnits::new(min) && amount <= MinorUnits::new(max);
            prop_assert_eq!(accepted, in_range);
        }
    }
}
