use serde::{Deserialize, Serialize};

use payline_core::{DomainError, DomainResult, MinorUnits};

/// The balance record attached to a recipient.
///
/// All three balances are non-negative, and `withdrawable_amount` never
/// exceeds `amount`. The wallet is a value: mutations return a new wallet,
/// and the owning aggregate decides whether to adopt it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Total balance.
    pub amount: MinorUnits,
    /// Portion of the balance eligible for payout right now.
    pub withdrawable_amount: MinorUnits,
    /// Promotional/credit balance, not payable out.
    pub credit_balance: MinorUnits,
}

impl Wallet {
    /// A freshly registered recipient starts with an empty wallet.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Build a wallet from explicit balances, enforcing the invariants.
    pub fn new(
        amount: MinorUnits,
        withdrawable_amount: MinorUnits,
        credit_balance: MinorUnits,
    ) -> DomainResult<Self> {
        let wallet = Self {
            amount,
            withdrawable_amount,
            credit_balance,
        };
        wallet.check_invariants()?;
        Ok(wallet)
    }

    fn check_invariants(&self) -> DomainResult<()> {
        if self.amount.is_negative()
            || self.withdrawable_amount.is_negative()
            || self.credit_balance.is_negative()
        {
            return Err(DomainError::validation("wallet balances cannot be negative"));
        }
        if self.withdrawable_amount > self.amount {
            return Err(DomainError::validation(
                "withdrawable_amount cannot exceed amount",
            ));
        }
        Ok(())
    }

    /// Credit funds (external funding process): both the total and the
    /// withdrawable portion grow.
    pub fn credit(self, amount: MinorUnits) -> DomainResult<Wallet> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }
        let credited = Wallet {
            amount: self
                .amount
                .checked_add(amount)
                .ok_or_else(|| DomainError::validation("wallet balance overflow"))?,
            withdrawable_amount: self
                .withdrawable_amount
                .checked_add(amount)
                .ok_or_else(|| DomainError::validation("wallet balance overflow"))?,
            credit_balance: self.credit_balance,
        };
        credited.check_invariants()?;
        Ok(credited)
    }

    /// Debit funds for a payout.
    ///
    /// Fails with `InsufficientFunds` if the withdrawable portion cannot
    /// cover the amount; the total shrinks by the same amount.
    pub fn debit(self, amount: MinorUnits) -> DomainResult<Wallet> {
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }
        if amount > self.withdrawable_amount {
            return Err(DomainError::insufficient_funds(self.withdrawable_amount));
        }
        let debited = Wallet {
            amount: self
                .amount
                .checked_sub(amount)
                .ok_or_else(|| DomainError::validation("wallet balance underflow"))?,
            withdrawable_amount: self
                .withdrawable_amount
                .checked_sub(amount)
                .ok_or_else(|| DomainError::validation("wallet balance underflow"))?,
            credit_balance: self.credit_balance,
        };
        debited.check_invariants()?;
        Ok(debited)
    }

    /// Credit a previously debited amount back (payout failure refund).
    ///
    /// Same arithmetic as a funding credit.
    pub fn refund(self, amount: MinorUnits) -> DomainResult<Wallet> {
        self.credit(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(v: i64) -> MinorUnits {
        MinorUnits::new(v)
    }

    #[test]
    fn new_rejects_withdrawable_above_amount() {
        let err = Wallet::new(units(100), units(101), units(0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_rejects_negative_balances() {
        let err = Wallet::new(units(-1), units(0), units(0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn credit_grows_total_and_withdrawable() {
        let wallet = Wallet::zeroed().credit(units(500)).unwrap();
        assert_eq!(wallet.amount, units(500));
        assert_eq!(wallet.withdrawable_amount, units(500));
        assert_eq!(wallet.credit_balance, units(0));
    }

    #[test]
    fn debit_requires_withdrawable_cover() {
        let wallet = Wallet::new(units(1_000), units(300), units(0)).unwrap();
        match wallet.debit(units(301)) {
            Err(DomainError::InsufficientFunds { available }) => {
                assert_eq!(available, units(300));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn debit_then_refund_round_trips() {
        let wallet = Wallet::new(units(1_000), units(800), units(50)).unwrap();
        let debited = wallet.debit(units(300)).unwrap();
        assert_eq!(debited.amount, units(700));
        assert_eq!(debited.withdrawable_amount, units(500));

        let refunded = debited.refund(units(300)).unwrap();
        assert_eq!(refunded, wallet);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let wallet = Wallet::new(units(100), units(100), units(0)).unwrap();
        assert_eq!(wallet.credit(units(0)).unwrap_err(), DomainError::InvalidAmount);
        assert_eq!(wallet.debit(units(-5)).unwrap_err(), DomainError::InvalidAmount);
    }
}
