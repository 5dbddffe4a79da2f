//! Integer amounts in the protocol's native unit
//!
//! All balances, deposits, premiums and coverage limits are whole numbers of
//! lamports. Arithmetic is checked: an operation that would overflow or go
//! below zero returns an [`AmountError`] instead of wrapping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Errors that can occur during amount arithmetic
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("Overflow: {lhs} + {rhs} exceeds the maximum amount")]
    Overflow { lhs: u64, rhs: u64 },

    #[error("Underflow: cannot subtract {rhs} from {lhs}")]
    Underflow { lhs: u64, rhs: u64 },
}

/// A non-negative amount of lamports
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Lamports = Lamports(0);
    pub const MAX: Lamports = Lamports(u64::MAX);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Overflow` if the sum does not fit in a u64
    pub fn checked_add(self, rhs: Lamports) -> Result<Lamports, AmountError> {
        self.0
            .checked_add(rhs.0)
            .map(Lamports)
            .ok_or(AmountError::Overflow { lhs: self.0, rhs: rhs.0 })
    }

    /// Subtracts `rhs` from this amount
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Underflow` if `rhs` is larger than `self`
    pub fn checked_sub(self, rhs: Lamports) -> Result<Lamports, AmountError> {
        self.0
            .checked_sub(rhs.0)
            .map(Lamports)
            .ok_or(AmountError::Underflow { lhs: self.0, rhs: rhs.0 })
    }

    pub fn saturating_sub(self, rhs: Lamports) -> Lamports {
        Lamports(self.0.saturating_sub(rhs.0))
    }

    /// Scales the amount by `numerator / denominator`, rounding down
    ///
    /// The intermediate product is computed in u128 so it cannot overflow.
    /// A zero denominator yields zero.
    pub fn scale(self, numerator: u64, denominator: u64) -> Lamports {
        if denominator == 0 {
            return Lamports::ZERO;
        }
        let scaled = (self.0 as u128 * numerator as u128) / denominator as u128;
        Lamports(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    /// Sums a sequence of amounts, failing on overflow
    pub fn checked_sum<I>(amounts: I) -> Result<Lamports, AmountError>
    where
        I: IntoIterator<Item = Lamports>,
    {
        amounts
            .into_iter()
            .try_fold(Lamports::ZERO, |acc, x| acc.checked_add(x))
    }

    /// Converts to SOL for display purposes
    pub fn to_sol(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(LAMPORTS_PER_SOL)
    }
}

impl From<u64> for Lamports {
    fn from(value: u64) -> Self {
        Lamports(value)
    }
}

impl From<Lamports> for u64 {
    fn from(value: Lamports) -> u64 {
        value.0
    }
}

impl From<Lamports> for Decimal {
    fn from(value: Lamports) -> Decimal {
        Decimal::from(value.0)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lamports", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_add_overflow() {
        let err = Lamports::MAX.checked_add(Lamports::new(1)).unwrap_err();
        assert_eq!(err, AmountError::Overflow { lhs: u64::MAX, rhs: 1 });
    }

    #[test]
    fn test_checked_sub_underflow() {
        let err = Lamports::new(5).checked_sub(Lamports::new(6)).unwrap_err();
        assert!(matches!(err, AmountError::Underflow { .. }));
    }

    #[test]
    fn test_scale_rounds_down() {
        assert_eq!(Lamports::new(1000).scale(1, 3), Lamports::new(333));
        assert_eq!(Lamports::new(1000).scale(0, 3), Lamports::ZERO);
        assert_eq!(Lamports::new(1000).scale(1, 0), Lamports::ZERO);
    }

    #[test]
    fn test_scale_does_not_overflow_intermediate() {
        let scaled = Lamports::MAX.scale(u64::MAX, u64::MAX);
        assert_eq!(scaled, Lamports::MAX);
    }

    #[test]
    fn test_to_sol() {
        assert_eq!(Lamports::new(1_500_000_000).to_sol(), dec!(1.5));
        assert_eq!(Lamports::new(1000).to_sol(), dec!(0.000001));
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Lamports::new(1), Lamports::new(2), Lamports::new(3)];
        assert_eq!(Lamports::checked_sum(amounts), Ok(Lamports::new(6)));

        let overflow = [Lamports::MAX, Lamports::new(1)];
        assert!(Lamports::checked_sum(overflow).is_err());
    }
}
