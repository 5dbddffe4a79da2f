//! Pre-built Test Fixtures
//!
//! Fixed, predictable values so test failures are reproducible.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{Identity, Lamports, PoolId};
use domain_policy::PolicyAmounts;
use once_cell::sync::Lazy;
use uuid::Uuid;

static GENESIS: Lazy<DateTime<Utc>> = Lazy::new(|| {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
        .single()
        .unwrap_or_default()
});

/// Fixed caller identities
pub struct IdentityFixtures;

impl IdentityFixtures {
    /// The identity that initializes pools in tests
    pub fn authority() -> Identity {
        Identity::from_uuid(Uuid::from_u128(0xA0))
    }

    /// A policy holder
    pub fn user() -> Identity {
        Identity::from_uuid(Uuid::from_u128(0xB0))
    }

    /// A second policy holder
    pub fn other_user() -> Identity {
        Identity::from_uuid(Uuid::from_u128(0xB1))
    }

    /// An identity with no role anywhere
    pub fn stranger() -> Identity {
        Identity::from_uuid(Uuid::from_u128(0xC0))
    }

    /// Pool used by single-pool tests
    pub fn pool_id() -> PoolId {
        PoolId::from_uuid(Uuid::from_u128(0x100))
    }
}

/// Standard amounts
pub struct AmountFixtures;

impl AmountFixtures {
    pub fn deposit() -> Lamports {
        Lamports::new(1000)
    }

    pub fn premium() -> Lamports {
        Lamports::new(100)
    }

    pub fn coverage() -> Lamports {
        Lamports::new(5000)
    }

    /// Deposit 1000, premium 100, coverage 5000
    pub fn standard_purchase() -> PolicyAmounts {
        PolicyAmounts {
            deposit: Self::deposit(),
            premium: Self::premium(),
            coverage: Self::coverage(),
        }
    }
}

/// Fixed timestamps
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Start time of every test clock
    pub fn genesis() -> DateTime<Utc> {
        *GENESIS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_are_distinct() {
        let ids = [
            IdentityFixtures::authority(),
            IdentityFixtures::user(),
            IdentityFixtures::other_user(),
            IdentityFixtures::stranger(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_standard_purchase_is_valid() {
        assert!(AmountFixtures::standard_purchase().validate().is_ok());
    }
}
