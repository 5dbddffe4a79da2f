//! Protocol configuration
//!
//! Settings that change how the state machine treats refunds and solvency.
//! Loaded by the service layer from the environment. The defaults refund the
//! whole deposit and check solvency only when a claim is paid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CoreError, Lamports};
use domain_policy::InsurancePolicy;

/// Default coverage term in days
pub const DEFAULT_COVERAGE_TERM_DAYS: u32 = 30;

/// How much of the deposit is returned when a policy leaves the active state
/// without a claim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    /// Return the whole deposit; the premium is kept
    #[default]
    FullDeposit,
    /// Return the deposit in proportion to the unused part of the term
    ProRata,
}

impl RefundPolicy {
    /// Computes the refund owed on `policy` at `at`
    pub fn refund_for(&self, policy: &InsurancePolicy, at: DateTime<Utc>) -> Lamports {
        match self {
            RefundPolicy::FullDeposit => policy.deposit_amount(),
            RefundPolicy::ProRata => {
                let term = policy.term();
                let total = term.length().num_seconds().max(0) as u64;
                let remaining = term.remaining(at).num_seconds().max(0) as u64;
                policy.deposit_amount().scale(remaining, total)
            }
        }
    }
}

/// When the pool must be able to back new coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseSolvency {
    /// Accept any purchase; solvency is enforced when a claim is paid
    #[default]
    Deferred,
    /// Reject purchases and coverage increases the balance cannot back
    Strict,
}

/// Protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub refund_policy: RefundPolicy,
    #[serde(default)]
    pub purchase_solvency: PurchaseSolvency,
    #[serde(default = "default_coverage_term_days")]
    pub coverage_term_days: u32,
}

fn default_coverage_term_days() -> u32 {
    DEFAULT_COVERAGE_TERM_DAYS
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            refund_policy: RefundPolicy::default(),
            purchase_solvency: PurchaseSolvency::default(),
            coverage_term_days: DEFAULT_COVERAGE_TERM_DAYS,
        }
    }
}

impl ProtocolConfig {
    pub fn with_refund_policy(mut self, refund_policy: RefundPolicy) -> Self {
        self.refund_policy = refund_policy;
        self
    }

    pub fn with_purchase_solvency(mut self, purchase_solvency: PurchaseSolvency) -> Self {
        self.purchase_solvency = purchase_solvency;
        self
    }

    pub fn with_coverage_term_days(mut self, days: u32) -> Self {
        self.coverage_term_days = days;
        self
    }

    /// Checks the configuration for values the protocol cannot run with
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` for a zero or unreasonably long term
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.coverage_term_days == 0 {
            return Err(CoreError::configuration("coverage_term_days", "must be positive"));
        }
        if self.coverage_term_days > 36_500 {
            return Err(CoreError::configuration(
                "coverage_term_days",
                "must not exceed 36500 days",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_kernel::{CoverageTerm, Identity, PolicyId, PoolId};
    use domain_policy::PolicyAmounts;

    fn policy(start: DateTime<Utc>) -> InsurancePolicy {
        InsurancePolicy::purchase(
            PolicyId::new(),
            PoolId::new(),
            Identity::new(),
            PolicyAmounts::new(1000, 100, 5000),
            CoverageTerm::starting_at(start, 30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.refund_policy, RefundPolicy::FullDeposit);
        assert_eq!(config.purchase_solvency, PurchaseSolvency::Deferred);
        assert_eq!(config.coverage_term_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_term_invalid() {
        assert!(ProtocolConfig::default().with_coverage_term_days(0).validate().is_err());
    }

    #[test]
    fn test_full_deposit_refund_ignores_time() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let policy = policy(start);
        let refund = RefundPolicy::FullDeposit.refund_for(&policy, start + Duration::days(29));
        assert_eq!(refund, Lamports::new(1000));
    }

    #[test]
    fn test_pro_rata_refund() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let policy = policy(start);
        assert_eq!(RefundPolicy::ProRata.refund_for(&policy, start), Lamports::new(1000));
        assert_eq!(
            RefundPolicy::ProRata.refund_for(&policy, start + Duration::days(10)),
            Lamports::new(666)
        );
        assert_eq!(
            RefundPolicy::ProRata.refund_for(&policy, start + Duration::days(30)),
            Lamports::ZERO
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{"refund_policy":"pro_rata"}"#).unwrap();
        assert_eq!(config.refund_policy, RefundPolicy::ProRata);
        assert_eq!(config.coverage_term_days, 30);
    }
}
