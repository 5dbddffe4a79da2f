//! Time handling for coverage terms
//!
//! The protocol never reads the wall clock directly. Operations receive the
//! current time from a [`Clock`], which lets tests move time forward to
//! exercise expiry without sleeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Invalid term length: {0} days")]
    InvalidTermLength(i64),
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay tooling
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The period during which a policy provides coverage
///
/// The term is half-open: coverage is in force from `start` (inclusive) up to
/// `end` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageTerm {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CoverageTerm {
    /// Creates a term of `days` days beginning at `start`
    ///
    /// # Errors
    ///
    /// Returns `TemporalError::InvalidTermLength` if `days` is not positive
    pub fn starting_at(start: DateTime<Utc>, days: i64) -> Result<Self, TemporalError> {
        if days <= 0 {
            return Err(TemporalError::InvalidTermLength(days));
        }
        let end = start
            .checked_add_signed(Duration::days(days))
            .ok_or(TemporalError::InvalidTermLength(days))?;
        Ok(Self { start, end })
    }

    /// Creates a term from explicit bounds
    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start >= end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// Returns true once the term is over
    pub fn has_ended(&self, at: DateTime<Utc>) -> bool {
        at >= self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Time left in the term, clamped to `[0, length]`
    pub fn remaining(&self, at: DateTime<Utc>) -> Duration {
        if at <= self.start {
            self.length()
        } else if at >= self.end {
            Duration::zero()
        } else {
            self.end - at
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_term_of_thirty_days() {
        let term = CoverageTerm::starting_at(t0(), 30).unwrap();
        assert_eq!(term.length(), Duration::days(30));
        assert!(term.contains(t0()));
        assert!(!term.contains(term.end));
        assert!(term.has_ended(term.end));
    }

    #[test]
    fn test_term_rejects_non_positive_days() {
        assert_eq!(
            CoverageTerm::starting_at(t0(), 0),
            Err(TemporalError::InvalidTermLength(0))
        );
    }

    #[test]
    fn test_bounded_rejects_inverted_period() {
        assert!(CoverageTerm::bounded(t0(), t0()).is_err());
    }

    #[test]
    fn test_remaining_is_clamped() {
        let term = CoverageTerm::starting_at(t0(), 10).unwrap();
        assert_eq!(term.remaining(t0() - Duration::days(1)), Duration::days(10));
        assert_eq!(term.remaining(t0() + Duration::days(4)), Duration::days(6));
        assert_eq!(term.remaining(t0() + Duration::days(11)), Duration::zero());
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance(Duration::hours(3));
        assert_eq!(other.now(), t0() + Duration::hours(3));
        other.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
