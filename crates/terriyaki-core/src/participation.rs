//! Per-(user, grind) accounting records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipateRecord {
    pub user_id: String,
    pub grind_id: String,
    pub missed_days: i64,
    pub total_penalty: i64,
    pub quitted: bool,
    pub quitted_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// Missed days and the penalty they add up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounting {
    pub missed_days: i64,
    pub total_penalty: i64,
}

impl Accounting {
    pub fn of(record: &ParticipateRecord) -> Self {
        Self {
            missed_days: record.missed_days,
            total_penalty: record.total_penalty,
        }
    }
}

/// Penalty charged for one missed day. Integer division; a grind without
/// days charges nothing.
pub fn daily_penalty(budget: i64, duration: i64) -> i64 {
    if duration <= 0 {
        0
    } else {
        budget / duration
    }
}

pub fn penalty_for(missed_days: i64, budget: i64, duration: i64) -> i64 {
    missed_days.max(0) * daily_penalty(budget, duration)
}

/// A participant's standing in a grind, as listed in overviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantStanding {
    pub user_id: String,
    pub missed_days: i64,
    pub total_penalty: i64,
    pub quitted: bool,
    pub quitted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn penalty_uses_integer_division() {
        assert_eq!(penalty_for(1, 90, 3), 30);
        assert_eq!(penalty_for(2, 100, 3), 66);
        assert_eq!(penalty_for(0, 90, 3), 0);
    }

    #[test]
    fn zero_duration_charges_nothing() {
        assert_eq!(daily_penalty(90, 0), 0);
    }

    proptest! {
        #[test]
        fn penalty_is_monotonic_in_missed_days(
            missed in 0i64..365,
            budget in 0i64..1_000_000,
            duration in 1i64..365,
        ) {
            prop_assert!(penalty_for(missed, budget, duration) <= penalty_for(missed + 1, budget, duration));
        }

        #[test]
        fn penalty_never_exceeds_budget(
            budget in 0i64..1_000_000,
            duration in 1i64..365,
            frac in 0.0f64..=1.0,
        ) {
            let missed = ((duration as f64) * frac) as i64;
            prop_assert!(penalty_for(missed, budget, duration) <= budget);
        }
    }
}
