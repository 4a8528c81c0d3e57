// src/models/usage_ledger.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

use crate::config::DAILY_FREE_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

/// Remaining daily allowance. Serialized as a number, or the literal string
/// "unlimited" for premium plans - the wire format clients already consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Limited(i64),
    Unlimited,
}

impl Serialize for Remaining {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Remaining::Limited(n) => serializer.serialize_i64(*n),
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Represents the 'usage_ledgers' table: per-student AI usage counters.
/// Created lazily on first use, never deleted except with the student.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLedger {
    pub student_id: i64,
    pub plan: Plan,
    pub daily_tokens_used: i64,
    pub last_reset_date: NaiveDate,
    pub premium_expiry_date: Option<DateTime<Utc>>,
    pub total_tokens_used: i64,
}

impl UsageLedger {
    /// Applies day-rollover and premium-expiry rules in place.
    ///
    /// Returns true if anything changed and the row needs persisting.
    /// Calling this twice with the same `now` is a no-op the second time.
    pub fn apply_rollover(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        let today = now.date_naive();
        if self.last_reset_date != today {
            self.daily_tokens_used = 0;
            self.last_reset_date = today;
            changed = true;
        }

        if self.plan == Plan::Premium {
            match self.premium_expiry_date {
                Some(expiry) if expiry < now => {
                    self.plan = Plan::Free;
                    self.premium_expiry_date = None;
                    changed = true;
                }
                _ => {}
            }
        }

        changed
    }

    pub fn can_use_ai(&self) -> bool {
        self.plan == Plan::Premium || self.daily_tokens_used < DAILY_FREE_LIMIT
    }

    pub fn remaining(&self) -> Remaining {
        match self.plan {
            Plan::Premium => Remaining::Unlimited,
            Plan::Free => Remaining::Limited((DAILY_FREE_LIMIT - self.daily_tokens_used).max(0)),
        }
    }
}
