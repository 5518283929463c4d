//! Subscription record and plan-derived allowances.

use crate::Plan;
use crate::primitives::{BASIC_20_VOICE_SECONDS, PRO_40_VOICE_SECONDS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing state of a learner.
///
/// `plan` is only ever set while `active` is true; the transitions that keep
/// this invariant live on `UserState`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    pub active: bool,
    pub plan: Option<Plan>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Daily voice allowance in seconds for this subscription.
    ///
    /// Pure function of `active` and `plan`.
    #[must_use]
    pub fn voice_limit_seconds(&self) -> u32 {
        if !self.active {
            return 0;
        }
        match self.plan {
            Some(Plan::Basic20) => BASIC_20_VOICE_SECONDS,
            Some(Plan::Pro40) => PRO_40_VOICE_SECONDS,
            None => 0,
        }
    }

    /// Whether the externally granted period still covers `now`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.active && self.valid_until.is_none_or(|until| now < until)
    }
}
