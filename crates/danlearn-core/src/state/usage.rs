//! Daily usage quota record.
//!
//! Counters are monotone within a calendar day and use saturating
//! arithmetic. Rollover is decided by `UserState::ensure_usage_for_today`.

use crate::primitives::TEXT_SOFT_LIMIT;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Voice-minute accounting for one day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceUsage {
    pub seconds_used: u32,
    pub limit_seconds: u32,
    pub exhausted: bool,
}

/// Text-step accounting for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextUsage {
    pub steps_used: u32,
    pub soft_limit: u32,
    pub reinforcement_mode: bool,
}

impl Default for TextUsage {
    fn default() -> Self {
        Self {
            steps_used: 0,
            soft_limit: TEXT_SOFT_LIMIT,
            reinforcement_mode: false,
        }
    }
}

/// Usage counters for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyUsage {
    /// Calendar day in the reference timezone (ISO `YYYY-MM-DD`).
    pub date: NaiveDate,
    pub voice: VoiceUsage,
    pub text: TextUsage,
}

impl DailyUsage {
    /// Zeroed counters for `date` with the given voice allowance.
    #[must_use]
    pub fn fresh(date: NaiveDate, voice_limit_seconds: u32) -> Self {
        Self {
            date,
            voice: VoiceUsage {
                seconds_used: 0,
                limit_seconds: voice_limit_seconds,
                exhausted: false,
            },
            text: TextUsage::default(),
        }
    }

    /// Add consumed voice seconds.
    ///
    /// With a zero allowance any voice use exhausts the day.
    pub(crate) fn record_voice(&mut self, seconds: u32) {
        self.voice.seconds_used = self.voice.seconds_used.saturating_add(seconds);
        if self.voice.seconds_used >= self.voice.limit_seconds {
            self.voice.exhausted = true;
        }
    }

    /// Count one text step.
    pub(crate) fn record_text_step(&mut self) {
        self.text.steps_used = self.text.steps_used.saturating_add(1);
        if self.text.steps_used >= self.text.soft_limit {
            self.text.reinforcement_mode = true;
        }
    }

    /// Replace the voice allowance, leaving `seconds_used` untouched.
    pub(crate) fn set_voice_limit(&mut self, limit_seconds: u32) {
        self.voice.limit_seconds = limit_seconds;
        if limit_seconds > 0 {
            self.voice.exhausted = self.voice.seconds_used >= limit_seconds;
        }
    }

    /// Voice seconds left today.
    #[must_use]
    pub fn voice_seconds_remaining(&self) -> u32 {
        self.voice.limit_seconds.saturating_sub(self.voice.seconds_used)
    }
}
