//! Diagnostic progress record.

use crate::primitives::MAX_DIAGNOSTIC_STEPS;
use crate::{Level, Score};
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};

/// Progress of the placement diagnostic.
///
/// `steps_completed <= max_steps` always holds; `estimated_level` is only
/// set once the diagnostic has been finalized. `max_steps` is fixed: a
/// stored value is ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticState {
    pub active: bool,
    #[serde(deserialize_with = "clamped_steps")]
    pub steps_completed: u8,
    #[serde(deserialize_with = "fixed_max_steps")]
    pub max_steps: u8,
    pub estimated_level: Option<Level>,
    /// Scores in submission order. Steps without a score are absent.
    pub scores: Vec<Score>,
}

impl Default for DiagnosticState {
    fn default() -> Self {
        Self {
            active: false,
            steps_completed: 0,
            max_steps: MAX_DIAGNOSTIC_STEPS,
            estimated_level: None,
            scores: Vec::new(),
        }
    }
}

impl DiagnosticState {
    /// Whether every step has been answered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.steps_completed >= self.max_steps
    }

    /// The step the next answer belongs to (1-based).
    #[must_use]
    pub fn current_step(&self) -> u8 {
        self.steps_completed.saturating_add(1)
    }
}

fn clamped_steps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(u8::deserialize(deserializer)?.min(MAX_DIAGNOSTIC_STEPS))
}

fn fixed_max_steps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(MAX_DIAGNOSTIC_STEPS)
}
