//! # Fixed Primitives
//!
//! Hardcoded constants for the Danlearn CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Scores are integer thousandths (`0..=1000`), so every threshold below is
//! an exact integer comparison.

// =============================================================================
// DIAGNOSTIC
// =============================================================================

/// Number of production tasks in the placement diagnostic.
pub const MAX_DIAGNOSTIC_STEPS: u8 = 4;

/// Scale of the integer score representation (1.0 == `SCORE_SCALE`).
pub const SCORE_SCALE: u16 = 1000;

/// Average at or above which a learner is placed at PD2 (0.4).
pub const PD2_THRESHOLD: u16 = 400;

/// Average at or above which a learner is placed at PD3 (0.7).
pub const PD3_THRESHOLD: u16 = 700;

/// Score substituted when the evaluator cannot produce one (0.5).
pub const NEUTRAL_SCORE: u16 = 500;

/// Maximum accepted length of a free-text answer, in bytes.
pub const MAX_ANSWER_TEXT_LENGTH: usize = 8 * 1024;

// =============================================================================
// USAGE & PLANS
// =============================================================================

/// Daily text steps before reinforcement mode kicks in.
pub const TEXT_SOFT_LIMIT: u32 = 30;

/// Daily voice allowance for `Plan::Basic20` (20 minutes).
pub const BASIC_20_VOICE_SECONDS: u32 = 20 * 60;

/// Daily voice allowance for `Plan::Pro40` (40 minutes).
pub const PRO_40_VOICE_SECONDS: u32 = 40 * 60;

/// Length of a subscription period granted by a billing event.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for user identifiers, in bytes.
pub const MAX_USER_ID_LENGTH: usize = 128;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"DNLS";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_ordered() {
        assert!(PD2_THRESHOLD < NEUTRAL_SCORE);
        assert!(NEUTRAL_SCORE < PD3_THRESHOLD);
        assert!(PD3_THRESHOLD <= SCORE_SCALE);
    }

    #[test]
    fn plan_allowances_in_minutes() {
        assert_eq!(BASIC_20_VOICE_SECONDS, 1200);
        assert_eq!(PRO_40_VOICE_SECONDS, 2400);
    }
}
