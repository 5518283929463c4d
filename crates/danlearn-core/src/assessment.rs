//! # Level Assessment
//!
//! Maps the scores gathered during the diagnostic to a level and a
//! confidence.
//!
//! | Average score        | Level | Confidence |
//! |----------------------|-------|------------|
//! | `< 0.4`              | A2    | medium     |
//! | `0.4 <= avg < 0.7`   | PD2   | high       |
//! | `>= 0.7`             | PD3   | high       |
//!
//! The average is an integer floor over thousandths. A floored average is
//! below a threshold exactly when the true average is, so boundary values
//! classify the same way they would with exact arithmetic.

use crate::primitives::{PD2_THRESHOLD, PD3_THRESHOLD};
use crate::{Confidence, Level, Score};

// =============================================================================
// LEVEL ASSESSOR
// =============================================================================

/// Level Assessor - Pure function from scores to placement.
#[derive(Debug, Clone, Copy)]
pub struct LevelAssessor {
    pd2_threshold: u16,
    pd3_threshold: u16,
}

impl Default for LevelAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelAssessor {
    /// Create a new assessor with default thresholds.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_thresholds(PD2_THRESHOLD, PD3_THRESHOLD)
    }

    /// Thresholds in thousandths.
    const fn with_thresholds(pd2: u16, pd3: u16) -> Self {
        Self {
            pd2_threshold: pd2,
            pd3_threshold: pd3,
        }
    }

    /// Floor of the arithmetic mean. An empty slice averages to zero.
    #[must_use]
    pub fn average(scores: &[Score]) -> Score {
        if scores.is_empty() {
            return Score::ZERO;
        }
        let sum: u64 = scores.iter().map(|s| u64::from(s.thousandths())).sum();
        let mean = sum / scores.len() as u64;
        Score::from_thousandths(mean as u16)
    }

    /// Classify an average score.
    #[must_use]
    pub fn assess(&self, average: Score) -> (Level, Confidence) {
        let avg = average.thousandths();
        if avg < self.pd2_threshold {
            (Level::A2, Confidence::Medium)
        } else if avg < self.pd3_threshold {
            (Level::PD2, Confidence::High)
        } else {
            (Level::PD3, Confidence::High)
        }
    }

    /// Average and classify in one step.
    #[must_use]
    pub fn place(&self, scores: &[Score]) -> (Level, Confidence, Score) {
        let average = Self::average(scores);
        let (level, confidence) = self.assess(average);
        (level, confidence, average)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[u16]) -> Vec<Score> {
        values.iter().copied().map(Score::from_thousandths).collect()
    }

    #[test]
    fn empty_scores_place_at_a2() {
        let (level, confidence, avg) = LevelAssessor::new().place(&[]);
        assert_eq!(level, Level::A2);
        assert_eq!(confidence, Confidence::Medium);
        assert_eq!(avg, Score::ZERO);
    }

    #[test]
    fn boundaries_are_exact() {
        let assessor = LevelAssessor::new();
        assert_eq!(assessor.place(&scores(&[399])).0, Level::A2);
        assert_eq!(assessor.place(&scores(&[400])).0, Level::PD2);
        assert_eq!(assessor.place(&scores(&[699])).0, Level::PD2);
        assert_eq!(assessor.place(&scores(&[700])).0, Level::PD3);
    }

    #[test]
    fn average_of_mixed_scores() {
        // (800 + 700 + 600 + 900) / 4 = 750
        let (level, confidence, avg) = LevelAssessor::new().place(&scores(&[800, 700, 600, 900]));
        assert_eq!(avg.thousandths(), 750);
        assert_eq!(level, Level::PD3);
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn floor_does_not_cross_threshold() {
        // True mean 0.3995 floors to 399 and stays below PD2.
        let (level, _, avg) = LevelAssessor::new().place(&scores(&[399, 400]));
        assert_eq!(avg.thousandths(), 399);
        assert_eq!(level, Level::A2);
    }

    #[test]
    fn custom_thresholds() {
        let assessor = LevelAssessor::with_thresholds(100, 200);
        assert_eq!(assessor.assess(Score::from_thousandths(150)).0, Level::PD2);
        assert_eq!(assessor.assess(Score::from_thousandths(250)).0, Level::PD3);
    }
}
