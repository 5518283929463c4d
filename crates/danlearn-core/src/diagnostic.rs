//! # Diagnostic Workflow
//!
//! The four-step placement diagnostic as a pure state machine:
//!
//! ```text
//! NOT_STARTED --start--> ACTIVE(step 1) --turn--> ... ACTIVE(step 4) --turn--> FINALIZED
//! ```
//!
//! A turn is split in two so the caller can score the answer without holding
//! any lock on the record:
//!
//! 1. [`plan_turn`] reads the record and names the task being answered.
//! 2. The caller scores the answer text against that task (or not).
//! 3. [`complete_turn`] advances the record and finalizes after step 4.
//!
//! Neither half touches daily usage.

use crate::assessment::LevelAssessor;
use crate::clock::Clock;
use crate::state::{AnswerMeta, UserState};
use crate::{Confidence, Level, Score};
use serde::{Deserialize, Serialize};

// =============================================================================
// TASK TABLE
// =============================================================================

/// One fixed diagnostic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticTask {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub level: &'static str,
    pub focus: &'static str,
    pub instruction: &'static str,
}

/// Tasks by position; step `n` answers `DIAGNOSTIC_TASKS[n - 1]`.
pub const DIAGNOSTIC_TASKS: [DiagnosticTask; 4] = [
    DiagnosticTask {
        kind: "production",
        level: "A2",
        focus: "personal",
        instruction: "Write 4–8 sentences about yourself in Danish.",
    },
    DiagnosticTask {
        kind: "production",
        level: "A2/B1",
        focus: "routine",
        instruction: "Describe your typical weekday in Danish.",
    },
    DiagnosticTask {
        kind: "production",
        level: "B1",
        focus: "opinion",
        instruction: "What do you think about learning Danish? Write your opinion.",
    },
    DiagnosticTask {
        kind: "production",
        level: "B1/B2",
        focus: "reflection",
        instruction: "Describe a challenge you experienced and how you handled it.",
    },
];

/// Task for a 1-based step number, if the step exists.
#[must_use]
pub fn task_for_step(step: u8) -> Option<&'static DiagnosticTask> {
    let index = usize::from(step).checked_sub(1)?;
    DIAGNOSTIC_TASKS.get(index)
}

// =============================================================================
// RESULTS
// =============================================================================

/// Terminal classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    pub level: Level,
    pub confidence: Confidence,
    /// Average over recorded scores; only present right after finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_score: Option<Score>,
}

/// What the next turn for a record will be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPlan {
    /// Not active: report the known classification, change nothing.
    Finished(DiagnosticResult),
    /// Active: the answer belongs to `step`.
    Step {
        step: u8,
        task: Option<&'static DiagnosticTask>,
    },
}

/// Result of applying one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The diagnostic continues with `step`.
    Step {
        step: u8,
        task: Option<&'static DiagnosticTask>,
    },
    /// This turn completed the final step.
    Finalized(DiagnosticResult),
    /// The diagnostic was not active; nothing changed.
    AlreadyFinished(DiagnosticResult),
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Classification reported for a record whose diagnostic is not active.
///
/// The stored level with medium confidence, or `PD2` with low confidence
/// when the learner was never placed.
#[must_use]
pub fn finished_report(state: &UserState) -> DiagnosticResult {
    match state.diagnostic().estimated_level {
        Some(level) => DiagnosticResult {
            level,
            confidence: Confidence::Medium,
            avg_score: None,
        },
        None => DiagnosticResult {
            level: Level::PD2,
            confidence: Confidence::Low,
            avg_score: None,
        },
    }
}

/// Start (or restart) the diagnostic and describe step 1.
pub fn start(state: &mut UserState) -> TurnOutcome {
    state.start_diagnostic();
    let step = state.diagnostic().current_step();
    TurnOutcome::Step {
        step,
        task: task_for_step(step),
    }
}

/// Inspect a record and name the task the next answer belongs to.
#[must_use]
pub fn plan_turn(state: &UserState) -> TurnPlan {
    let diagnostic = state.diagnostic();
    if !diagnostic.active {
        return TurnPlan::Finished(finished_report(state));
    }
    let step = diagnostic.current_step();
    TurnPlan::Step {
        step,
        task: task_for_step(step),
    }
}

/// Apply one diagnostic turn.
///
/// `score` replaces whatever score `answer` carries; `None` records no score
/// for the step. Finalizes once `stepsCompleted` reaches `maxSteps`.
pub fn complete_turn(
    state: &mut UserState,
    answer: &AnswerMeta,
    score: Option<Score>,
    clock: &dyn Clock,
) -> TurnOutcome {
    if !state.diagnostic().active {
        return TurnOutcome::AlreadyFinished(finished_report(state));
    }

    let scored = AnswerMeta {
        score,
        ..answer.clone()
    };
    state.update_from_answer(&scored, clock);

    let diagnostic = state.diagnostic();
    if diagnostic.is_complete() {
        let (level, confidence, average) = LevelAssessor::new().place(&diagnostic.scores);
        state.stop_diagnostic(level);
        return TurnOutcome::Finalized(DiagnosticResult {
            level,
            confidence,
            avg_score: Some(average),
        });
    }

    let step = diagnostic.current_step();
    TurnOutcome::Step {
        step,
        task: task_for_step(step),
    }
}

// =============================================================================
// TESTS
// =============================================================================
