//! # Diagnostic Orchestrator
//!
//! Drives the placement diagnostic against the store and the evaluator.
//!
//! ## Turn protocol
//!
//! 1. Load a snapshot and plan the turn (no lock).
//! 2. Score the answer text, bounded by the evaluator timeout (no lock).
//! 3. Take the per-user lock, reload, and check the diagnostic is still at
//!    the planned step. If not, fail with `TurnConflict` and save nothing.
//! 4. Apply the turn and save, still under the lock.

use crate::evaluator::{AnswerEvaluator, neutral_score};
use crate::locks::UserLocks;
use danlearn_core::{
    AnswerMeta, Clock, DanlearnError, DiagnosticTask, Score, TurnOutcome, TurnPlan, UserId,
    UserStore, diagnostic,
};
use std::sync::Arc;
use std::time::Duration;

/// Diagnostic turn service.
pub struct DiagnosticOrchestrator {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<UserLocks>,
    evaluator: Arc<dyn AnswerEvaluator>,
    evaluator_timeout: Duration,
}

impl DiagnosticOrchestrator {
    pub fn new(
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        locks: Arc<UserLocks>,
        evaluator: Arc<dyn AnswerEvaluator>,
        evaluator_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            evaluator,
            evaluator_timeout,
        }
    }

    /// Start (or restart) the diagnostic, creating the record if needed.
    pub async fn start(&self, user_id: &UserId) -> Result<TurnOutcome, DanlearnError> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.store.load_or_new(user_id, self.clock.as_ref())?;
        let outcome = diagnostic::start(&mut state);
        self.store.save(&state)?;
        tracing::info!(
            event = "diagnostic_started",
            user_id = %user_id,
            "Diagnostic started"
        );
        Ok(outcome)
    }

    /// Submit one diagnostic answer.
    pub async fn step(
        &self,
        user_id: &UserId,
        answer: &AnswerMeta,
    ) -> Result<TurnOutcome, DanlearnError> {
        answer.validate()?;

        let snapshot = self
            .store
            .load(user_id)?
            .ok_or(DanlearnError::DiagnosticNotInitialized)?;
        let (step, task) = match diagnostic::plan_turn(&snapshot) {
            TurnPlan::Finished(result) => return Ok(TurnOutcome::AlreadyFinished(result)),
            TurnPlan::Step { step, task } => (step, task),
        };

        let score = match (task, answer.answer_text()) {
            (Some(task), Some(text)) => Some(self.score(user_id, step, task, text).await),
            _ => None,
        };

        let _guard = self.locks.lock(user_id).await;
        let mut state = self
            .store
            .load(user_id)?
            .ok_or(DanlearnError::DiagnosticNotInitialized)?;
        let current = state.diagnostic();
        if !current.active || current.current_step() != step {
            tracing::warn!(
                event = "turn_conflict",
                user_id = %user_id,
                planned_step = step,
                "Record changed while the answer was scored"
            );
            return Err(DanlearnError::TurnConflict(user_id.clone()));
        }

        let outcome = diagnostic::complete_turn(&mut state, answer, score, self.clock.as_ref());
        self.store.save(&state)?;

        match &outcome {
            TurnOutcome::Finalized(result) => tracing::info!(
                event = "diagnostic_finalized",
                user_id = %user_id,
                level = ?result.level,
                confidence = ?result.confidence,
                "Diagnostic finalized"
            ),
            TurnOutcome::Step { step, .. } => tracing::debug!(
                event = "diagnostic_step",
                user_id = %user_id,
                next_step = step,
                scored = score.is_some(),
                "Diagnostic advanced"
            ),
            TurnOutcome::AlreadyFinished(_) => {}
        }
        Ok(outcome)
    }

    async fn score(&self, user_id: &UserId, step: u8, task: &DiagnosticTask, text: &str) -> Score {
        match tokio::time::timeout(self.evaluator_timeout, self.evaluator.evaluate(task, text))
            .await
        {
            Ok(score) => score,
            Err(_) => {
                tracing::warn!(
                    event = "evaluator_timeout",
                    user_id = %user_id,
                    step,
                    timeout_ms = self.evaluator_timeout.as_millis() as u64,
                    "Evaluator timed out, using neutral score"
                );
                neutral_score()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
