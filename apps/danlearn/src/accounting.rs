//! # Usage & Billing Services
//!
//! Answer intake, billing events and record administration. Every mutating
//! call runs its load/mutate/save cycle under the per-user lock.

use crate::locks::UserLocks;
use danlearn_core::{
    Accounting, AnswerMeta, Clock, DanlearnError, LearningMode, Plan, TurnOutcome, UserId,
    UserState, UserStore, diagnostic,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// BILLING EVENTS
// =============================================================================

/// Subscription change reported by the billing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BillingEvent {
    SubscriptionCreated { plan: Plan },
    SubscriptionCancelled,
}

impl BillingEvent {
    /// Build an event from its wire name and optional plan.
    pub fn parse(event: &str, plan: Option<&str>) -> Result<Self, DanlearnError> {
        match event {
            "subscription_created" => {
                let plan = plan
                    .ok_or_else(|| {
                        DanlearnError::InvalidAnswer(
                            "plan is required for subscription_created".to_string(),
                        )
                    })?
                    .parse::<Plan>()?;
                Ok(Self::SubscriptionCreated { plan })
            }
            "subscription_cancelled" => Ok(Self::SubscriptionCancelled),
            other => Err(DanlearnError::InvalidAnswer(format!(
                "unknown billing event: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Usage, billing and administration service.
pub struct AccountingService {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<UserLocks>,
}

impl AccountingService {
    pub fn new(store: Arc<dyn UserStore>, clock: Arc<dyn Clock>, locks: Arc<UserLocks>) -> Self {
        Self {
            store,
            clock,
            locks,
        }
    }

    /// Account one answer and return the updated record.
    ///
    /// During an active diagnostic the answer is an unevaluated diagnostic
    /// step: a caller-supplied score is discarded and the diagnostic
    /// finalizes on its last step, as through the orchestrator.
    pub async fn record_answer(
        &self,
        user_id: &UserId,
        answer: &AnswerMeta,
    ) -> Result<(UserState, Accounting), DanlearnError> {
        answer.validate()?;
        let _guard = self.locks.lock(user_id).await;
        let clock = self.clock.as_ref();

        let mut state = self.store.load_or_new(user_id, clock)?;
        if state.ensure_usage_for_today(clock) {
            tracing::info!(event = "usage_rollover", user_id = %user_id, "New usage day");
        }
        expire_lapsed(&mut state, clock);
        let accounted = if state.diagnostic().active {
            if let TurnOutcome::Finalized(result) =
                diagnostic::complete_turn(&mut state, answer, None, clock)
            {
                tracing::info!(
                    event = "diagnostic_finalized",
                    user_id = %user_id,
                    level = %result.level,
                    "Diagnostic finalized by answer intake"
                );
            }
            Accounting::DiagnosticStep
        } else {
            state.update_from_answer(answer, clock)
        };
        self.store.save(&state)?;

        let usage = state.usage();
        tracing::debug!(
            event = "answer_recorded",
            user_id = %user_id,
            accounted = ?accounted,
            text_steps = usage.text.steps_used,
            voice_seconds = usage.voice.seconds_used,
            "Answer recorded"
        );
        Ok((state, accounted))
    }

    /// Apply a billing event and return the updated record.
    pub async fn apply_billing_event(
        &self,
        user_id: &UserId,
        event: BillingEvent,
    ) -> Result<UserState, DanlearnError> {
        let _guard = self.locks.lock(user_id).await;
        let clock = self.clock.as_ref();

        let mut state = self.store.load_or_new(user_id, clock)?;
        state.ensure_usage_for_today(clock);
        expire_lapsed(&mut state, clock);
        match event {
            BillingEvent::SubscriptionCreated { plan } => {
                state.activate_subscription(plan, clock);
                tracing::info!(
                    event = "subscription_created",
                    user_id = %user_id,
                    plan = %plan,
                    "Subscription activated"
                );
            }
            BillingEvent::SubscriptionCancelled => {
                state.cancel_subscription();
                tracing::info!(
                    event = "subscription_cancelled",
                    user_id = %user_id,
                    "Subscription cancelled"
                );
            }
        }
        self.store.save(&state)?;
        Ok(state)
    }

    /// Set the learner's mode selector, creating the record when absent.
    pub async fn set_mode(
        &self,
        user_id: &UserId,
        mode: LearningMode,
    ) -> Result<UserState, DanlearnError> {
        let _guard = self.locks.lock(user_id).await;
        let clock = self.clock.as_ref();

        let mut state = self.store.load_or_new(user_id, clock)?;
        state.ensure_usage_for_today(clock);
        expire_lapsed(&mut state, clock);
        tracing::debug!(event = "mode_set", user_id = %user_id, mode = %mode.as_str(), "Mode set");
        state.set_mode(Some(mode));
        self.store.save(&state)?;
        Ok(state)
    }

    /// Current record with today's usage. Nothing is written.
    pub async fn user_status(&self, user_id: &UserId) -> Result<UserState, DanlearnError> {
        let clock = self.clock.as_ref();
        let mut state = self.store.load_or_new(user_id, clock)?;
        state.ensure_usage_for_today(clock);
        expire_lapsed(&mut state, clock);
        Ok(state)
    }

    /// Replace the record with a fresh default one.
    pub async fn reset_user(&self, user_id: &UserId) -> Result<UserState, DanlearnError> {
        let _guard = self.locks.lock(user_id).await;
        let state = self.store.reset(user_id, self.clock.as_ref())?;
        tracing::info!(event = "user_reset", user_id = %user_id, "Record reset");
        Ok(state)
    }

    /// Number of stored records.
    pub fn user_count(&self) -> Result<usize, DanlearnError> {
        self.store.user_count()
    }
}

fn expire_lapsed(state: &mut UserState, clock: &dyn Clock) {
    if state.expire_lapsed_subscription(clock) {
        tracing::info!(
            event = "subscription_lapsed",
            user_id = %state.user_id(),
            "Subscription period ended"
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
