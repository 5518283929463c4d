//! # Learner Scenarios
//!
//! End-to-end walks through the state machine with a manual clock and the
//! in-memory store, the way the server drives it.

use chrono::{DateTime, Duration, TimeZone, Utc};
use danlearn_core::diagnostic;
use danlearn_core::{
    AnswerMeta, Confidence, DiagnosticResult, Level, ManualClock, MemoryStore, Plan, Score,
    TurnOutcome, TurnPlan, UserId, UserState, UserStore,
};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 14, 9, 30, 0)
        .single()
        .expect("timestamp")
}

fn answer(text: &str) -> AnswerMeta {
    AnswerMeta {
        text: Some(text.to_string()),
        ..AnswerMeta::default()
    }
}

/// Run a full diagnostic through the store with the given evaluated scores.
fn run_diagnostic(scores: [u16; 4]) -> (DiagnosticResult, UserState) {
    let clock = ManualClock::new(start_time());
    let store = MemoryStore::new();
    let id = UserId::new("scenario").expect("id");

    let mut state = store.load_or_new(&id, &clock).expect("load");
    diagnostic::start(&mut state);
    store.save(&state).expect("save");

    let mut last = None;
    for value in scores {
        let mut state = store.load(&id).expect("load").expect("present");
        let outcome = diagnostic::complete_turn(
            &mut state,
            &answer("Jeg bor i Aarhus."),
            Some(Score::from_thousandths(value)),
            &clock,
        );
        store.save(&state).expect("save");
        last = Some(outcome);
    }

    let state = store.load(&id).expect("load").expect("present");
    match last {
        Some(TurnOutcome::Finalized(result)) => (result, state),
        other => unreachable!("expected finalization, got {:?}", other),
    }
}

// =============================================================================
// DIAGNOSTIC PLACEMENT
// =============================================================================

#[test]
fn low_scores_place_at_a2() {
    let (result, state) = run_diagnostic([200, 300, 100, 200]);
    assert_eq!(result.level, Level::A2);
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.avg_score, Some(Score::from_thousandths(200)));
    assert_eq!(state.diagnostic().estimated_level, Some(Level::A2));
}

#[test]
fn middle_scores_place_at_pd2() {
    let (result, _) = run_diagnostic([500, 600, 500, 600]);
    assert_eq!(result.level, Level::PD2);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.avg_score, Some(Score::from_thousandths(550)));
}

#[test]
fn high_scores_place_at_pd3() {
    let (result, _) = run_diagnostic([700, 700, 700, 700]);
    assert_eq!(result.level, Level::PD3);
}

#[test]
fn steps_track_turn_count() {
    for n in 1..=4u8 {
        let clock = ManualClock::new(start_time());
        let mut state = UserState::new(UserId::new("counter").expect("id"), &clock);
        diagnostic::start(&mut state);
        for _ in 0..n {
            diagnostic::complete_turn(&mut state, &answer("svar"), Some(Score::MAX), &clock);
        }
        assert_eq!(state.diagnostic().steps_completed, n);
        assert_eq!(state.diagnostic().active, n < 4);
    }
}

#[test]
fn finished_diagnostic_is_idempotent() {
    let (result, mut state) = run_diagnostic([800, 800, 800, 800]);
    let clock = ManualClock::new(start_time());

    let plan = diagnostic::plan_turn(&state);
    assert_eq!(
        plan,
        TurnPlan::Finished(DiagnosticResult {
            level: result.level,
            confidence: Confidence::Medium,
            avg_score: None,
        })
    );

    let before = state.clone();
    diagnostic::complete_turn(&mut state, &answer("igen"), Some(Score::ZERO), &clock);
    assert_eq!(state.diagnostic().steps_completed, 4);
    assert_eq!(state.diagnostic(), before.diagnostic());
}

// =============================================================================
// QUOTAS & PLANS
// =============================================================================

#[test]
fn subscriber_day_with_rollover() {
    let clock = ManualClock::new(start_time());
    let store = MemoryStore::new();
    let id = UserId::new("subscriber").expect("id");

    let mut state = store.load_or_new(&id, &clock).expect("load");
    state.activate_subscription(Plan::Basic20, &clock);
    for _ in 0..4 {
        state.update_from_answer(
            &AnswerMeta {
                voice_seconds: Some(300),
                ..AnswerMeta::default()
            },
            &clock,
        );
    }
    assert!(state.usage().voice.exhausted);
    assert_eq!(state.usage().text.steps_used, 4);
    store.save(&state).expect("save");

    clock.advance(Duration::days(1));
    let mut state = store.load(&id).expect("load").expect("present");
    let usage = state.usage_for_today(&clock).clone();
    assert!(!usage.voice.exhausted);
    assert_eq!(usage.voice.limit_seconds, 1200);
    assert_eq!(usage.text.steps_used, 0);
}

#[test]
fn diagnostic_turns_do_not_touch_quota() {
    let clock = ManualClock::new(start_time());
    let mut state = UserState::new(UserId::new("quota").expect("id"), &clock);
    state.activate_subscription(Plan::Pro40, &clock);
    diagnostic::start(&mut state);

    let voiced = AnswerMeta {
        text: Some("hej".to_string()),
        voice_seconds: Some(120),
        score: None,
    };
    diagnostic::complete_turn(&mut state, &voiced, None, &clock);

    assert_eq!(state.usage().voice.seconds_used, 0);
    assert_eq!(state.usage().text.steps_used, 0);
}

#[test]
fn upgrade_mid_day_keeps_used_seconds() {
    let clock = ManualClock::new(start_time());
    let mut state = UserState::new(UserId::new("upgrader").expect("id"), &clock);
    state.activate_subscription(Plan::Basic20, &clock);
    state.add_voice_seconds(1200, &clock);
    assert!(state.usage().voice.exhausted);

    state.activate_subscription(Plan::Pro40, &clock);

    assert_eq!(state.usage().voice.seconds_used, 1200);
    assert_eq!(state.usage().voice.limit_seconds, 2400);
    assert!(!state.usage().voice.exhausted);
}
