//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::accounting::BillingEvent;
use crate::api::{self, AppState};
use crate::config::{AppConfig, BackendKind};
use crate::evaluator::NeutralEvaluator;
use danlearn_core::{
    Clock, DanlearnError, TurnOutcome, UserId, UserState, UserStore, finished_report,
};
use std::sync::Arc;

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), DanlearnError> {
    println!("Danlearn Learner Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", config.server.host);
    println!("  Port:      {}", config.server.port);
    println!("  Backend:   {}", config.storage.backend);
    println!("  Database:  {:?}", config.storage.database);
    println!(
        "  Evaluator: {}",
        if config.evaluator.api_key.is_some() {
            config.evaluator.model.as_str()
        } else {
            "neutral"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  POST /diagnostic/start     - Start the placement diagnostic");
    println!("  POST /diagnostic/step      - Submit a diagnostic answer");
    println!("  POST /answer               - Account an answer");
    println!("  POST /webhook/billing      - Apply a subscription event");
    println!("  GET  /users/{{id}}           - Learner record");
    println!("  POST /users/{{id}}/reset     - Reset a learner");
    println!("  GET  /health               - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), DanlearnError> {
    let db_path = &config.storage.database;

    if config.storage.backend == BackendKind::Memory {
        println!("Memory backend selected; nothing to initialize.");
        return Ok(());
    }

    if db_path.exists() {
        if !force {
            return Err(DanlearnError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path).map_err(|e| {
            DanlearnError::IoError(format!("Remove {:?} failed: {}", db_path, e))
        })?;
    }

    let _store = config.storage.open()?;
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// LEARNER COMMANDS
// =============================================================================

/// Show a learner record with today's usage.
pub async fn cmd_status(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
) -> Result<(), DanlearnError> {
    let services = open_services(config)?;
    let user_id = UserId::new(user_id)?;
    let state = services.accounting.user_status(&user_id).await?;
    print_record(&state, json_mode)
}

/// Start (or restart) a learner's diagnostic.
pub async fn cmd_diagnostic_start(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
) -> Result<(), DanlearnError> {
    let services = open_services(config)?;
    let user_id = UserId::new(user_id)?;
    let outcome = services.diagnostics.start(&user_id).await?;

    if json_mode {
        print_json(&api::TurnResponse::from(outcome));
        return Ok(());
    }

    if let TurnOutcome::Step {
        step,
        task: Some(task),
    } = outcome
    {
        println!("Diagnostic started for {}", user_id);
        println!("Step {}: [{} / {}] {}", step, task.level, task.focus, task.instruction);
    }
    Ok(())
}

/// Activate a subscription plan.
pub async fn cmd_activate(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
    plan: &str,
) -> Result<(), DanlearnError> {
    let event = BillingEvent::SubscriptionCreated {
        plan: plan.parse()?,
    };
    apply_billing(config, json_mode, user_id, event).await
}

/// Cancel a learner's subscription.
pub async fn cmd_cancel(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
) -> Result<(), DanlearnError> {
    apply_billing(config, json_mode, user_id, BillingEvent::SubscriptionCancelled).await
}

/// Replace a learner record with a fresh default one.
pub async fn cmd_reset(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
) -> Result<(), DanlearnError> {
    let services = open_services(config)?;
    let user_id = UserId::new(user_id)?;
    let state = services.accounting.reset_user(&user_id).await?;
    if !json_mode {
        println!("Reset learner {}", user_id);
        println!();
    }
    print_record(&state, json_mode)
}

/// List stored learners.
pub fn cmd_users(config: &AppConfig, json_mode: bool) -> Result<(), DanlearnError> {
    let store = config.storage.open()?;
    let ids = store.user_ids()?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": config.storage.backend.to_string(),
            "user_count": ids.len(),
            "users": ids.iter().map(UserId::as_str).collect::<Vec<_>>(),
        });
        print_json(&output);
        return Ok(());
    }

    println!("Danlearn Learners");
    println!("=================");
    println!("Database: {:?}", config.storage.database);
    println!("Backend:  {}", config.storage.backend);
    println!("Count:    {}", ids.len());
    println!();
    for id in &ids {
        println!("  {}", id);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Services over the configured store with the system clock.
///
/// The CLI never scores answers, so the neutral evaluator is enough.
fn open_services(config: &AppConfig) -> Result<AppState, DanlearnError> {
    let store: Arc<dyn UserStore> = Arc::new(config.storage.open()?);
    let clock: Arc<dyn Clock> = Arc::new(config.clock.system_clock());
    Ok(AppState::new(
        store,
        clock,
        Arc::new(NeutralEvaluator),
        config.evaluator.timeout(),
    ))
}

async fn apply_billing(
    config: &AppConfig,
    json_mode: bool,
    user_id: &str,
    event: BillingEvent,
) -> Result<(), DanlearnError> {
    let services = open_services(config)?;
    let user_id = UserId::new(user_id)?;
    let state = services.accounting.apply_billing_event(&user_id, event).await?;

    if json_mode {
        print_json(&api::BillingResponse::ok(state.subscription().clone()));
        return Ok(());
    }

    let subscription = state.subscription();
    match (subscription.active, subscription.plan) {
        (true, Some(plan)) => println!(
            "Activated {} for {} (valid until {})",
            plan,
            user_id,
            subscription
                .valid_until
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        ),
        _ => println!("Cancelled subscription for {}", user_id),
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn print_record(state: &UserState, json_mode: bool) -> Result<(), DanlearnError> {
    if json_mode {
        print_json(&state.to_json()?);
        return Ok(());
    }

    let subscription = state.subscription();
    let usage = state.usage();
    let diagnostic = state.diagnostic();
    let placement = finished_report(state);

    println!("Learner {}", state.user_id());
    println!("========{}", "=".repeat(state.user_id().as_str().len() + 1));
    println!();
    println!("Subscription:");
    match subscription.plan {
        Some(plan) if subscription.active => println!("  Plan:        {}", plan),
        _ => println!("  Plan:        none"),
    }
    if let Some(valid_until) = subscription.valid_until {
        println!("  Valid until: {}", valid_until.to_rfc3339());
    }
    println!();
    println!("Usage ({}):", usage.date);
    println!(
        "  Voice:       {}/{} s{}",
        usage.voice.seconds_used,
        usage.voice.limit_seconds,
        if usage.voice.exhausted { " (exhausted)" } else { "" }
    );
    println!(
        "  Text steps:  {}/{}{}",
        usage.text.steps_used,
        usage.text.soft_limit,
        if usage.text.reinforcement_mode {
            " (reinforcement)"
        } else {
            ""
        }
    );
    println!();
    println!("Diagnostic:");
    println!("  Active:      {}", diagnostic.active);
    println!(
        "  Steps:       {}/{}",
        diagnostic.steps_completed, diagnostic.max_steps
    );
    match diagnostic.estimated_level {
        Some(level) => println!("  Level:       {}", level),
        None => println!("  Level:       not placed ({} assumed)", placement.level),
    }
    Ok(())
}
