//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Danlearn core:
//! - Learner identity (`UserId`)
//! - Scores (`Score`, integer thousandths in `[0,1]`)
//! - Plans, levels and language selectors
//! - Error types (`DanlearnError`)
//!
//! ## Determinism Guarantees
//!
//! Scores are stored as integers. The only floating-point arithmetic in the
//! crate is the conversion to and from the `[0,1]` wire representation.

use crate::primitives::{MAX_USER_ID_LENGTH, SCORE_SCALE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// USER IDENTITY
// =============================================================================

/// Opaque, stable learner identifier.
///
/// Validated on construction: non-empty, at most `MAX_USER_ID_LENGTH` bytes,
/// no control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a validated user id.
    pub fn new(id: impl Into<String>) -> Result<Self, DanlearnError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DanlearnError::InvalidUserId("userId is required".to_string()));
        }
        if id.len() > MAX_USER_ID_LENGTH {
            return Err(DanlearnError::InvalidUserId(format!(
                "userId length {} exceeds maximum {} bytes",
                id.len(),
                MAX_USER_ID_LENGTH
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(DanlearnError::InvalidUserId(
                "userId contains control characters".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = DanlearnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SCORE
// =============================================================================

/// Slack added before truncating a scaled fraction to thousandths.
const TRUNCATION_TOLERANCE: f64 = 1e-9;

/// A learner answer score in `[0,1]`, held as integer thousandths.
///
/// On the wire and in snapshots a score is a plain JSON number in `[0,1]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(u16);

impl Score {
    /// The lowest possible score.
    pub const ZERO: Score = Score(0);

    /// The highest possible score.
    pub const MAX: Score = Score(SCORE_SCALE);

    /// Create a score from thousandths, saturating at 1000.
    #[must_use]
    pub const fn from_thousandths(value: u16) -> Self {
        if value > SCORE_SCALE {
            Self(SCORE_SCALE)
        } else {
            Self(value)
        }
    }

    /// Get the raw value in thousandths.
    #[must_use]
    pub const fn thousandths(self) -> u16 {
        self.0
    }

    /// Convert a fraction, clamping it into `[0,1]`.
    ///
    /// Digits past the thousandth are truncated, so a score never crosses a
    /// placement threshold it did not reach. Returns `None` for NaN or
    /// infinite input.
    #[allow(clippy::float_arithmetic)]
    #[must_use]
    pub fn from_fraction_clamped(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let clamped = value.clamp(0.0, 1.0);
        // absorbs representation error such as 0.29 * 1000 = 289.99999999999997
        let scaled = clamped * f64::from(SCORE_SCALE) + TRUNCATION_TOLERANCE;
        Some(Self::from_thousandths(scaled.floor() as u16))
    }

    /// Get the score as a fraction in `[0,1]`.
    #[allow(clippy::float_arithmetic)]
    #[must_use]
    pub fn as_fraction(self) -> f64 {
        f64::from(self.0) / f64::from(SCORE_SCALE)
    }
}

impl TryFrom<f64> for Score {
    type Error = DanlearnError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DanlearnError::InvalidAnswer(format!(
                "score {} is outside [0,1]",
                value
            )));
        }
        Self::from_fraction_clamped(value)
            .ok_or_else(|| DanlearnError::InvalidAnswer("score is not a number".to_string()))
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.as_fraction()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / SCORE_SCALE, self.0 % SCORE_SCALE)
    }
}

// =============================================================================
// PLAN
// =============================================================================

/// Subscription tier, determining the daily voice allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Plan {
    /// 20 voice minutes per day.
    #[serde(rename = "BASIC_20")]
    Basic20,
    /// 40 voice minutes per day.
    #[serde(rename = "PRO_40")]
    Pro40,
}

impl Plan {
    /// Wire name of the plan.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic20 => "BASIC_20",
            Plan::Pro40 => "PRO_40",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = DanlearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASIC_20" => Ok(Plan::Basic20),
            "PRO_40" => Ok(Plan::Pro40),
            other => Err(DanlearnError::InvalidAnswer(format!("unknown plan: {}", other))),
        }
    }
}

// =============================================================================
// LEVEL & CONFIDENCE
// =============================================================================

/// Estimated proficiency level produced by the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A2,
    PD2,
    PD3,
}

impl Level {
    /// Human-readable level name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Level::A2 => "Elementary (A2)",
            Level::PD2 => "Prøve i Dansk 2",
            Level::PD3 => "Prøve i Dansk 3",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self, self.name())
    }
}

/// How much weight a classification deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

// =============================================================================
// LANGUAGE SELECTORS
// =============================================================================

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UiLanguage {
    #[default]
    #[serde(rename = "EN")]
    En,
    #[serde(rename = "DA")]
    Da,
}

/// Mix of English and Danish used in lesson content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LanguageMode {
    #[default]
    EnFull,
    EnDa,
    DaOnly,
}

/// Learning-mode selector, set externally and not interpreted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearningMode(pub String);

impl LearningMode {
    /// Create a new learning mode from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the mode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Danlearn system.
///
/// - No silent failures
/// - Use `Result<T, DanlearnError>` for fallible operations
/// - The CORE never panics; all errors are per-request and recoverable
#[derive(Debug, Error)]
pub enum DanlearnError {
    /// The user id is missing or malformed.
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    /// The answer payload is malformed.
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// A diagnostic turn was requested for a user with no stored record.
    #[error("Diagnostic not initialized")]
    DiagnosticNotInitialized,

    /// The record changed while the turn was being scored.
    #[error("Concurrent update for user {0}; resubmit the turn")]
    TurnConflict(UserId),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred in the state store.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
