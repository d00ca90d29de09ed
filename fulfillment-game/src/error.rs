//! Error taxonomy for the engine.
//!
//! Value objects raise [`DomainError`], configuration raises [`ValidationError`]
//! with every violated constraint, the aggregate raises [`InvalidOperationError`]
//! for actions in the wrong status or phase, and the save layer raises
//! [`PersistenceError`] / [`IntegrityError`]. [`GameError`] unifies them for
//! callers that do not care which layer failed.

use std::fmt;

use thiserror::Error;

use crate::card::CardId;
use crate::stage::{GameStatus, Phase};

/// Numeric value-object bound violations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("{field} amount must not be negative (got {amount})")]
    NegativeAmount { field: &'static str, amount: i32 },
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: i32,
        max: i32,
        value: i32,
    },
    #[error("{field} maximum must be positive (got {max})")]
    NonPositiveMax { field: &'static str, max: i32 },
    #[error("{field} factor must not be negative (got {factor})")]
    NegativeFactor { field: &'static str, factor: f64 },
    #[error("discount rate must be between 0 and 1 (got {rate})")]
    InvalidRate { rate: f64 },
    #[error("insufficient vitality: need {required}, have {available}")]
    InsufficientVitality { required: i32, available: i32 },
}

/// A single violated configuration constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub message: String,
}

impl ConfigViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Constructor or configuration input was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid configuration: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<ConfigViolation>,
}

impl ValidationError {
    /// Names of every field that failed validation, in check order.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// An action was attempted in the wrong status or phase, or referenced a card
/// outside the legal selection set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidOperationError {
    #[error("cannot {action} while game is {status}")]
    WrongStatus {
        action: &'static str,
        status: GameStatus,
    },
    #[error("cannot {action} during {actual} phase (expected {expected})")]
    WrongPhase {
        action: &'static str,
        expected: Phase,
        actual: Phase,
    },
    #[error("challenge {id} is not in the current offer")]
    ChallengeNotOffered { id: CardId },
    #[error("card {id} is not a life card")]
    NotALifeCard { id: CardId },
    #[error("no challenge has been selected")]
    NoCurrentChallenge,
    #[error("insurance index {index} is not in the market")]
    UnknownInsurance { index: usize },
    #[error("session lock poisoned by a panicked caller")]
    SessionPoisoned,
}

/// Storage read/write failures and unsupported snapshot formats.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unsupported save version {version}")]
    UnsupportedVersion { version: u64 },
    #[error("primary and fallback storage both failed: {primary}; {fallback}")]
    AllBackendsFailed { primary: String, fallback: String },
    #[error("saved {save_name} to primary storage but an older fallback copy remains: {reason}")]
    StaleFallback { save_name: String, reason: String },
}

impl PersistenceError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// A loaded snapshot failed structural or semantic validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("save data has no version tag")]
    MissingVersion,
    #[error("save data is malformed: {0}")]
    Malformed(String),
    #[error("checksum mismatch (expected {expected}, found {found})")]
    ChecksumMismatch { expected: String, found: String },
    #[error("snapshot violates invariant: {0}")]
    Invariant(String),
    #[error("record has more completed games ({completed}) than total games ({total})")]
    RecordCounts { total: u32, completed: u32 },
}

/// Unified engine error.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("card data could not be loaded: {0}")]
    Data(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(PersistenceError::Serialization(err))
    }
}
