//! Error types for lingo-quiz
//!
//! This module provides the error handling used across the orchestrator:
//! - A single [`Error`] enum for provider, validation, quota and protocol failures
//! - An [`ErrorKind`] classification consumed by the retry-or-skip policy
//!   in [`crate::retry`]

use thiserror::Error;

/// Result type alias for lingo-quiz operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lingo-quiz
///
/// Each variant carries enough context to produce a useful diagnostic in logs
/// and in [`crate::types::Event::FatalError`] notifications.
#[derive(Debug, Error)]
pub enum Error {
    /// Transient failure reported by a remote provider (bad payload, unexpected status)
    #[error("provider error: {0}")]
    Provider(String),

    /// Network error talking to a remote provider
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider response could not be decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider explicitly signalled that the caller is rate limited
    #[error("rate limited by {provider}")]
    RateLimited {
        /// Name of the provider that refused the request
        provider: String,
    },

    /// A provider result failed the content filters
    #[error("validation failed: {0}")]
    Validation(String),

    /// Ran out of candidates before a required count was met
    #[error("could not collect enough {what}: needed {needed}, got {got}")]
    QuotaUnreachable {
        /// What was being collected (e.g. "source words")
        what: String,
        /// Number of items required
        needed: usize,
        /// Number of items actually collected
        got: usize,
    },

    /// A result envelope arrived for a phase or step that does not own it
    #[error("protocol mismatch: expected {expected}, got {got}")]
    ProtocolMismatch {
        /// The phase/step that currently owns the coordinator
        expected: String,
        /// The phase/step the stray envelope was tagged with
        got: String,
    },

    /// A language phase was started with fewer pool words than questions
    #[error("word pool for {language} is not ready: have {have}, need {need}")]
    InsufficientPool {
        /// Language code of the phase that could not start
        language: String,
        /// Words available in the pool
        have: usize,
        /// Words required for the phase
        need: usize,
    },

    /// A worker task panicked before producing an outcome
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Operation is not valid in the component's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "quiz.questions_per_language")
        key: Option<String>,
    },

    /// Session was cancelled through its handle
    #[error("session cancelled")]
    Cancelled,

    /// Session is no longer running (answer channel closed)
    #[error("session closed")]
    SessionClosed,
}

/// Coarse classification of an [`Error`], used to pick a [`crate::retry::Disposition`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network or parse failure from a remote call
    TransientProvider,
    /// Explicit provider rate-limit signal
    RateLimited,
    /// Result failed the content filters
    Validation,
    /// Not enough valid items to meet a required count
    QuotaUnreachable,
    /// Stale or misrouted result envelope
    ProtocolMismatch,
    /// Anything that must end the session
    Fatal,
}

impl Error {
    /// Classify this error for the retry-or-skip policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Provider(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::TaskPanicked(_) => ErrorKind::TransientProvider,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Validation(_) => ErrorKind::Validation,
            Error::QuotaUnreachable { .. } => ErrorKind::QuotaUnreachable,
            Error::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
            Error::InsufficientPool { .. }
            | Error::InvalidState(_)
            | Error::Config { .. }
            | Error::Cancelled
            | Error::SessionClosed => ErrorKind::Fatal,
        }
    }

    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
