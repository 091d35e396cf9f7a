//! Retry-or-skip policy with exponential backoff
//!
//! Every failed step of the initializer and the question builder asks
//! [`disposition`] what to do next. The answer depends on which step failed
//! ([`FailureStage`]) and what kind of failure it was ([`ErrorKind`]):
//!
//! | Stage | Transient | Rate limited | Validation | Quota / fatal |
//! |---|---|---|---|---|
//! | `SourceWords` | retry with backoff, then abort | abort | abort | abort |
//! | `CandidateTranslation` | skip candidate | abort | skip candidate | abort |
//! | `CorrectTranslation` | skip question | skip question | skip question | skip question |
//! | `DistractorWords` | substitute | substitute | substitute | substitute |
//! | `DistractorTranslation` | substitute | substitute | substitute | substitute |
//!
//! # Example
//!
//! ```
//! use lingo_quiz::config::RetryConfig;
//! use lingo_quiz::error::Error;
//! use lingo_quiz::retry::{disposition, Disposition, FailureStage};
//!
//! let config = RetryConfig::default();
//! let rate_limited = Error::RateLimited { provider: "mymemory".into() };
//! let next = disposition(FailureStage::CandidateTranslation, &rate_limited, 0, &config);
//! assert_eq!(next, Disposition::Abort);
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, ErrorKind};
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ErrorKind {
    fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientProvider)
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts and refused connections are worth another try; a 4xx is not
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            other => other.kind().is_retryable(),
        }
    }
}

/// Pipeline step whose remote call failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    /// Initializer's bulk fetch of primary-language words
    SourceWords,
    /// Initializer's translation of one secondary-language candidate
    CandidateTranslation,
    /// Question builder's translation of the question word
    CorrectTranslation,
    /// Question builder's fetch of distractor source words
    DistractorWords,
    /// Question builder's per-slot distractor pipeline
    DistractorTranslation,
}

/// What the failing state machine should do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Reissue the same request after `delay`
    Retry {
        /// Backoff before the request is sent again
        delay: Duration,
    },
    /// Drop this item and move on to the next one
    Skip,
    /// Fill the slot with a synthetic placeholder
    Substitute,
    /// Fail the whole phase
    Abort,
}

/// Decide how a stage reacts to a failure
///
/// `attempt` is the number of retries already made for this request.
pub fn disposition(
    stage: FailureStage,
    error: &Error,
    attempt: u32,
    config: &RetryConfig,
) -> Disposition {
    match stage {
        FailureStage::SourceWords => {
            if error.is_retryable() && attempt < config.max_attempts {
                Disposition::Retry {
                    delay: backoff_delay(config, attempt),
                }
            } else {
                Disposition::Abort
            }
        }
        FailureStage::CandidateTranslation => match error.kind() {
            ErrorKind::TransientProvider | ErrorKind::Validation | ErrorKind::ProtocolMismatch => {
                Disposition::Skip
            }
            ErrorKind::RateLimited | ErrorKind::QuotaUnreachable | ErrorKind::Fatal => {
                Disposition::Abort
            }
        },
        FailureStage::CorrectTranslation => Disposition::Skip,
        FailureStage::DistractorWords | FailureStage::DistractorTranslation => {
            Disposition::Substitute
        }
    }
}

/// Backoff before retry number `attempt + 1`
///
/// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`, then
/// jittered when enabled. The delay grows one step at a time and is capped on
/// every step, so any `attempt` yields a finite delay.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let cap = config.max_delay.as_secs_f64();
    let mut secs = config.initial_delay.as_secs_f64().min(cap);
    for _ in 0..attempt {
        if secs <= 0.0 || secs >= cap || config.backoff_multiplier <= 1.0 {
            break;
        }
        secs = (secs * config.backoff_multiplier).min(cap);
    }
    let delay = if secs.is_finite() && secs >= 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        config.max_delay
    };

    if config.jitter {
        add_jitter(delay)
    } else {
        delay
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
