//! Result dispatcher: drains the result channel on the coordinator and
//! rejects envelopes that belong to an abandoned pipeline.

use super::runner::{ResultEnvelope, TaskRunner};
use crate::error::Error;
use std::fmt;
use tokio::sync::mpsc;

/// State machine that issued a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// The session initializer
    Initializer,
    /// One run of the question builder; `epoch` increases per question
    Question {
        /// Pipeline generation
        epoch: u64,
    },
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Initializer => write!(f, "initializer"),
            Owner::Question { epoch } => write!(f, "question#{epoch}"),
        }
    }
}

/// Logical step a task belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// Initializer: bulk fetch of primary words
    SourceWords,
    /// Initializer: translation of candidate number `candidate`
    CandidateTranslation {
        /// Index into the candidate list
        candidate: usize,
    },
    /// Question: translation of the question word
    CorrectTranslation,
    /// Question: fetch of distractor source words
    DistractorWords,
    /// Question: distractor pipeline for `slot` (0 or 1)
    DistractorTranslation {
        /// Distractor slot
        slot: usize,
    },
}

impl Step {
    fn belongs_to(&self, owner: Owner) -> bool {
        match self {
            Step::SourceWords | Step::CandidateTranslation { .. } => owner == Owner::Initializer,
            Step::CorrectTranslation
            | Step::DistractorWords
            | Step::DistractorTranslation { .. } => matches!(owner, Owner::Question { .. }),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::SourceWords => write!(f, "source_words"),
            Step::CandidateTranslation { candidate } => {
                write!(f, "candidate_translation[{candidate}]")
            }
            Step::CorrectTranslation => write!(f, "correct_translation"),
            Step::DistractorWords => write!(f, "distractor_words"),
            Step::DistractorTranslation { slot } => write!(f, "distractor_translation[{slot}]"),
        }
    }
}

/// Routing tag attached to every dispatched task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    /// Phase tag of the issuing state machine
    pub owner: Owner,
    /// Step within that state machine
    pub step: Step,
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.step)
    }
}

/// Create a connected runner/dispatcher pair
pub fn channel() -> (TaskRunner, ResultDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskRunner::new(tx), ResultDispatcher::new(rx))
}

/// Single consumer of the result channel
///
/// Only envelopes tagged with the current phase are handed out; anything
/// else is a protocol mismatch and is logged and dropped.
pub struct ResultDispatcher {
    rx: mpsc::UnboundedReceiver<ResultEnvelope>,
    phase: Option<Owner>,
    discarded: usize,
}

impl ResultDispatcher {
    fn new(rx: mpsc::UnboundedReceiver<ResultEnvelope>) -> Self {
        Self {
            rx,
            phase: None,
            discarded: 0,
        }
    }

    /// Switch the phase whose results are accepted
    pub fn set_phase(&mut self, phase: Option<Owner>) {
        if self.phase != phase {
            tracing::debug!(
                from = ?self.phase.map(|p| p.to_string()),
                to = ?phase.map(|p| p.to_string()),
                "Dispatcher phase changed"
            );
        }
        self.phase = phase;
    }

    /// Number of stale envelopes dropped so far
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Non-blocking: take at most one envelope off the channel
    ///
    /// Returns `None` when the channel is empty or the envelope taken was
    /// stale (and has been discarded).
    pub fn poll(&mut self) -> Option<ResultEnvelope> {
        let envelope = self.rx.try_recv().ok()?;
        self.admit(envelope)
    }

    /// Wait for the next envelope belonging to the current phase
    ///
    /// Returns `None` once every runner has been dropped and the channel is drained.
    pub async fn recv(&mut self) -> Option<ResultEnvelope> {
        loop {
            let envelope = self.rx.recv().await?;
            if let Some(envelope) = self.admit(envelope) {
                return Some(envelope);
            }
        }
    }

    fn admit(&mut self, envelope: ResultEnvelope) -> Option<ResultEnvelope> {
        let current = self.phase;
        let matches = current == Some(envelope.id.owner) && envelope.id.step.belongs_to(envelope.id.owner);
        if matches {
            tracing::debug!(id = %envelope.id, ok = envelope.outcome.is_ok(), "Routing result");
            return Some(envelope);
        }

        self.discarded += 1;
        let mismatch = Error::ProtocolMismatch {
            expected: current.map_or_else(|| "no active phase".to_string(), |p| p.to_string()),
            got: envelope.id.to_string(),
        };
        tracing::warn!(error = %mismatch, "Discarding stale result envelope");
        None
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::super::runner::TaskOutput;
    use super::*;

    fn question(epoch: u64, step: Step) -> CorrelationId {
        CorrelationId {
            owner: Owner::Question { epoch },
            step,
        }
    }

    async fn settle() {
        // Let spawned workers post their envelopes
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_poll_empty_channel_returns_none() {
        let (_runner, mut dispatcher) = channel();
        dispatcher.set_phase(Some(Owner::Initializer));
        assert!(dispatcher.poll().is_none());
        assert_eq!(dispatcher.discarded(), 0);
    }

    #[tokio::test]
    async fn test_poll_takes_one_envelope_per_call_in_arrival_order() {
        let (runner, mut dispatcher) = channel();
        dispatcher.set_phase(Some(Owner::Question { epoch: 1 }));

        runner.run(question(1, Step::DistractorTranslation { slot: 0 }), async {
            Ok(TaskOutput::Translation(Some("a".into())))
        });
        settle().await;
        runner.run(question(1, Step::DistractorTranslation { slot: 1 }), async {
            Ok(TaskOutput::Translation(Some("b".into())))
        });
        settle().await;

        let first = dispatcher.poll().unwrap();
        assert_eq!(first.id.step, Step::DistractorTranslation { slot: 0 });
        let second = dispatcher.poll().unwrap();
        assert_eq!(second.id.step, Step::DistractorTranslation { slot: 1 });
        assert!(dispatcher.poll().is_none());
    }

    #[tokio::test]
    async fn test_stale_epoch_is_discarded() {
        let (runner, mut dispatcher) = channel();
        dispatcher.set_phase(Some(Owner::Question { epoch: 2 }));

        runner.run(question(1, Step::CorrectTranslation), async {
            Ok(TaskOutput::Translation(Some("stale".into())))
        });
        runner.run(question(2, Step::CorrectTranslation), async {
            Ok(TaskOutput::Translation(Some("fresh".into())))
        });

        let envelope = dispatcher.recv().await.unwrap();
        assert_eq!(envelope.id, question(2, Step::CorrectTranslation));
        settle().await;
        assert!(dispatcher.poll().is_none());
        assert_eq!(dispatcher.discarded(), 1);
    }

    #[tokio::test]
    async fn test_no_phase_discards_everything() {
        let (runner, mut dispatcher) = channel();
        runner.run(
            CorrelationId {
                owner: Owner::Initializer,
                step: Step::SourceWords,
            },
            async { Ok(TaskOutput::Words(vec![])) },
        );
        settle().await;

        assert!(dispatcher.poll().is_none());
        assert_eq!(dispatcher.discarded(), 1);
    }

    #[tokio::test]
    async fn test_step_owner_mismatch_is_discarded() {
        let (runner, mut dispatcher) = channel();
        dispatcher.set_phase(Some(Owner::Initializer));
        runner.run(
            CorrelationId {
                owner: Owner::Initializer,
                step: Step::CorrectTranslation,
            },
            async { Ok(TaskOutput::Translation(None)) },
        );
        settle().await;

        assert!(dispatcher.poll().is_none());
        assert_eq!(dispatcher.discarded(), 1);
    }

    #[test]
    fn test_correlation_id_display() {
        let id = question(7, Step::DistractorTranslation { slot: 1 });
        assert_eq!(id.to_string(), "question#7/distractor_translation[1]");
        let id = CorrelationId {
            owner: Owner::Initializer,
            step: Step::CandidateTranslation { candidate: 4 },
        };
        assert_eq!(id.to_string(), "initializer/candidate_translation[4]");
    }
}
