//! Task runner: executes work off the coordinator and posts tagged results.

use super::dispatcher::CorrelationId;
use crate::error::{Error, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Value produced by a worker task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutput {
    /// Raw words from a [`crate::providers::WordSource`]
    Words(Vec<String>),
    /// Result of a [`crate::providers::Translator`] call (`None` = no usable translation)
    Translation(Option<String>),
}

impl TaskOutput {
    /// Unwrap a word list, or report which output arrived instead
    pub fn into_words(self) -> Result<Vec<String>> {
        match self {
            TaskOutput::Words(words) => Ok(words),
            other => Err(Error::ProtocolMismatch {
                expected: "words".to_string(),
                got: other.label().to_string(),
            }),
        }
    }

    /// Unwrap a translation, or report which output arrived instead
    pub fn into_translation(self) -> Result<Option<String>> {
        match self {
            TaskOutput::Translation(text) => Ok(text),
            other => Err(Error::ProtocolMismatch {
                expected: "translation".to_string(),
                got: other.label().to_string(),
            }),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TaskOutput::Words(_) => "words",
            TaskOutput::Translation(_) => "translation",
        }
    }
}

/// One task outcome, tagged with the id it was issued under
#[derive(Debug)]
pub struct ResultEnvelope {
    /// Routing tag chosen by the issuing state machine
    pub id: CorrelationId,
    /// What the work produced
    pub outcome: Result<TaskOutput>,
}

/// Spawns fire-and-forget worker tasks that report into one result channel
///
/// Every call to [`TaskRunner::run`] posts exactly one [`ResultEnvelope`],
/// whether the work succeeds, fails, or panics. The channel is unbounded;
/// callers limit how much they issue.
#[derive(Clone)]
pub struct TaskRunner {
    tx: mpsc::UnboundedSender<ResultEnvelope>,
}

impl TaskRunner {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ResultEnvelope>) -> Self {
        Self { tx }
    }

    /// Run `work` on the tokio runtime and post its outcome under `id`
    pub fn run<F>(&self, id: CorrelationId, work: F)
    where
        F: Future<Output = Result<TaskOutput>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tracing::trace!(id = %id, "Dispatching task");

        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(&*panic);
                    tracing::error!(id = %id, panic = %message, "Worker task panicked");
                    Err(Error::TaskPanicked(message))
                }
            };

            if tx.send(ResultEnvelope { id, outcome }).is_err() {
                // Coordinator is gone; nobody is left to route this result
                tracing::debug!(id = %id, "Result channel closed, dropping envelope");
            }
        });
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
