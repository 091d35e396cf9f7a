//! Session initializer: builds the primary and secondary word pools.
//!
//! ```text
//! Idle -> FetchingSourceWords -> TranslatingSecondarySources -> Done
//!               |                          |
//!               +--------> Error <---------+
//! ```
//!
//! Candidate translations are strictly sequential: the next request is only
//! issued after the previous result has been processed, and each request
//! waits `timing.translation_spacing` before hitting the provider.

use super::context::PipelineContext;
use super::dispatcher::{CorrelationId, Owner, Step};
use super::runner::{ResultEnvelope, TaskOutput, TaskRunner};
use crate::error::{Error, Result};
use crate::retry::{Disposition, FailureStage, disposition};
use crate::types::{WordPool, WordPools};
use crate::validation::{accept_secondary_translation, eq_ignore_case, normalize_source_words};
use std::collections::HashSet;
use std::time::Duration;

/// Initializer state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitState {
    /// Not started
    Idle,
    /// Waiting for the bulk source-word fetch
    FetchingSourceWords,
    /// Translating candidates one at a time
    TranslatingSecondarySources,
    /// Both pools published
    Done,
    /// Initialization failed
    Error,
}

/// Result of feeding one envelope to the initializer
#[derive(Debug)]
pub enum InitProgress {
    /// More results are needed
    Pending,
    /// Both pools are full
    Done(WordPools),
    /// Initialization failed; the session cannot start
    Failed(Error),
}

pub(crate) struct SessionInitializer {
    ctx: PipelineContext,
    state: InitState,
    attempt: u32,
    primary: Vec<String>,
    candidates: Vec<String>,
    next_candidate: usize,
    secondary: Vec<String>,
    reserved: HashSet<String>,
}

fn id(step: Step) -> CorrelationId {
    CorrelationId {
        owner: Owner::Initializer,
        step,
    }
}

impl SessionInitializer {
    pub(crate) fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            state: InitState::Idle,
            attempt: 0,
            primary: Vec::new(),
            candidates: Vec::new(),
            next_candidate: 0,
            secondary: Vec::new(),
            reserved: HashSet::new(),
        }
    }

    pub(crate) fn state(&self) -> InitState {
        self.state
    }

    /// Kick off the source-word fetch
    pub(crate) fn start(&mut self, runner: &TaskRunner) -> Result<()> {
        if self.state != InitState::Idle {
            return Err(Error::InvalidState(format!(
                "initializer already started (state {:?})",
                self.state
            )));
        }

        tracing::info!(
            questions_per_language = self.ctx.config.quiz.questions_per_language,
            "Starting word pool initialization"
        );
        self.state = InitState::FetchingSourceWords;
        self.ctx.progress("1/3: fetching source words");
        self.issue_fetch(runner, Duration::ZERO);
        Ok(())
    }

    fn issue_fetch(&self, runner: &TaskRunner, delay: Duration) {
        let words = self.ctx.words.clone();
        let count = self.ctx.config.quiz.source_fetch_count();
        runner.run(id(Step::SourceWords), async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            words.fetch(count).await.map(TaskOutput::Words)
        });
    }

    fn issue_candidate(&self, runner: &TaskRunner) {
        let index = self.next_candidate;
        let Some(word) = self.candidates.get(index).cloned() else {
            return;
        };
        let translator = self.ctx.translator.clone();
        let spacing = self.ctx.config.timing.translation_spacing;
        let from = self.ctx.config.languages.primary.clone();
        let to = self.ctx.config.languages.secondary.clone();

        self.ctx.progress(format!(
            "2/3: translating {word} ({}/{})",
            self.secondary.len() + 1,
            self.ctx.config.quiz.questions_per_language
        ));
        runner.run(id(Step::CandidateTranslation { candidate: index }), async move {
            tokio::time::sleep(spacing).await;
            translator
                .translate(&word, &from, &to)
                .await
                .map(TaskOutput::Translation)
        });
    }

    /// Apply one routed result
    pub(crate) fn handle(&mut self, envelope: ResultEnvelope, runner: &TaskRunner) -> InitProgress {
        match (self.state, envelope.id.step) {
            (InitState::FetchingSourceWords, Step::SourceWords) => {
                self.on_source_words(envelope.outcome, runner)
            }
            (InitState::TranslatingSecondarySources, Step::CandidateTranslation { candidate })
                if candidate == self.next_candidate =>
            {
                self.on_candidate(envelope.outcome, runner)
            }
            (state, _) => {
                tracing::warn!(id = %envelope.id, ?state, "Initializer ignoring unexpected result");
                InitProgress::Pending
            }
        }
    }

    fn on_source_words(&mut self, outcome: Result<TaskOutput>, runner: &TaskRunner) -> InitProgress {
        let raw = match outcome.and_then(TaskOutput::into_words) {
            Ok(raw) => raw,
            Err(e) => {
                return match disposition(
                    FailureStage::SourceWords,
                    &e,
                    self.attempt,
                    &self.ctx.config.retry,
                ) {
                    Disposition::Retry { delay } => {
                        self.attempt += 1;
                        tracing::warn!(
                            error = %e,
                            attempt = self.attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Source word fetch failed, retrying"
                        );
                        self.issue_fetch(runner, delay);
                        InitProgress::Pending
                    }
                    _ => self.fail(e),
                };
            }
        };

        let quiz = &self.ctx.config.quiz;
        let needed = quiz.required_source_words();
        let words = normalize_source_words(&raw);
        tracing::debug!(raw = raw.len(), valid = words.len(), needed, "Filtered source words");
        if words.len() < needed {
            return self.fail(Error::QuotaUnreachable {
                what: "source words".to_string(),
                needed,
                got: words.len(),
            });
        }

        let split = quiz.questions_per_language;
        self.primary = words[..split].to_vec();
        self.candidates = words[split..needed].to_vec();
        self.reserved = self.primary.iter().map(|w| w.to_lowercase()).collect();
        self.next_candidate = 0;
        self.secondary.clear();
        self.state = InitState::TranslatingSecondarySources;

        self.issue_candidate(runner);
        InitProgress::Pending
    }

    fn accept_candidate(&self, outcome: Result<TaskOutput>) -> Result<String> {
        let translation = outcome
            .and_then(TaskOutput::into_translation)?
            .ok_or_else(|| Error::Validation("no translation returned".to_string()))?;
        let word = accept_secondary_translation(
            &translation,
            &self.ctx.config.languages.secondary_extra_letters,
        )
        .ok_or_else(|| Error::Validation(format!("rejected translation '{translation}'")))?;
        if self.secondary.iter().any(|w| eq_ignore_case(w, &word)) {
            return Err(Error::Validation(format!("duplicate translation '{word}'")));
        }
        Ok(word)
    }

    fn on_candidate(&mut self, outcome: Result<TaskOutput>, runner: &TaskRunner) -> InitProgress {
        let candidate = self
            .candidates
            .get(self.next_candidate)
            .cloned()
            .unwrap_or_default();

        match self.accept_candidate(outcome) {
            Ok(word) => {
                tracing::debug!(candidate = %candidate, translation = %word, "Accepted secondary word");
                self.reserved.insert(candidate.to_lowercase());
                self.secondary.push(word);
            }
            Err(e) => {
                match disposition(
                    FailureStage::CandidateTranslation,
                    &e,
                    0,
                    &self.ctx.config.retry,
                ) {
                    Disposition::Skip => {
                        tracing::warn!(candidate = %candidate, error = %e, "Skipping candidate");
                    }
                    _ => return self.fail(e),
                }
            }
        }
        self.next_candidate += 1;

        let quota = self.ctx.config.quiz.questions_per_language;
        if self.secondary.len() >= quota {
            self.state = InitState::Done;
            self.ctx.progress("3/3: word pools ready");
            tracing::info!(
                primary = self.primary.len(),
                secondary = self.secondary.len(),
                candidates_tried = self.next_candidate,
                "Word pool initialization complete"
            );
            return InitProgress::Done(WordPools {
                primary: WordPool::new(std::mem::take(&mut self.primary)),
                secondary: WordPool::new(std::mem::take(&mut self.secondary)),
                reserved: std::mem::take(&mut self.reserved),
            });
        }

        if self.next_candidate < self.candidates.len() {
            self.issue_candidate(runner);
            InitProgress::Pending
        } else {
            self.fail(Error::QuotaUnreachable {
                what: "secondary-language words".to_string(),
                needed: quota,
                got: self.secondary.len(),
            })
        }
    }

    fn fail(&mut self, error: Error) -> InitProgress {
        self.state = InitState::Error;
        tracing::error!(error = %error, "Word pool initialization failed");
        InitProgress::Failed(error)
    }
}
