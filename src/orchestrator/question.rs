//! Question builder: one correct translation plus two distractors per word.
//!
//! ```text
//! Idle -> GettingCorrectTranslation -> GettingDistractorSourceWords
//!              |                               |
//!          (failure)                   TranslatingDistractors (2 slots, concurrent)
//!              v                               v
//!            Idle                      Ready(Question) -> Idle
//! ```
//!
//! Every run gets a fresh epoch, so results from an abandoned run carry a
//! stale owner and are dropped by the dispatcher before they get here.

use super::context::PipelineContext;
use super::dispatcher::{CorrelationId, Owner, Step};
use super::runner::{ResultEnvelope, TaskOutput, TaskRunner};
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::retry::{Disposition, FailureStage, disposition};
use crate::types::{Language, Question};
use crate::validation::{eq_ignore_case, pick_distractor_sources};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Distractor slots per question
pub const DISTRACTOR_SLOTS: usize = 2;

/// Retry-or-skip policy consulted on every failed step
pub(crate) type Policy = fn(FailureStage, &Error, u32, &RetryConfig) -> Disposition;

/// Builder state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    /// No question in progress
    Idle,
    /// Waiting for the question word's translation
    GettingCorrectTranslation,
    /// Waiting for random distractor source words
    GettingDistractorSourceWords,
    /// Waiting for the two distractor pipelines
    TranslatingDistractors,
}

/// Result of feeding one envelope to the builder
#[derive(Debug)]
pub enum BuildProgress {
    /// More results are needed
    Pending,
    /// The question is complete; the builder is idle again
    Ready(Question),
    /// The question was abandoned; the builder is idle again
    Failed(Error),
}

pub(crate) struct QuestionBuilder {
    ctx: PipelineContext,
    policy: Policy,
    epoch: u64,
    state: BuildState,
    language: Language,
    source_word: String,
    correct: String,
    attempt: u32,
    sources: [String; DISTRACTOR_SLOTS],
    slot_attempts: [u32; DISTRACTOR_SLOTS],
    slots: [Option<String>; DISTRACTOR_SLOTS],
}

impl QuestionBuilder {
    pub(crate) fn new(ctx: PipelineContext) -> Self {
        Self::with_policy(ctx, disposition)
    }

    pub(crate) fn with_policy(ctx: PipelineContext, policy: Policy) -> Self {
        Self {
            ctx,
            policy,
            epoch: 0,
            state: BuildState::Idle,
            language: Language::Primary,
            source_word: String::new(),
            correct: String::new(),
            attempt: 0,
            sources: Default::default(),
            slot_attempts: [0; DISTRACTOR_SLOTS],
            slots: Default::default(),
        }
    }

    pub(crate) fn state(&self) -> BuildState {
        self.state
    }

    /// Phase tag of the current run
    pub(crate) fn owner(&self) -> Owner {
        Owner::Question { epoch: self.epoch }
    }

    fn id(&self, step: Step) -> CorrelationId {
        CorrelationId {
            owner: self.owner(),
            step,
        }
    }

    fn verdict(&self, stage: FailureStage, error: &Error, attempt: u32) -> Disposition {
        (self.policy)(stage, error, attempt, &self.ctx.config.retry)
    }

    fn abandon(&mut self, error: Error) -> BuildProgress {
        self.state = BuildState::Idle;
        BuildProgress::Failed(error)
    }

    /// Start building a question for `word`, abandoning any run in progress
    ///
    /// Returns the new phase tag; the caller points the dispatcher at it.
    pub(crate) fn begin(&mut self, word: &str, language: Language, runner: &TaskRunner) -> Owner {
        if self.state != BuildState::Idle {
            tracing::debug!(epoch = self.epoch, state = ?self.state, "Abandoning unfinished question");
        }
        self.epoch += 1;
        self.language = language;
        self.source_word = word.to_string();
        self.correct.clear();
        self.attempt = 0;
        self.sources = Default::default();
        self.slot_attempts = [0; DISTRACTOR_SLOTS];
        self.slots = Default::default();
        self.state = BuildState::GettingCorrectTranslation;

        tracing::debug!(epoch = self.epoch, word = %word, %language, "Building question");
        self.ctx.progress(format!("Translating {word}..."));
        self.issue_correct(runner, self.ctx.config.timing.correct_translation_delay);
        self.owner()
    }

    fn issue_correct(&self, runner: &TaskRunner, delay: Duration) {
        let translator = self.ctx.translator.clone();
        let from = self.ctx.config.languages.code(self.language).to_string();
        let to = self.ctx.config.languages.target.clone();
        let text = self.source_word.clone();

        runner.run(self.id(Step::CorrectTranslation), async move {
            tokio::time::sleep(delay).await;
            translator
                .translate(&text, &from, &to)
                .await
                .map(TaskOutput::Translation)
        });
    }

    /// Apply one routed result
    ///
    /// `reserved` holds the lowercased words distractor sources must avoid.
    pub(crate) fn handle(
        &mut self,
        envelope: ResultEnvelope,
        reserved: &HashSet<String>,
        runner: &TaskRunner,
    ) -> BuildProgress {
        if envelope.id.owner != self.owner() {
            tracing::warn!(id = %envelope.id, epoch = self.epoch, "Builder ignoring result from another run");
            return BuildProgress::Pending;
        }

        match (self.state, envelope.id.step) {
            (BuildState::GettingCorrectTranslation, Step::CorrectTranslation) => {
                self.on_correct(envelope.outcome, runner)
            }
            (BuildState::GettingDistractorSourceWords, Step::DistractorWords) => {
                self.on_distractor_words(envelope.outcome, reserved, runner)
            }
            (BuildState::TranslatingDistractors, Step::DistractorTranslation { slot })
                if slot < DISTRACTOR_SLOTS =>
            {
                self.on_distractor(slot, envelope.outcome, runner)
            }
            (state, _) => {
                tracing::warn!(id = %envelope.id, ?state, "Builder ignoring unexpected result");
                BuildProgress::Pending
            }
        }
    }

    fn on_correct(&mut self, outcome: Result<TaskOutput>, runner: &TaskRunner) -> BuildProgress {
        let translation = outcome
            .and_then(TaskOutput::into_translation)
            .and_then(|text| {
                text.map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| Error::Validation("empty correct translation".to_string()))
            });

        let e = match translation {
            Ok(text) => {
                self.correct = text;
                self.attempt = 0;
                self.state = BuildState::GettingDistractorSourceWords;
                self.issue_distractor_words(runner, Duration::ZERO);
                return BuildProgress::Pending;
            }
            Err(e) => e,
        };

        match self.verdict(FailureStage::CorrectTranslation, &e, self.attempt) {
            Disposition::Retry { delay } => {
                self.attempt += 1;
                tracing::warn!(word = %self.source_word, error = %e, attempt = self.attempt, "Correct translation failed, retrying");
                self.issue_correct(runner, delay);
                BuildProgress::Pending
            }
            Disposition::Skip => {
                tracing::warn!(word = %self.source_word, error = %e, "Correct translation failed, abandoning question");
                self.abandon(e)
            }
            other => {
                tracing::warn!(word = %self.source_word, error = %e, disposition = ?other, "No substitute for a correct translation, abandoning question");
                self.abandon(e)
            }
        }
    }

    fn issue_distractor_words(&self, runner: &TaskRunner, delay: Duration) {
        let words = self.ctx.words.clone();
        let count = self.ctx.config.quiz.distractor_fetch_count;
        self.ctx.progress("Fetching distractors...");
        runner.run(self.id(Step::DistractorWords), async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            words.fetch(count).await.map(TaskOutput::Words)
        });
    }

    fn on_distractor_words(
        &mut self,
        outcome: Result<TaskOutput>,
        reserved: &HashSet<String>,
        runner: &TaskRunner,
    ) -> BuildProgress {
        let mut sources = match outcome.and_then(TaskOutput::into_words) {
            Ok(fetched) => pick_distractor_sources(
                &fetched,
                reserved,
                &self.source_word,
                DISTRACTOR_SLOTS,
            ),
            Err(e) => match self.verdict(FailureStage::DistractorWords, &e, self.attempt) {
                Disposition::Substitute => {
                    tracing::warn!(error = %e, "Distractor word fetch failed, using decoys");
                    Vec::new()
                }
                Disposition::Retry { delay } => {
                    self.attempt += 1;
                    tracing::warn!(error = %e, attempt = self.attempt, "Distractor word fetch failed, retrying");
                    self.issue_distractor_words(runner, delay);
                    return BuildProgress::Pending;
                }
                other => {
                    tracing::warn!(error = %e, disposition = ?other, "Distractor word fetch failed, abandoning question");
                    return self.abandon(e);
                }
            },
        };
        while sources.len() < DISTRACTOR_SLOTS {
            sources.push(format!("Decoy{}", sources.len() + 1));
        }

        self.state = BuildState::TranslatingDistractors;
        let delay = self.ctx.config.timing.distractor_delay;
        for (slot, source) in sources.into_iter().enumerate() {
            self.sources[slot] = source;
            self.issue_distractor(slot, runner, delay);
        }
        BuildProgress::Pending
    }

    fn issue_distractor(&self, slot: usize, runner: &TaskRunner, delay: Duration) {
        let translator = Arc::clone(&self.ctx.translator);
        let languages = &self.ctx.config.languages;
        let primary = languages.primary.clone();
        let secondary = languages.secondary.clone();
        let target = languages.target.clone();
        let language = self.language;
        let source = self.sources[slot].clone();

        tracing::debug!(slot, source = %source, "Dispatching distractor pipeline");
        runner.run(self.id(Step::DistractorTranslation { slot }), async move {
            tokio::time::sleep(delay).await;
            let text = match language {
                Language::Primary => translator.translate(&source, &primary, &target).await?,
                Language::Secondary => {
                    match translator.translate(&source, &primary, &secondary).await? {
                        Some(mid) => translator.translate(&mid, &secondary, &target).await?,
                        None => None,
                    }
                }
            };
            Ok(TaskOutput::Translation(text))
        });
    }

    fn on_distractor(
        &mut self,
        slot: usize,
        outcome: Result<TaskOutput>,
        runner: &TaskRunner,
    ) -> BuildProgress {
        if self.slots[slot].is_some() {
            tracing::warn!(slot, "Duplicate distractor result ignored");
            return BuildProgress::Pending;
        }

        let translation = outcome.and_then(TaskOutput::into_translation).and_then(|text| {
            text.map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| Error::Validation("empty distractor translation".to_string()))
        });
        let text = match translation {
            Ok(text) => text,
            Err(e) => {
                let attempt = self.slot_attempts[slot];
                match self.verdict(FailureStage::DistractorTranslation, &e, attempt) {
                    Disposition::Substitute => {
                        tracing::debug!(slot, error = %e, "Distractor pipeline failed, substituting");
                        format!("No option {}", slot + 1)
                    }
                    Disposition::Retry { delay } => {
                        self.slot_attempts[slot] += 1;
                        tracing::warn!(slot, error = %e, attempt = attempt + 1, "Distractor pipeline failed, retrying");
                        self.issue_distractor(slot, runner, delay);
                        return BuildProgress::Pending;
                    }
                    other => {
                        tracing::warn!(slot, error = %e, disposition = ?other, "Distractor pipeline failed, abandoning question");
                        return self.abandon(e);
                    }
                }
            }
        };
        self.slots[slot] = Some(self.make_distinct(slot, text));

        if self.slots.iter().all(Option::is_some) {
            let [first, second] = std::mem::take(&mut self.slots);
            let question = Question {
                source_word: std::mem::take(&mut self.source_word),
                correct_translation: std::mem::take(&mut self.correct),
                distractors: [first.unwrap_or_default(), second.unwrap_or_default()],
            };
            self.state = BuildState::Idle;
            tracing::info!(
                word = %question.source_word,
                correct = %question.correct_translation,
                distractors = ?question.distractors,
                "Question ready"
            );
            return BuildProgress::Ready(question);
        }
        BuildProgress::Pending
    }

    /// Keep a distractor distinct from the correct answer and the other slot
    fn make_distinct(&self, slot: usize, text: String) -> String {
        let taken = |candidate: &str| {
            eq_ignore_case(candidate, &self.correct)
                || self
                    .slots
                    .iter()
                    .flatten()
                    .any(|other| eq_ignore_case(candidate, other))
        };

        if !taken(&text) {
            return text;
        }
        tracing::debug!(slot, text = %text, "Distractor collides, substituting");
        let mut candidate = format!("Random pick {}", slot + 1);
        while taken(&candidate) {
            candidate.push('*');
        }
        candidate
    }
}
