//! Quiz session orchestration split into focused submodules.
//!
//! A [`QuizSession`] owns every state machine and runs them on one
//! coordinating task; provider calls run on spawned worker tasks and report
//! back through a single result channel:
//! - `runner` - Spawns work and posts exactly one tagged envelope per task
//! - `dispatcher` - Drains the result channel and drops stale envelopes
//! - `initializer` - Builds the primary and secondary word pools
//! - `question` - Builds one question (correct answer plus two distractors)
//! - `progressor` - Walks language phases and question indices, grades answers
//!
//! Only the coordinating task mutates pools, questions or scores.

mod context;
pub(crate) mod dispatcher;
pub(crate) mod initializer;
pub(crate) mod progressor;
pub(crate) mod question;
pub(crate) mod runner;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::providers::{Translator, WordSource};
use crate::types::{Event, Question, SessionSummary};
use context::PipelineContext;
use dispatcher::{Owner, ResultDispatcher};
use initializer::{InitProgress, SessionInitializer};
use progressor::{Next, ProgressState, SessionProgressor};
use question::{BuildProgress, QuestionBuilder};
use runner::{ResultEnvelope, TaskRunner};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Caller-side handle to a running [`QuizSession`] (cheap to clone)
#[derive(Clone)]
pub struct QuizHandle {
    event_tx: broadcast::Sender<Event>,
    answer_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl QuizHandle {
    /// Subscribe to session events
    ///
    /// Subscribe before calling [`QuizSession::run`] to see every event.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Submit the player's selected option for the current question
    ///
    /// Answers that arrive while no question is awaiting one are ignored.
    pub fn submit_answer(&self, selected: impl Into<String>) -> Result<()> {
        self.answer_tx
            .send(selected.into())
            .map_err(|_| Error::SessionClosed)
    }

    /// Stop the session; [`QuizSession::run`] returns [`Error::Cancelled`]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`QuizHandle::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

enum Wake {
    Cancelled,
    Advance,
    Answer(Option<String>),
    Tick,
}

/// One quiz session: both language phases, start to finish
pub struct QuizSession {
    ctx: PipelineContext,
    runner: TaskRunner,
    dispatcher: ResultDispatcher,
    initializer: SessionInitializer,
    builder: QuestionBuilder,
    progressor: Option<SessionProgressor>,
    answers: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    advance_at: Option<Instant>,
    outcome: Option<Result<SessionSummary>>,
}

impl QuizSession {
    /// Create a session and the handle used to drive it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn new(
        config: Config,
        words: Arc<dyn WordSource>,
        translator: Arc<dyn Translator>,
    ) -> Result<(Self, QuizHandle)> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(1000);
        let (answer_tx, answers) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let (runner, dispatcher) = dispatcher::channel();

        let ctx = PipelineContext {
            config: Arc::new(config),
            words,
            translator,
            event_tx: event_tx.clone(),
        };

        let session = Self {
            initializer: SessionInitializer::new(ctx.clone()),
            builder: QuestionBuilder::new(ctx.clone()),
            ctx,
            runner,
            dispatcher,
            progressor: None,
            answers,
            cancel: cancel.clone(),
            advance_at: None,
            outcome: None,
        };
        let handle = QuizHandle {
            event_tx,
            answer_tx,
            cancel,
        };
        Ok((session, handle))
    }

    /// Run the session to completion on the current task
    ///
    /// Returns the final score once both language phases are done.
    ///
    /// # Errors
    ///
    /// - Initialization failures ([`Error::QuotaUnreachable`], [`Error::RateLimited`], provider errors)
    /// - [`Error::InsufficientPool`] when a phase cannot start
    /// - [`Error::Cancelled`] after [`QuizHandle::cancel`]
    /// - [`Error::SessionClosed`] when every [`QuizHandle`] was dropped
    pub async fn run(mut self) -> Result<SessionSummary> {
        tracing::info!(
            primary = %self.ctx.config.languages.primary,
            secondary = %self.ctx.config.languages.secondary,
            target = %self.ctx.config.languages.target,
            "Quiz session starting"
        );

        self.dispatcher.set_phase(Some(Owner::Initializer));
        if let Err(e) = self.initializer.start(&self.runner) {
            self.fatal(e);
        }

        let mut poll = tokio::time::interval(self.ctx.config.timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }

            let advance_at = self.advance_at;
            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = tokio::time::sleep_until(advance_at.unwrap_or_else(Instant::now)),
                    if advance_at.is_some() => Wake::Advance,
                answer = self.answers.recv() => Wake::Answer(answer),
                _ = poll.tick() => Wake::Tick,
            };

            match wake {
                Wake::Cancelled => {
                    self.dispatcher.set_phase(None);
                    tracing::info!(
                        init_state = ?self.initializer.state(),
                        build_state = ?self.builder.state(),
                        summary = ?self.progressor.as_ref().map(SessionProgressor::summary),
                        stale_results = self.dispatcher.discarded(),
                        "Quiz session cancelled"
                    );
                    return Err(Error::Cancelled);
                }
                Wake::Advance => self.advance(),
                Wake::Answer(Some(selected)) => self.answer(selected),
                Wake::Answer(None) => {
                    tracing::warn!("Every quiz handle was dropped, ending session");
                    return Err(Error::SessionClosed);
                }
                Wake::Tick => {
                    if let Some(envelope) = self.dispatcher.poll() {
                        self.route(envelope);
                    }
                }
            }
        }
    }

    fn route(&mut self, envelope: ResultEnvelope) {
        match envelope.id.owner {
            Owner::Initializer => match self.initializer.handle(envelope, &self.runner) {
                InitProgress::Pending => {}
                InitProgress::Done(pools) => {
                    self.dispatcher.set_phase(None);
                    let mut progressor = SessionProgressor::new(pools, &self.ctx.config);
                    let next = progressor.start();
                    self.progressor = Some(progressor);
                    self.apply(next);
                }
                InitProgress::Failed(e) => self.fatal(e),
            },
            Owner::Question { .. } => {
                let Some(progressor) = self.progressor.as_ref() else {
                    tracing::warn!(id = %envelope.id, "Question result before pools are ready");
                    return;
                };
                let reserved = &progressor.pools().reserved;
                let progress = self.builder.handle(envelope, reserved, &self.runner);
                match progress {
                    BuildProgress::Pending => {}
                    BuildProgress::Ready(question) => self.question_ready(question),
                    BuildProgress::Failed(e) => self.question_failed(e),
                }
            }
        }
    }

    fn apply(&mut self, next: Next) {
        match next {
            Next::Build {
                language,
                index,
                word,
            } => {
                let total = self.ctx.config.quiz.questions_per_language;
                if index == 0 {
                    self.ctx.emit(Event::LanguageStarted {
                        language,
                        code: self.ctx.config.languages.code(language).to_string(),
                    });
                }
                self.ctx
                    .progress(format!("Preparing question {}/{total}", index + 1));
                let owner = self.builder.begin(&word, language, &self.runner);
                self.dispatcher.set_phase(Some(owner));
            }
            Next::Finished(summary) => {
                self.dispatcher.set_phase(None);
                tracing::debug!(
                    stale_results = self.dispatcher.discarded(),
                    "Stale results dropped during the session"
                );
                self.ctx.emit(Event::SessionFinished { summary });
                self.outcome = Some(Ok(summary));
            }
            Next::Fatal(e) => self.fatal(e),
        }
    }

    fn question_ready(&mut self, question: Question) {
        self.dispatcher.set_phase(None);
        let Some(progressor) = self.progressor.as_mut() else {
            return;
        };
        let Some(language) = progressor.language() else {
            self.fatal(Error::InvalidState("question ready outside a language phase".into()));
            return;
        };
        let index = progressor.question_index();
        let options = question.shuffled_options();

        if let Err(e) = progressor.question_ready(question.clone()) {
            self.fatal(e);
            return;
        }
        self.ctx.emit(Event::QuestionReady {
            language,
            index,
            total: self.ctx.config.quiz.questions_per_language,
            question,
            options,
        });
    }

    fn question_failed(&mut self, error: Error) {
        self.dispatcher.set_phase(None);
        let Some(progressor) = self.progressor.as_mut() else {
            return;
        };
        if let Some(language) = progressor.language() {
            self.ctx.emit(Event::QuestionSkipped {
                language,
                index: progressor.question_index(),
                reason: error.to_string(),
            });
        }
        match progressor.skip_question() {
            Ok(next) => self.apply(next),
            Err(e) => self.fatal(e),
        }
    }

    fn answer(&mut self, selected: String) {
        let Some(progressor) = self.progressor.as_mut() else {
            tracing::debug!("Ignoring answer before the first question");
            return;
        };
        if progressor.state() != ProgressState::AwaitingAnswer {
            tracing::debug!(state = ?progressor.state(), "Ignoring answer, no question awaiting one");
            return;
        }
        let (Some(language), index) = (progressor.language(), progressor.question_index()) else {
            return;
        };

        match progressor.submit_answer(&selected) {
            Ok(grade) => {
                self.ctx.emit(Event::AnswerGraded {
                    language,
                    index,
                    selected,
                    grade,
                });
                self.advance_at = Some(Instant::now() + self.ctx.config.timing.presentation_delay);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring answer"),
        }
    }

    fn advance(&mut self) {
        self.advance_at = None;
        let Some(progressor) = self.progressor.as_mut() else {
            return;
        };
        match progressor.advance() {
            Ok(next) => self.apply(next),
            Err(e) => self.fatal(e),
        }
    }

    fn fatal(&mut self, error: Error) {
        tracing::error!(error = %error, "Quiz session failed");
        self.dispatcher.set_phase(None);
        self.advance_at = None;
        self.ctx.emit(Event::FatalError {
            reason: error.to_string(),
        });
        self.outcome = Some(Err(error));
    }
}
