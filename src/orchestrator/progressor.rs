//! Session progressor: walks the language phases and question indices.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Grade, Language, Question, SessionSummary, WordPools};

/// Progressor state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressState {
    /// Choosing the next language phase
    SelectingLanguage,
    /// A question is being prepared
    BuildingQuestion,
    /// A question is shown and waiting for the player
    AwaitingAnswer,
    /// The answer was graded; waiting for the presentation delay
    Grading,
    /// Every phase is done
    Finished,
    /// A phase could not start
    Failed,
}

/// What the coordinator should do next
#[derive(Debug)]
pub(crate) enum Next {
    /// Build the question for `word`
    Build {
        language: Language,
        index: usize,
        word: String,
    },
    /// The session is over
    Finished(SessionSummary),
    /// A phase could not start; the session is over
    Fatal(Error),
}

pub(crate) struct SessionProgressor {
    pools: WordPools,
    questions_per_language: usize,
    primary_code: String,
    secondary_code: String,
    phase: usize,
    index: usize,
    state: ProgressState,
    current: Option<Question>,
    summary: SessionSummary,
}

impl SessionProgressor {
    pub(crate) fn new(pools: WordPools, config: &Config) -> Self {
        Self {
            pools,
            questions_per_language: config.quiz.questions_per_language,
            primary_code: config.languages.primary.clone(),
            secondary_code: config.languages.secondary.clone(),
            phase: 0,
            index: 0,
            state: ProgressState::SelectingLanguage,
            current: None,
            summary: SessionSummary::default(),
        }
    }

    pub(crate) fn state(&self) -> ProgressState {
        self.state
    }

    /// Current language phase, if one is active
    pub(crate) fn language(&self) -> Option<Language> {
        Language::ORDER.get(self.phase).copied()
    }

    pub(crate) fn question_index(&self) -> usize {
        self.index
    }

    pub(crate) fn pools(&self) -> &WordPools {
        &self.pools
    }

    pub(crate) fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Enter the first language phase
    pub(crate) fn start(&mut self) -> Next {
        self.phase = 0;
        self.select_language()
    }

    fn select_language(&mut self) -> Next {
        self.state = ProgressState::SelectingLanguage;
        self.index = 0;

        let Some(language) = self.language() else {
            self.state = ProgressState::Finished;
            tracing::info!(
                answered = self.summary.answered,
                correct = self.summary.correct,
                skipped = self.summary.skipped,
                "Session finished"
            );
            return Next::Finished(self.summary);
        };

        let have = self.pools.pool(language).len();
        if have < self.questions_per_language {
            self.state = ProgressState::Failed;
            let code = match language {
                Language::Primary => &self.primary_code,
                Language::Secondary => &self.secondary_code,
            };
            return Next::Fatal(Error::InsufficientPool {
                language: code.clone(),
                have,
                need: self.questions_per_language,
            });
        }

        tracing::info!(%language, "Starting language phase");
        self.build_current(language)
    }

    fn build_current(&mut self, language: Language) -> Next {
        match self.pools.pool(language).get(self.index) {
            Some(word) => {
                self.state = ProgressState::BuildingQuestion;
                Next::Build {
                    language,
                    index: self.index,
                    word: word.to_string(),
                }
            }
            None => {
                self.state = ProgressState::Failed;
                Next::Fatal(Error::InvalidState(format!(
                    "no {language} word at index {}",
                    self.index
                )))
            }
        }
    }

    /// Hand over a finished question; it is now awaiting an answer
    pub(crate) fn question_ready(&mut self, question: Question) -> Result<()> {
        if self.state != ProgressState::BuildingQuestion {
            return Err(Error::InvalidState(format!(
                "question ready while {:?}",
                self.state
            )));
        }
        self.current = Some(question);
        self.state = ProgressState::AwaitingAnswer;
        Ok(())
    }

    /// Grade the player's selection against the current question
    pub(crate) fn submit_answer(&mut self, selected: &str) -> Result<Grade> {
        if self.state != ProgressState::AwaitingAnswer {
            return Err(Error::InvalidState(format!(
                "no question awaiting an answer ({:?})",
                self.state
            )));
        }
        let question = self
            .current
            .take()
            .ok_or_else(|| Error::InvalidState("awaiting answer without a question".to_string()))?;

        let grade = question.grade(selected);
        self.summary.answered += 1;
        if grade.is_correct() {
            self.summary.correct += 1;
        }
        self.state = ProgressState::Grading;
        tracing::debug!(index = self.index, correct = grade.is_correct(), "Answer graded");
        Ok(grade)
    }

    /// Drop the question being built and move on
    pub(crate) fn skip_question(&mut self) -> Result<Next> {
        if self.state != ProgressState::BuildingQuestion {
            return Err(Error::InvalidState(format!(
                "cannot skip a question while {:?}",
                self.state
            )));
        }
        self.summary.skipped += 1;
        Ok(self.next_index())
    }

    /// Move past a graded question
    pub(crate) fn advance(&mut self) -> Result<Next> {
        if self.state != ProgressState::Grading {
            return Err(Error::InvalidState(format!(
                "cannot advance while {:?}",
                self.state
            )));
        }
        Ok(self.next_index())
    }

    fn next_index(&mut self) -> Next {
        self.index += 1;
        match self.language() {
            Some(language) if self.index < self.questions_per_language => {
                self.build_current(language)
            }
            _ => {
                self.phase += 1;
                self.select_language()
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WordPool;

    fn pools(primary: usize, secondary: usize) -> WordPools {
        let words = |prefix: &str, n: usize| {
            WordPool::new((0..n).map(|i| format!("{prefix}{i}")).collect())
        };
        WordPools {
            primary: words("Word", primary),
            secondary: words("Wort", secondary),
            reserved: Default::default(),
        }
    }

    fn question(word: &str) -> Question {
        Question {
            source_word: word.to_string(),
            correct_translation: format!("{word}-th"),
            distractors: ["x".to_string(), "y".to_string()],
        }
    }

    fn expect_build(next: Next) -> (Language, usize, String) {
        match next {
            Next::Build {
                language,
                index,
                word,
            } => (language, index, word),
            other => panic!("expected Build, got {other:?}"),
        }
    }

    #[test]
    fn test_walks_both_phases_in_order() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 5), &config);

        let mut next = progressor.start();
        let mut seen = Vec::new();
        loop {
            match next {
                Next::Build { language, index, word } => {
                    seen.push((language, index));
                    progressor.question_ready(question(&word)).unwrap();
                    let answer = if index % 2 == 0 { format!("{word}-th") } else { "x".into() };
                    progressor.submit_answer(&answer).unwrap();
                    next = progressor.advance().unwrap();
                }
                Next::Finished(summary) => {
                    assert_eq!(summary.answered, 10);
                    assert_eq!(summary.correct, 6);
                    assert_eq!(summary.skipped, 0);
                    break;
                }
                Next::Fatal(e) => panic!("unexpected fatal: {e}"),
            }
        }

        let expected: Vec<_> = Language::ORDER
            .iter()
            .flat_map(|l| (0..5).map(move |i| (*l, i)))
            .collect();
        assert_eq!(seen, expected);
        assert_eq!(progressor.state(), ProgressState::Finished);
        assert!(progressor.advance().is_err(), "no transitions after Finished");
    }

    #[test]
    fn test_insufficient_pool_is_fatal() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 3), &config);

        let mut next = progressor.start();
        for _ in 0..5 {
            let (_, _, word) = expect_build(next);
            progressor.question_ready(question(&word)).unwrap();
            progressor.submit_answer("nope").unwrap();
            next = progressor.advance().unwrap();
        }

        match next {
            Next::Fatal(Error::InsufficientPool { language, have, need }) => {
                assert_eq!(language, "de");
                assert_eq!(have, 3);
                assert_eq!(need, 5);
            }
            other => panic!("expected InsufficientPool, got {other:?}"),
        }
        assert_eq!(progressor.state(), ProgressState::Failed);
    }

    #[test]
    fn test_grading_is_exact() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 5), &config);
        let (_, _, word) = expect_build(progressor.start());

        progressor.question_ready(question(&word)).unwrap();
        let grade = progressor.submit_answer("WORD0-TH").unwrap();
        assert_eq!(
            grade,
            Grade::Incorrect {
                expected: "Word0-th".to_string()
            }
        );

        let (_, index, word) = expect_build(progressor.advance().unwrap());
        assert_eq!(index, 1);
        progressor.question_ready(question(&word)).unwrap();
        assert!(progressor.submit_answer("Word1-th").unwrap().is_correct());
        assert_eq!(progressor.summary().correct, 1);
    }

    #[test]
    fn test_answer_only_accepted_while_awaiting() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 5), &config);
        let (_, _, word) = expect_build(progressor.start());

        assert!(progressor.submit_answer("early").is_err());
        progressor.question_ready(question(&word)).unwrap();
        progressor.submit_answer("Word0-th").unwrap();
        assert!(progressor.submit_answer("again").is_err(), "second answer ignored");
        assert_eq!(progressor.summary().answered, 1);
    }

    #[test]
    fn test_skip_advances_to_next_index() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 5), &config);
        expect_build(progressor.start());

        let (language, index, word) = expect_build(progressor.skip_question().unwrap());
        assert_eq!((language, index, word.as_str()), (Language::Primary, 1, "Word1"));
        assert_eq!(progressor.summary().skipped, 1);
        assert!(progressor.advance().is_err(), "cannot advance without grading");
    }

    #[test]
    fn test_skipping_last_primary_moves_to_secondary() {
        let config = Config::default();
        let mut progressor = SessionProgressor::new(pools(5, 5), &config);
        let mut next = progressor.start();
        for _ in 0..5 {
            expect_build(next);
            next = progressor.skip_question().unwrap();
        }
        let (language, index, word) = expect_build(next);
        assert_eq!(language, Language::Secondary);
        assert_eq!(index, 0);
        assert_eq!(word, "Wort0");
        assert_eq!(progressor.language(), Some(Language::Secondary));
        assert_eq!(progressor.question_index(), 0);
    }
}
