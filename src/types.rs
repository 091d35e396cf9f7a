//! Core types and events

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Quiz language phase
///
/// Phases always run in [`Language::ORDER`]: primary words are sourced
/// directly, secondary words are derived by translating primary candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Language the source words are fetched in
    Primary,
    /// Language derived from the primary candidates
    Secondary,
}

impl Language {
    /// Fixed phase order of a session
    pub const ORDER: [Language; 2] = [Language::Primary, Language::Secondary];
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Primary => write!(f, "primary"),
            Language::Secondary => write!(f, "secondary"),
        }
    }
}

/// Fixed-size, pre-validated list of quiz words for one language
///
/// Built once by the session initializer and read-only afterwards; questions
/// consume it by index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPool(Vec<String>);

impl WordPool {
    /// Wrap an already validated word list
    pub fn new(words: Vec<String>) -> Self {
        Self(words)
    }

    /// Word at a question index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Number of words in the pool
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the words in question order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Both language pools, published once initialization completes
#[derive(Clone, Debug, Default)]
pub struct WordPools {
    /// Words asked during the primary phase
    pub primary: WordPool,
    /// Words asked during the secondary phase
    pub secondary: WordPool,
    /// Lowercased primary-language words already claimed by the pools
    ///
    /// Distractor sources are never drawn from this set.
    pub reserved: HashSet<String>,
}

impl WordPools {
    /// Pool for a language phase
    pub fn pool(&self, language: Language) -> &WordPool {
        match language {
            Language::Primary => &self.primary,
            Language::Secondary => &self.secondary,
        }
    }
}

/// A fully prepared quiz question
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Word shown to the player
    pub source_word: String,
    /// The one correct answer (target language)
    pub correct_translation: String,
    /// Exactly two wrong answers (target language)
    pub distractors: [String; 2],
}

impl Question {
    /// All three answer options in a random order
    pub fn shuffled_options(&self) -> Vec<String> {
        let mut options = vec![
            self.correct_translation.clone(),
            self.distractors[0].clone(),
            self.distractors[1].clone(),
        ];
        options.shuffle(&mut rand::thread_rng());
        options
    }

    /// Grade a selected option by exact string equality
    pub fn grade(&self, selected: &str) -> Grade {
        if selected == self.correct_translation {
            Grade::Correct
        } else {
            Grade::Incorrect {
                expected: self.correct_translation.clone(),
            }
        }
    }
}

/// Outcome of grading one answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Grade {
    /// Selected option matched the correct translation exactly
    Correct,
    /// Anything else
    Incorrect {
        /// The correct translation
        expected: String,
    },
}

impl Grade {
    /// Whether the answer was correct
    pub fn is_correct(&self) -> bool {
        matches!(self, Grade::Correct)
    }
}

/// Score of a finished session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Questions the player answered
    pub answered: usize,
    /// Answers graded correct
    pub correct: usize,
    /// Questions abandoned because the correct translation could not be fetched
    pub skipped: usize,
}

/// Event emitted to the presentation layer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Human-readable status while work is in flight
    Progress {
        /// Status message
        message: String,
    },

    /// A language phase has started
    LanguageStarted {
        /// Phase that started
        language: Language,
        /// Provider code of that language
        code: String,
    },

    /// A question is ready to be shown and answered
    QuestionReady {
        /// Phase the question belongs to
        language: Language,
        /// Zero-based index within the phase
        index: usize,
        /// Questions per phase
        total: usize,
        /// The prepared question
        question: Question,
        /// The three answer options, shuffled
        options: Vec<String>,
    },

    /// A question index was skipped because its correct translation failed
    QuestionSkipped {
        /// Phase the question belonged to
        language: Language,
        /// Zero-based index within the phase
        index: usize,
        /// Why the question was abandoned
        reason: String,
    },

    /// An answer was graded
    AnswerGraded {
        /// Phase the question belonged to
        language: Language,
        /// Zero-based index within the phase
        index: usize,
        /// Option the player selected
        selected: String,
        /// Grading outcome
        grade: Grade,
    },

    /// Every phase is complete; no further events follow
    SessionFinished {
        /// Final score
        summary: SessionSummary,
    },

    /// The session cannot continue
    FatalError {
        /// Why the session ended
        reason: String,
    },
}
