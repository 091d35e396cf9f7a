//! Configuration types for lingo-quiz

use crate::error::{Error, Result};
use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Language codes used by the quiz
///
/// Questions are asked in `primary` then `secondary`; answers are always in `target`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language the source words are fetched in (default: "en")
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Language derived by translating primary candidates (default: "de")
    #[serde(default = "default_secondary")]
    pub secondary: String,

    /// Language of every answer option (default: "th")
    #[serde(default = "default_target")]
    pub target: String,

    /// Letters outside a-z that count as alphabetic in the secondary language (default: "äöüß")
    #[serde(default = "default_secondary_extra_letters")]
    pub secondary_extra_letters: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            target: default_target(),
            secondary_extra_letters: default_secondary_extra_letters(),
        }
    }
}

impl LanguageConfig {
    /// Provider code for a quiz language
    pub fn code(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.primary,
            Language::Secondary => &self.secondary,
        }
    }
}

/// Quotas governing how many words and questions a session needs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Questions asked per language phase (default: 5)
    #[serde(default = "default_questions_per_language")]
    pub questions_per_language: usize,

    /// Extra primary words tried for secondary translation beyond the quota (default: 5)
    ///
    /// Translations get rejected often enough that the initializer needs
    /// headroom: it attempts `questions_per_language + candidate_headroom`
    /// candidates before giving up.
    #[serde(default = "default_candidate_headroom")]
    pub candidate_headroom: usize,

    /// Random words fetched when picking two distractor sources (default: 6)
    #[serde(default = "default_distractor_fetch_count")]
    pub distractor_fetch_count: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions_per_language: default_questions_per_language(),
            candidate_headroom: default_candidate_headroom(),
            distractor_fetch_count: default_distractor_fetch_count(),
        }
    }
}

impl QuizConfig {
    /// Number of secondary-language candidates the initializer may try
    pub fn candidate_count(&self) -> usize {
        self.questions_per_language + self.candidate_headroom
    }

    /// Valid words needed after filtering before the pools can be split
    pub fn required_source_words(&self) -> usize {
        self.questions_per_language + self.candidate_count()
    }

    /// Raw words requested from the word source (twice what is needed)
    pub fn source_fetch_count(&self) -> usize {
        self.required_source_words() * 2
    }
}

/// Timing knobs for the coordinator and its worker tasks
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How often the coordinator polls the result channel (default: 100ms)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Delay before each initializer translation request (default: 1100ms)
    #[serde(default = "default_translation_spacing", with = "duration_ms_serde")]
    pub translation_spacing: Duration,

    /// Delay before the correct-answer translation request (default: 600ms)
    #[serde(
        default = "default_correct_translation_delay",
        with = "duration_ms_serde"
    )]
    pub correct_translation_delay: Duration,

    /// Delay before each distractor translation request (default: 800ms)
    #[serde(default = "default_distractor_delay", with = "duration_ms_serde")]
    pub distractor_delay: Duration,

    /// Pause after grading before the next question is prepared (default: 2000ms)
    #[serde(default = "default_presentation_delay", with = "duration_ms_serde")]
    pub presentation_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            translation_spacing: default_translation_spacing(),
            correct_translation_delay: default_correct_translation_delay(),
            distractor_delay: default_distractor_delay(),
            presentation_delay: default_presentation_delay(),
        }
    }
}

/// Remote provider endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Random word list endpoint (default: "https://random-word-api.vercel.app/api")
    #[serde(default = "default_word_source_url")]
    pub word_source_url: String,

    /// Translation endpoint (default: "https://api.mymemory.translated.net/get")
    #[serde(default = "default_translator_url")]
    pub translator_url: String,

    /// Per-request timeout enforced by the HTTP clients (default: 15s)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            word_source_url: default_word_source_url(),
            translator_url: default_translator_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient provider failures
///
/// Only the initializer's source-word fetch is retried; every other step
/// skips or substitutes (see [`crate::retry::disposition`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Top-level session configuration
///
/// Every field has a default, so `Config::default()` runs the classic
/// English/German to Thai quiz with five questions per language.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language codes
    #[serde(default)]
    pub languages: LanguageConfig,

    /// Quotas
    #[serde(default)]
    pub quiz: QuizConfig,

    /// Polling cadence and request spacing
    #[serde(default)]
    pub timing: TimingConfig,

    /// Provider endpoints
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Retry behaviour for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Check the configuration for values the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.quiz.questions_per_language == 0 {
            return Err(Error::config(
                "quiz.questions_per_language",
                "must be at least 1",
            ));
        }
        if self.quiz.distractor_fetch_count < 2 {
            return Err(Error::config(
                "quiz.distractor_fetch_count",
                "must be at least 2",
            ));
        }
        if self.timing.poll_interval.is_zero() {
            return Err(Error::config("timing.poll_interval", "must be non-zero"));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be a finite number of at least 1.0",
            ));
        }

        let langs = &self.languages;
        for (key, code) in [
            ("languages.primary", &langs.primary),
            ("languages.secondary", &langs.secondary),
            ("languages.target", &langs.target),
        ] {
            if code.trim().is_empty() {
                return Err(Error::config(key, "language code must not be empty"));
            }
        }
        if langs.primary.eq_ignore_ascii_case(&langs.secondary) {
            return Err(Error::config(
                "languages.secondary",
                "must differ from the primary language",
            ));
        }

        for (key, raw) in [
            ("providers.word_source_url", &self.providers.word_source_url),
            ("providers.translator_url", &self.providers.translator_url),
        ] {
            url::Url::parse(raw).map_err(|e| Error::config(key, format!("invalid URL: {e}")))?;
        }

        Ok(())
    }
}

// Default value functions
fn default_primary() -> String {
    "en".to_string()
}

fn default_secondary() -> String {
    "de".to_string()
}

fn default_target() -> String {
    "th".to_string()
}

fn default_secondary_extra_letters() -> String {
    "äöüß".to_string()
}

fn default_questions_per_language() -> usize {
    5
}

fn default_candidate_headroom() -> usize {
    5
}

fn default_distractor_fetch_count() -> usize {
    6
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_translation_spacing() -> Duration {
    Duration::from_millis(1100)
}

fn default_correct_translation_delay() -> Duration {
    Duration::from_millis(600)
}

fn default_distractor_delay() -> Duration {
    Duration::from_millis(800)
}

fn default_presentation_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_word_source_url() -> String {
    "https://random-word-api.vercel.app/api".to_string()
}

fn default_translator_url() -> String {
    "https://api.mymemory.translated.net/get".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Durations are written as whole milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
