//! Fake providers and configuration shared by the integration tests

use lingo_quiz::config::{RetryConfig, TimingConfig};
use lingo_quiz::{Config, Error, Result, Translator, WordSource};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Config with every delay removed and a 1ms poll interval
pub fn fast_config() -> Config {
    Config {
        timing: TimingConfig {
            poll_interval: Duration::from_millis(1),
            translation_spacing: Duration::ZERO,
            correct_translation_delay: Duration::ZERO,
            distractor_delay: Duration::ZERO,
            presentation_delay: Duration::ZERO,
        },
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}

/// Distinct lowercase six-letter words, numbered from `start`
pub fn generated_words(start: usize, n: usize) -> Vec<String> {
    (start..start + n)
        .map(|i| {
            let letter = |d: usize| char::from(b'a' + (d % 26) as u8);
            format!("qzx{}{}{}", letter(i / 676), letter(i / 26), letter(i))
        })
        .collect()
}

/// Word source that never repeats a word across calls
#[derive(Default)]
pub struct SequentialWords {
    next: AtomicUsize,
    calls: AtomicUsize,
}

impl SequentialWords {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WordSource for SequentialWords {
    async fn fetch(&self, count: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = self.next.fetch_add(count, Ordering::SeqCst);
        Ok(generated_words(start, count))
    }
}

/// Translator that answers `"{text}-{target}"`, with optional failure injection
#[derive(Default)]
pub struct EchoTranslator {
    /// `(source, target)` language pairs that report a rate limit
    pub rate_limited_pairs: HashSet<(String, String)>,
    /// `(source, target)` language pairs that never produce a translation
    pub silent_pairs: HashSet<(String, String)>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl EchoTranslator {
    pub fn rate_limiting(source: &str, target: &str) -> Self {
        Self {
            rate_limited_pairs: [(source.to_string(), target.to_string())].into(),
            ..Self::default()
        }
    }

    pub fn silent(source: &str, target: &str) -> Self {
        Self {
            silent_pairs: [(source.to_string(), target.to_string())].into(),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Translator for EchoTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.requests.lock().unwrap().push((
            text.to_string(),
            source_lang.to_string(),
            target_lang.to_string(),
        ));

        let pair = (source_lang.to_string(), target_lang.to_string());
        if self.rate_limited_pairs.contains(&pair) {
            return Err(Error::RateLimited {
                provider: "echo".to_string(),
            });
        }
        if self.silent_pairs.contains(&pair) {
            return Ok(None);
        }
        Ok(Some(format!("{text}-{target_lang}")))
    }
}
