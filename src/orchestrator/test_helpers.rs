//! Scripted providers and fast configuration for orchestrator tests.

use super::context::PipelineContext;
use crate::config::{Config, RetryConfig, TimingConfig};
use crate::error::{Error, Result};
use crate::providers::{Translator, WordSource};
use crate::types::Event;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Config with every delay removed and a 1ms poll interval
pub(crate) fn fast_config() -> Config {
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

/// `n` distinct valid lowercase source words, numbered from `start`
pub(crate) fn word_list(start: usize, n: usize) -> Vec<String> {
    (start..start + n)
        .map(|i| {
            let letter = |d: usize| char::from(b'a' + (d % 26) as u8);
            format!("wrd{}{}{}", letter(i / 676), letter(i / 26), letter(i))
        })
        .collect()
}

/// Canned translator reply
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Text(String),
    Nothing,
    RateLimited,
    Fail,
    /// Fail the first request, then answer with the text
    FailOnce(String),
    Slow(Duration, String),
}

impl Reply {
    pub(crate) fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Word source that serves queued responses, then fresh generated words
pub(crate) struct ScriptedWordSource {
    queued: Mutex<VecDeque<Result<Vec<String>>>>,
    calls: AtomicUsize,
}

impl ScriptedWordSource {
    pub(crate) fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, response: Result<Vec<String>>) -> &Self {
        self.queued.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WordSource for ScriptedWordSource {
    async fn fetch(&self, count: usize) -> Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.queued.lock().unwrap().pop_front() {
            return response;
        }
        Ok(word_list(1000 + call * 100, count))
    }
}

type Key = (String, String, String);

/// Translator with per-request rules; unmatched requests get `"{text}-{target}"`
pub(crate) struct ScriptedTranslator {
    rules: Mutex<HashMap<Key, Reply>>,
    calls: Mutex<Vec<Key>>,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedTranslator {
    pub(crate) fn new() -> Self {
        Self {
            rules: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn rule(&self, text: &str, from: &str, to: &str, reply: Reply) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .insert((text.to_string(), from.to_string(), to.to_string()), reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Key> {
        self.calls.lock().unwrap().clone()
    }

    /// When each request reached the translator, in order
    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let key = (
            text.to_string(),
            source_lang.to_string(),
            target_lang.to_string(),
        );
        self.calls.lock().unwrap().push(key.clone());
        self.call_times.lock().unwrap().push(Instant::now());
        let reply = self.rules.lock().unwrap().get(&key).cloned();

        match reply {
            None => Ok(Some(format!("{text}-{target_lang}"))),
            Some(Reply::Text(t)) => Ok(Some(t)),
            Some(Reply::Nothing) => Ok(None),
            Some(Reply::RateLimited) => Err(Error::RateLimited {
                provider: "scripted".to_string(),
            }),
            Some(Reply::Fail) => Err(Error::Provider("scripted failure".to_string())),
            Some(Reply::FailOnce(t)) => {
                self.rules.lock().unwrap().insert(key, Reply::Text(t));
                Err(Error::Provider("scripted failure".to_string()))
            }
            Some(Reply::Slow(delay, t)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(t))
            }
        }
    }
}

/// Build a pipeline context around the given fakes
pub(crate) fn test_context(
    config: Config,
    words: Arc<ScriptedWordSource>,
    translator: Arc<ScriptedTranslator>,
) -> (PipelineContext, broadcast::Receiver<Event>) {
    let (event_tx, event_rx) = broadcast::channel(1000);
    let ctx = PipelineContext {
        config: Arc::new(config),
        words,
        translator,
        event_tx,
    };
    (ctx, event_rx)
}
