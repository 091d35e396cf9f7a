//! Random word list over HTTP.

use super::WordSource;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// [`WordSource`] backed by a random-word JSON API
///
/// Requests `GET {url}?words={count}` and expects a JSON array of strings.
pub struct RandomWordApi {
    client: reqwest::Client,
    url: String,
}

impl RandomWordApi {
    /// Build a client with the configured endpoint and timeout
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.word_source_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl WordSource for RandomWordApi {
    async fn fetch(&self, count: usize) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("words", count)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "word source returned HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        let Some(items) = body.as_array() else {
            return Err(Error::Provider(
                "word source did not return a JSON array".to_string(),
            ));
        };

        let words = items
            .iter()
            .filter_map(serde_json::Value::as_str)
            .filter(|w| w.chars().count() > 2 && w.chars().all(char::is_alphabetic))
            .map(str::to_lowercase)
            .collect::<Vec<_>>();

        tracing::debug!(requested = count, returned = words.len(), "Fetched random words");
        Ok(words)
    }
}
