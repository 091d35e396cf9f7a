//! MyMemory translation API client.

use super::Translator;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use reqwest::StatusCode;

const PROVIDER: &str = "mymemory";

/// Phrases MyMemory returns in place of a translation when the request failed
const ERROR_PHRASES: &[&str] = &[
    "no query specified",
    "invalid language pair",
    "please use iso code",
    "internal error",
    "no translation found",
];

/// [`Translator`] backed by the MyMemory `get` endpoint
///
/// Requests `GET {url}?q={text}&langpair={src}|{tgt}`.
pub struct MyMemoryTranslator {
    client: reqwest::Client,
    url: String,
}

impl MyMemoryTranslator {
    /// Build a client with the configured endpoint and timeout
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.translator_url.clone(),
        })
    }
}

/// `responseStatus` arrives as a number or as a numeric string
fn response_status(body: &serde_json::Value) -> Option<u64> {
    match &body["responseStatus"] {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_error_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[async_trait::async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let langpair = format!("{source_lang}|{target_lang}");
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(text, langpair = %langpair, "Translation provider rate limit (HTTP 429)");
            return Err(Error::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "translator returned HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        match response_status(&body) {
            Some(200) => {
                let translated = body["responseData"]["translatedText"]
                    .as_str()
                    .unwrap_or_default()
                    .trim();
                if translated.is_empty() || is_error_phrase(translated) {
                    tracing::debug!(text, langpair = %langpair, response = translated, "No usable translation");
                    Ok(None)
                } else {
                    Ok(Some(translated.to_string()))
                }
            }
            Some(429) => {
                tracing::warn!(text, langpair = %langpair, "Translation provider rate limit (status 429)");
                Err(Error::RateLimited {
                    provider: PROVIDER.to_string(),
                })
            }
            other => {
                tracing::debug!(text, langpair = %langpair, status = ?other, "Translation provider declined request");
                Ok(None)
            }
        }
    }
}
