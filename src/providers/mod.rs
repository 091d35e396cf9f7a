//! Remote providers the orchestrator pulls content from.
//!
//! The orchestrator only sees the [`WordSource`] and [`Translator`] traits;
//! production code plugs in [`RandomWordApi`] and [`MyMemoryTranslator`],
//! tests plug in scripted fakes.

mod mymemory;
mod random_words;

pub use mymemory::MyMemoryTranslator;
pub use random_words::RandomWordApi;

use crate::error::Result;

/// Source of random primary-language words
#[async_trait::async_trait]
pub trait WordSource: Send + Sync {
    /// Fetch up to `count` candidate words
    ///
    /// Callers must not assume every word is usable; filtering happens in
    /// the orchestrator.
    async fn fetch(&self, count: usize) -> Result<Vec<String>>;
}

/// Text translator between two language codes
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` to `target_lang`
    ///
    /// Returns `Ok(None)` when the provider has no usable translation and
    /// [`crate::Error::RateLimited`] when it refuses the request. Blank input
    /// returns `Ok(None)` without contacting the provider.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<String>>;
}
