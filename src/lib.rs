//! # lingo-quiz
//!
//! Asynchronous pipeline orchestrator for multi-language vocabulary quizzes.
//!
//! ## Design Philosophy
//!
//! lingo-quiz is designed to be:
//! - **Non-blocking** - Every provider call runs on a worker task; one coordinating task owns all state
//! - **Failure tolerant** - Slow, broken or rate-limited providers degrade questions instead of crashing
//! - **Library-first** - No UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events and submit answers through a handle
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lingo_quiz::{Config, Event, MyMemoryTranslator, QuizSession, RandomWordApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let words = Arc::new(RandomWordApi::new(&config.providers)?);
//!     let translator = Arc::new(MyMemoryTranslator::new(&config.providers)?);
//!
//!     let (session, handle) = QuizSession::new(config, words, translator)?;
//!
//!     // Subscribe to events and answer every question with its first option
//!     let mut events = handle.subscribe();
//!     let answers = handle.clone();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Event::QuestionReady { options, .. } = event {
//!                 answers.submit_answer(options[0].clone()).ok();
//!             }
//!         }
//!     });
//!
//!     let summary = session.run().await?;
//!     println!("{} of {} correct", summary.correct, summary.answered);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Session orchestration (task runner, dispatcher and state machines)
pub mod orchestrator;
/// Remote word and translation providers
pub mod providers;
/// Retry-or-skip policy with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Word filters applied to provider output
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use orchestrator::{QuizHandle, QuizSession};
pub use providers::{MyMemoryTranslator, RandomWordApi, Translator, WordSource};
pub use types::{Event, Grade, Language, Question, SessionSummary, WordPool, WordPools};
