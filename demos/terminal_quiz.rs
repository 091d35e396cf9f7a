//! Terminal quiz example
//!
//! This example plays a full session against the public providers:
//! - Builds the English and German word pools
//! - Prints each question with its three Thai options
//! - Reads the chosen option number from stdin
//!
//! The free MyMemory tier is slow and rate limited, so initialization takes
//! a while (one translation every 1.1s).

use lingo_quiz::{Config, Event, Grade, MyMemoryTranslator, QuizSession, RandomWordApi};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let config = Config::default();
    let words = Arc::new(RandomWordApi::new(&config.providers)?);
    let translator = Arc::new(MyMemoryTranslator::new(&config.providers)?);
    let (session, handle) = QuizSession::new(config, words, translator)?;

    let mut events = handle.subscribe();
    let quiz = tokio::spawn(session.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(event) = events.recv().await {
        match event {
            Event::Progress { message } => println!("... {message}"),
            Event::LanguageStarted { language, code } => {
                println!("\n=== {language} language ({code}) ===");
            }
            Event::QuestionReady {
                index,
                total,
                question,
                options,
                ..
            } => {
                println!("\n[{}/{}] {}", index + 1, total, question.source_word);
                for (i, option) in options.iter().enumerate() {
                    println!("  {}) {}", i + 1, option);
                }

                let choice = loop {
                    let Some(line) = lines.next_line().await? else {
                        handle.cancel();
                        break None;
                    };
                    match line.trim().parse::<usize>() {
                        Ok(n) if (1..=options.len()).contains(&n) => break Some(n - 1),
                        _ => println!("Pick 1-{}", options.len()),
                    }
                };
                if let Some(i) = choice {
                    handle.submit_answer(options[i].clone())?;
                }
            }
            Event::QuestionSkipped { reason, .. } => println!("Skipped a question: {reason}"),
            Event::AnswerGraded { grade, .. } => match grade {
                Grade::Correct => println!("Correct!"),
                Grade::Incorrect { expected } => println!("Wrong, it was {expected}"),
            },
            Event::SessionFinished { summary } => {
                println!(
                    "\nDone: {} of {} correct ({} skipped)",
                    summary.correct, summary.answered, summary.skipped
                );
                break;
            }
            Event::FatalError { reason } => {
                eprintln!("Quiz failed: {reason}");
                break;
            }
        }
        if handle.is_cancelled() {
            break;
        }
    }

    match quiz.await? {
        Ok(_) | Err(lingo_quiz::Error::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
