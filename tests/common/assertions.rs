//! Helpers that drive a session and check the events it emits

use lingo_quiz::{Event, Question, QuizHandle};
use std::time::Duration;
use tokio::sync::broadcast;

/// How a played session ended
#[derive(Debug)]
pub enum PlayResult {
    /// `SessionFinished` was received
    Finished(Vec<Event>),
    /// `FatalError` was received
    Fatal(String, Vec<Event>),
    /// No terminal event within the timeout
    Timeout(Vec<Event>),
    /// Event channel closed or lagged
    ChannelClosed,
}

/// Answer every `QuestionReady` with `pick` until the session ends
///
/// # Arguments
/// * `handle` - Handle of the running session
/// * `events` - Receiver subscribed before the session started
/// * `timeout` - Maximum time to wait for the terminal event
/// * `pick` - Chooses the answer for a question
pub async fn play_session(
    handle: &QuizHandle,
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    pick: impl Fn(&Question, &[String]) -> String,
) -> PlayResult {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(timeout, async {
        loop {
            let Ok(event) = events.recv().await else {
                return None;
            };
            if let Event::QuestionReady {
                question, options, ..
            } = &event
            {
                handle.submit_answer(pick(question, options)).ok();
            }
            let terminal = match &event {
                Event::FatalError { reason } => Some(Some(reason.clone())),
                Event::SessionFinished { .. } => Some(None),
                _ => None,
            };
            seen.push(event);
            if let Some(reason) = terminal {
                return Some(reason);
            }
        }
    })
    .await;

    match result {
        Ok(Some(None)) => PlayResult::Finished(seen),
        Ok(Some(Some(reason))) => PlayResult::Fatal(reason, seen),
        Ok(None) => PlayResult::ChannelClosed,
        Err(_) => PlayResult::Timeout(seen),
    }
}

/// Every question shown, in order
pub fn questions(events: &[Event]) -> Vec<&Question> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::QuestionReady { question, .. } => Some(question),
            _ => None,
        })
        .collect()
}

/// Assert that distractors are distinct from each other and from the answer
pub fn assert_well_formed(question: &Question) {
    let correct = question.correct_translation.to_lowercase();
    let [a, b] = &question.distractors;
    assert_ne!(a.to_lowercase(), correct, "{question:?}");
    assert_ne!(b.to_lowercase(), correct, "{question:?}");
    assert_ne!(a.to_lowercase(), b.to_lowercase(), "{question:?}");
}
