//! Shared handles passed to every state machine.

use crate::config::Config;
use crate::providers::{Translator, WordSource};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Configuration, providers and the event channel, cloned into each state machine
#[derive(Clone)]
pub(crate) struct PipelineContext {
    pub(crate) config: Arc<Config>,
    pub(crate) words: Arc<dyn WordSource>,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl PipelineContext {
    /// Emit an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Emit a progress message
    pub(crate) fn progress(&self, message: impl Into<String>) {
        self.emit(Event::Progress {
            message: message.into(),
        });
    }
}
