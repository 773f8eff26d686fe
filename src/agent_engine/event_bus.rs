use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Progress notifications emitted while a run advances. Purely informational:
/// nothing in the loop waits for a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StepStarted { step: u32, budget: u32 },
    Perceived { step: u32, has_image: bool, tree_chars: usize },
    Thinking { step: u32, thought: String },
    ToolStarted { step: u32, tool: String, arguments: String },
    ToolFinished { step: u32, tool: String, success: bool, message: String },
    LoopDetected { step: u32, tool: String, repeats: u32 },
    Finished { success: bool, final_text: String, steps_taken: u32 },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Broadcast `event`; having no subscriber is not an error.
    pub fn emit(&self, event: ProgressEvent) {
        tracing::trace!(?event, "progress");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
