// Routes a parsed tool call to the matching executor operation.
use crate::agent_engine::state::AgentAction;
use crate::executor::{ActionExecutor, ActionOutcome};

impl ActionExecutor {
    pub async fn execute(&self, action: &AgentAction) -> ActionOutcome {
        tracing::info!(action = %action.describe(), "executing action");
        let outcome = match action {
            AgentAction::ClickElement { target } => self.click_element(target).await,
            AgentAction::InputText { text } => self.input_text(text).await,
            AgentAction::Scroll { direction } => self.scroll(direction).await,
            AgentAction::PressKey { action } => self.press_key(action).await,
            AgentAction::LaunchApp { app_name } => self.launch_app(app_name).await,
            AgentAction::Tap { x, y } => self.tap(*x, *y).await,
            AgentAction::LongPress { x, y, duration_ms } => self.long_press(*x, *y, *duration_ms).await,
            AgentAction::Swipe { x1, y1, x2, y2, duration_ms } => {
                self.swipe(*x1, *y1, *x2, *y2, *duration_ms).await
            }
            AgentAction::Wait { seconds } => self.wait(*seconds).await,
            // Termination is decided by the orchestrator; nothing to perform.
            AgentAction::FinishTask { result, .. } => ActionOutcome::success(format!("Task finished: {result}")),
        };
        tracing::info!(success = outcome.is_success(), message = %outcome.message, "action finished");
        outcome
    }
}
