use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::event_bus::{EventBus, ProgressEvent};
use crate::agent_engine::history::{HistoryEntry, SessionHistory};
use crate::agent_engine::loop_control::{RepeatGuard, RepeatVerdict};
use crate::agent_engine::prompt::{build_user_turn, extract_thinking, intervention_message, system_prompt};
use crate::agent_engine::state::{AgentAction, AgentState, Instruction, RunOutcome};
use crate::config::{AgentConfig, AppConfig};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::executor::{ActionExecutor, ActionOutcome};
use crate::llm::provider::LlmProvider;
use crate::llm::tools::load_builtin_tools;
use crate::llm::types::{CallConfig, ChatMessage, ToolCall, ToolDef};
use crate::perception::pipeline::PerceptionService;
use crate::platform::DeviceHandles;

const START_ACTION: &str = "None (Start)";

/// Drives one instruction through perceive → think → act until the model
/// calls `finish_task` or the step budget runs out.
pub struct AgentEngine {
    perception: PerceptionService,
    executor: ActionExecutor,
    llm: Arc<dyn LlmProvider>,
    settings: AgentConfig,
    tools: Vec<ToolDef>,
    events: EventBus,
    stop: Arc<AtomicBool>,
    history: Option<SessionHistory>,

    // ── Per-run state (reset by `run`) ────────────────────────────────────
    state: AgentState,
    conv_messages: Vec<ChatMessage>,
    repeat_guard: RepeatGuard,
    last_action: String,
}

impl AgentEngine {
    pub fn new(
        perception: PerceptionService,
        executor: ActionExecutor,
        llm: Arc<dyn LlmProvider>,
        settings: AgentConfig,
    ) -> DroidClawResult<Self> {
        let tools = load_builtin_tools(settings.extended_tools)?;
        let history = settings.journal.then(SessionHistory::new);
        Ok(Self {
            perception,
            executor,
            llm,
            repeat_guard: RepeatGuard::from_config(&settings),
            settings,
            tools,
            events: EventBus::new(),
            stop: Arc::new(AtomicBool::new(false)),
            history,
            state: AgentState::Idle,
            conv_messages: Vec::new(),
            last_action: START_ACTION.into(),
        })
    }

    /// Wire perception and execution to the same device collaborators.
    pub fn from_handles(
        handles: DeviceHandles,
        config: &AppConfig,
        llm: Arc<dyn LlmProvider>,
    ) -> DroidClawResult<Self> {
        let perception = PerceptionService::new(handles.clone(), config.perception.clone(), &config.device);
        let executor = ActionExecutor::new(handles, perception.clone());
        Self::new(perception, executor, llm, config.agent.clone())
    }

    pub fn with_journal(mut self, history: SessionHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Setting the flag stops the run before its next step.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.conv_messages
    }

    pub async fn run(&mut self, instruction: &Instruction) -> DroidClawResult<RunOutcome> {
        instruction.validate()?;

        let apps = self.perception.installed_apps().await;
        tracing::debug!(apps = apps.len(), "app directory loaded");
        self.conv_messages = vec![ChatMessage::system(system_prompt(&instruction.goal, &apps))];
        self.repeat_guard.reset();
        self.last_action = START_ACTION.into();
        self.state = AgentState::Idle;
        self.journal(HistoryEntry::now(0, "user", Some(instruction.goal.clone()), None));

        tracing::info!(
            goal = %instruction.goal,
            budget = instruction.step_budget,
            provider = self.llm.name(),
            model = %instruction.endpoint.model,
            "run started"
        );

        let cfg = CallConfig { endpoint: instruction.endpoint.clone() };
        let budget = instruction.step_budget;
        let mut step = 0;
        while step < budget {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!(step, "stop requested");
                self.state = AgentState::Error("cancelled".into());
                return Err(DroidClawError::Cancelled);
            }

            match self.step(step, budget, &cfg).await {
                Ok(Some(outcome)) => return Ok(self.finish(outcome)),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(step, error = %e, "run aborted");
                    self.state = AgentState::Error(e.to_string());
                    return Err(e);
                }
            }
            step += 1;
        }

        self.state = AgentState::Exhausted { steps: budget };
        Ok(self.finish(RunOutcome {
            final_text: format!(
                "Step budget of {budget} reached without finish_task. Last action: {}",
                self.last_action
            ),
            success: false,
            steps_taken: budget,
        }))
    }

    /// One perceive/think/act iteration. `Some` when the run is over.
    async fn step(&mut self, step: u32, budget: u32, cfg: &CallConfig) -> DroidClawResult<Option<RunOutcome>> {
        self.events.emit(ProgressEvent::StepStarted { step, budget });

        // ── Perceive ──────────────────────────────────────────────────────
        self.state = AgentState::Perceiving { step };
        let snapshot = self.perception.snapshot().await;
        self.events.emit(ProgressEvent::Perceived {
            step,
            has_image: snapshot.encoded_image.is_some(),
            tree_chars: snapshot.ui_tree.len(),
        });
        self.conv_messages.push(build_user_turn(
            step,
            budget,
            &snapshot,
            &self.last_action,
            &self.settings,
        ));

        // ── Think ─────────────────────────────────────────────────────────
        self.state = AgentState::Thinking { step };
        tracing::info!(step, messages = self.conv_messages.len(), "calling LLM");
        let response = self.llm.chat(&self.conv_messages, &self.tools, cfg).await?;

        if let Some(thought) = extract_thinking(&response.content) {
            self.events.emit(ProgressEvent::Thinking { step, thought });
        }
        self.conv_messages.push(ChatMessage::assistant(
            response.content.clone(),
            response.tool_calls.clone(),
        ));
        self.journal(HistoryEntry::now(
            step,
            "assistant",
            Some(response.content.clone()),
            serde_json::to_value(&response.tool_calls).ok(),
        ));

        if response.tool_calls.is_empty() {
            tracing::info!(step, "no tool call in reply, nothing to do this step");
            self.last_action = "None (no tool call)".into();
            return Ok(None);
        }

        // ── Act ───────────────────────────────────────────────────────────
        let mut descriptions = Vec::with_capacity(response.tool_calls.len());
        for (index, call) in response.tool_calls.iter().enumerate() {
            let name = call.function.name.as_str();
            let raw_args = call.function.arguments.as_str();

            if let RepeatVerdict::Intervene { repeats } = self.repeat_guard.observe(name, raw_args) {
                self.conv_messages
                    .push(ChatMessage::tool_result(&call.id, intervention_message(name, repeats)));
                self.events.emit(ProgressEvent::LoopDetected { step, tool: name.to_string(), repeats });
                descriptions.push(format!("{name}({raw_args}) blocked as a repeat"));
                continue;
            }

            let outcome = match AgentAction::from_tool_call(name, raw_args, self.settings.extended_tools) {
                Ok(AgentAction::FinishTask { result, success }) => {
                    let skipped = response.tool_calls.len() - index - 1;
                    if skipped > 0 {
                        tracing::warn!(step, skipped, "tool calls after finish_task ignored");
                    }
                    tracing::info!(step, success, result = %result, "task finished");
                    self.state = AgentState::Done { success, summary: result.clone() };
                    return Ok(Some(RunOutcome {
                        final_text: result,
                        success,
                        steps_taken: step + 1,
                    }));
                }
                Ok(action) => self.act(step, call, &action).await,
                Err(reason) => {
                    tracing::warn!(step, tool = name, reason = %reason, "tool call rejected");
                    ActionOutcome::error(reason)
                }
            };

            self.conv_messages
                .push(ChatMessage::tool_result(&call.id, outcome.message.as_str()));
            self.events.emit(ProgressEvent::ToolFinished {
                step,
                tool: name.to_string(),
                success: outcome.is_success(),
                message: outcome.message.clone(),
            });
            self.journal(HistoryEntry::now(
                step,
                "tool",
                Some(outcome.message.clone()),
                Some(serde_json::json!({ "name": name, "arguments": raw_args })),
            ));
            descriptions.push(format!("{name}({raw_args}) -> {}", outcome.message));

            if self.settings.settle_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.settle_delay_ms)).await;
            }
        }
        self.last_action = descriptions.join("; ");
        Ok(None)
    }

    async fn act(&mut self, step: u32, call: &ToolCall, action: &AgentAction) -> ActionOutcome {
        self.state = AgentState::Acting { step, tool: action.tool_name().to_string() };
        self.events.emit(ProgressEvent::ToolStarted {
            step,
            tool: action.tool_name().to_string(),
            arguments: call.function.arguments.clone(),
        });
        self.executor.execute(action).await
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        if !self.state.is_terminal() {
            self.state = AgentState::Done {
                success: outcome.success,
                summary: outcome.final_text.clone(),
            };
        }
        tracing::info!(
            success = outcome.success,
            steps = outcome.steps_taken,
            transcript = self.conv_messages.len(),
            "run finished"
        );
        self.journal(HistoryEntry::now(
            outcome.steps_taken,
            "result",
            Some(outcome.final_text.clone()),
            Some(serde_json::json!({ "success": outcome.success })),
        ));
        self.events.emit(ProgressEvent::Finished {
            success: outcome.success,
            final_text: outcome.final_text.clone(),
            steps_taken: outcome.steps_taken,
        });
        outcome
    }

    fn journal(&mut self, entry: HistoryEntry) {
        if let Some(history) = self.history.as_mut() {
            history.record(entry);
        }
    }
}
