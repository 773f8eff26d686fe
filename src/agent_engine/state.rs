use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::tools;
use crate::llm::types::EndpointConfig;

/// Lifecycle states of one agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Perceiving { step: u32 },
    Thinking { step: u32 },
    Acting { step: u32, tool: String },
    Done { success: bool, summary: String },
    Exhausted { steps: u32 },
    Error(String),
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done { .. } | AgentState::Exhausted { .. } | AgentState::Error(_))
    }
}

/// A tool call after argument parsing. Missing arguments take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum AgentAction {
    ClickElement {
        #[serde(default)]
        target: String,
    },
    InputText {
        #[serde(default)]
        text: String,
    },
    Scroll {
        #[serde(default = "default_direction")]
        direction: String,
    },
    PressKey {
        #[serde(default = "default_key")]
        action: String,
    },
    LaunchApp {
        #[serde(default)]
        app_name: String,
    },
    FinishTask {
        #[serde(default)]
        result: String,
        #[serde(default = "default_true")]
        success: bool,
    },
    Tap {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
    LongPress {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default = "default_long_press_ms")]
        duration_ms: u64,
    },
    Swipe {
        #[serde(default)]
        x1: i32,
        #[serde(default)]
        y1: i32,
        #[serde(default)]
        x2: i32,
        #[serde(default)]
        y2: i32,
        #[serde(default = "default_swipe_ms")]
        duration_ms: u64,
    },
    Wait {
        #[serde(default = "default_wait_secs")]
        seconds: u64,
    },
}

fn default_direction() -> String {
    "down".into()
}

fn default_key() -> String {
    "back".into()
}

fn default_true() -> bool {
    true
}

fn default_long_press_ms() -> u64 {
    1000
}

fn default_swipe_ms() -> u64 {
    300
}

fn default_wait_secs() -> u64 {
    2
}

const CORE_TOOLS: [&str; 6] = [
    tools::CLICK_ELEMENT,
    tools::INPUT_TEXT,
    tools::SCROLL,
    tools::PRESS_KEY,
    tools::LAUNCH_APP,
    tools::FINISH_TASK,
];

const EXTENDED_TOOLS: [&str; 4] = [tools::TAP, tools::LONG_PRESS, tools::SWIPE, tools::WAIT];

impl AgentAction {
    /// Parse a tool call as produced by the model. `raw_arguments` is the
    /// JSON string from the wire; an empty string means "no arguments".
    /// The error string is meant to be fed back to the model.
    pub fn from_tool_call(name: &str, raw_arguments: &str, extended: bool) -> Result<Self, String> {
        let known = CORE_TOOLS.contains(&name) || (extended && EXTENDED_TOOLS.contains(&name));
        if !known {
            return Err(format!("unknown tool '{name}'"));
        }

        let arguments: serde_json::Value = if raw_arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(raw_arguments)
                .map_err(|e| format!("arguments of '{name}' are not valid JSON: {e}"))?
        };
        if !arguments.is_object() {
            return Err(format!("arguments of '{name}' must be a JSON object"));
        }

        serde_json::from_value(serde_json::json!({ "name": name, "arguments": arguments }))
            .map_err(|e| format!("invalid arguments for '{name}': {e}"))
    }

    /// Inverse of [`AgentAction::from_tool_call`]: tool name and JSON arguments.
    pub fn to_tool_call(&self) -> DroidClawResult<(String, String)> {
        let value = serde_json::to_value(self)?;
        let name = value["name"]
            .as_str()
            .ok_or_else(|| DroidClawError::Executor("action serialized without a name".into()))?
            .to_string();
        Ok((name, value["arguments"].to_string()))
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            AgentAction::ClickElement { .. } => tools::CLICK_ELEMENT,
            AgentAction::InputText { .. } => tools::INPUT_TEXT,
            AgentAction::Scroll { .. } => tools::SCROLL,
            AgentAction::PressKey { .. } => tools::PRESS_KEY,
            AgentAction::LaunchApp { .. } => tools::LAUNCH_APP,
            AgentAction::FinishTask { .. } => tools::FINISH_TASK,
            AgentAction::Tap { .. } => tools::TAP,
            AgentAction::LongPress { .. } => tools::LONG_PRESS,
            AgentAction::Swipe { .. } => tools::SWIPE,
            AgentAction::Wait { .. } => tools::WAIT,
        }
    }

    pub fn is_extended(&self) -> bool {
        EXTENDED_TOOLS.contains(&self.tool_name())
    }

    /// Short human-readable form used in prompts and logs.
    pub fn describe(&self) -> String {
        match self {
            AgentAction::ClickElement { target } => format!("click_element('{target}')"),
            AgentAction::InputText { text } => format!("input_text('{text}')"),
            AgentAction::Scroll { direction } => format!("scroll({direction})"),
            AgentAction::PressKey { action } => format!("press_key({action})"),
            AgentAction::LaunchApp { app_name } => format!("launch_app('{app_name}')"),
            AgentAction::FinishTask { success, .. } => format!("finish_task(success={success})"),
            AgentAction::Tap { x, y } => format!("tap({x}, {y})"),
            AgentAction::LongPress { x, y, duration_ms } => format!("long_press({x}, {y}, {duration_ms}ms)"),
            AgentAction::Swipe { x1, y1, x2, y2, .. } => format!("swipe({x1}, {y1} -> {x2}, {y2})"),
            AgentAction::Wait { seconds } => format!("wait({seconds}s)"),
        }
    }
}

/// One natural-language task handed to the agent.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub goal: String,
    pub step_budget: u32,
    pub endpoint: EndpointConfig,
}

impl Instruction {
    pub fn validate(&self) -> DroidClawResult<()> {
        if self.goal.trim().is_empty() {
            return Err(DroidClawError::Config("instruction is empty".into()));
        }
        if self.step_budget == 0 {
            return Err(DroidClawError::Config("step budget must be at least 1".into()));
        }
        if self.endpoint.api_key.trim().is_empty() {
            return Err(DroidClawError::Config("API key is not configured".into()));
        }
        if self.endpoint.base_url.trim().is_empty() || self.endpoint.model.trim().is_empty() {
            return Err(DroidClawError::Config("endpoint base URL and model are required".into()));
        }
        Ok(())
    }
}

/// How a run ended. Produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub final_text: String,
    pub success: bool,
    pub steps_taken: u32,
}
