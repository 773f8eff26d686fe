//! Turns typed agent actions into device interactions. Every operation
//! resolves to an [`ActionOutcome`] whose message is fed back to the model
//! verbatim, so failures here are reported, never raised.

pub mod apps;
pub mod click;
pub mod coordinator;
pub mod dispatcher;
pub mod input;
pub mod locator;
pub mod text_input;

use serde::Serialize;

use crate::perception::pipeline::PerceptionService;
use crate::perception::types::Rect;
use crate::platform::DeviceHandles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    /// Tool-result text; starts with `Success:`, `Failed:` or `Error:`.
    pub message: String,
}

impl ActionOutcome {
    pub fn success(detail: impl AsRef<str>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: format!("Success: {}", detail.as_ref()),
        }
    }

    pub fn failure(detail: impl AsRef<str>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            message: format!("Failed: {}", detail.as_ref()),
        }
    }

    /// Invalid request (bad arguments, missing collaborator).
    pub fn error(detail: impl AsRef<str>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            message: format!("Error: {}", detail.as_ref()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

pub struct ActionExecutor {
    handles: DeviceHandles,
    perception: PerceptionService,
}

impl ActionExecutor {
    pub fn new(handles: DeviceHandles, perception: PerceptionService) -> Self {
        Self { handles, perception }
    }

    fn screen(&self) -> Rect {
        self.perception.screen_bounds()
    }
}
