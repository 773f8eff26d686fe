pub mod pipeline;
pub mod screenshot;
pub mod types;
pub mod ui_automation;
