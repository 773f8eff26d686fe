//! Collaborators the agent drives but does not implement: the accessibility
//! bridge, an elevated shell, the clipboard, the app catalog, screen capture
//! and OCR. Every handle is optional; executors degrade to the next back-end
//! when one is missing.

pub mod adb;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::types::{NodeId, Rect, UiNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Back,
    Home,
    Recents,
}

impl GlobalAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "back" => Some(Self::Back),
            "home" => Some(Self::Home),
            "recents" => Some(Self::Recents),
            _ => None,
        }
    }

    /// `input keyevent` code of the equivalent hardware key.
    pub fn keycode(&self) -> u32 {
        match self {
            Self::Back => 4,
            Self::Home => 3,
            Self::Recents => 187,
        }
    }
}

/// One finger path. Points are absolute pixels, traversed linearly.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<(i32, i32)>,
    pub start_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub strokes: Vec<Stroke>,
}

impl Gesture {
    pub fn single(points: Vec<(i32, i32)>, duration_ms: u64) -> Self {
        Self {
            strokes: vec![Stroke { points, start_ms: 0, duration_ms }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

pub type GestureCallback = Box<dyn FnOnce(GestureOutcome) + Send>;

/// Structural view of the foreground window plus the accessibility actions.
pub trait AccessibilityBridge: Send + Sync {
    fn active_root(&self) -> Option<UiNode>;
    fn foreground_package(&self) -> Option<String>;
    fn screen_bounds(&self) -> Rect;
    fn perform_click(&self, node: NodeId) -> bool;
    /// The focused editable node, if any.
    fn focused_input(&self) -> Option<UiNode>;
    fn set_text(&self, node: NodeId, text: &str) -> bool;
    fn global_action(&self, action: GlobalAction) -> bool;
    /// Returns `false` when the gesture is rejected outright; otherwise the
    /// callback fires once the platform completes or cancels it.
    fn dispatch_gesture(&self, gesture: Gesture, on_done: GestureCallback) -> bool;
}

#[async_trait]
pub trait ShellBridge: Send + Sync {
    /// Whether commands run with shell (or root) privileges able to inject input.
    async fn is_elevated(&self) -> bool;
    async fn exec(&self, command: &str) -> DroidClawResult<String>;
}

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    pub label: String,
    pub package: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEntry {
    pub package: String,
    /// `package/activity` component name.
    pub component: String,
}

#[async_trait]
pub trait AppCatalog: Send + Sync {
    async fn installed_apps(&self) -> DroidClawResult<Vec<AppEntry>>;
    /// `Ok(None)` when the package exists but has no launcher activity.
    async fn launch_entry(&self, package: &str) -> DroidClawResult<Option<LaunchEntry>>;
    async fn launch(&self, entry: &LaunchEntry) -> DroidClawResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Auto,
}

/// Captured frame, either written to disk or held in memory (PNG/JPEG bytes).
#[derive(Debug, Clone)]
pub enum ImageRef {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl ImageRef {
    pub fn load(&self) -> DroidClawResult<Vec<u8>> {
        match self {
            ImageRef::File(path) => Ok(std::fs::read(path)?),
            ImageRef::Memory(bytes) if bytes.is_empty() => {
                Err(DroidClawError::Perception("captured image is empty".into()))
            }
            ImageRef::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    async fn capture(&self, mode: CaptureMode) -> DroidClawResult<ImageRef>;
}

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub image: ImageRef,
    pub target: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrMatch {
    pub text: String,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OcrSearch {
    pub found: bool,
    /// Topmost match.
    pub first_match: Option<OcrMatch>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn search(&self, request: OcrRequest) -> DroidClawResult<OcrSearch>;
}

/// The collaborators available on this device.
#[derive(Clone, Default)]
pub struct DeviceHandles {
    pub accessibility: Option<Arc<dyn AccessibilityBridge>>,
    pub shell: Option<Arc<dyn ShellBridge>>,
    pub clipboard: Option<Arc<dyn Clipboard>>,
    pub apps: Option<Arc<dyn AppCatalog>>,
    pub capturer: Option<Arc<dyn ScreenCapturer>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
}

impl DeviceHandles {
    /// Shell handle only when it can inject input.
    pub async fn elevated_shell(&self) -> Option<Arc<dyn ShellBridge>> {
        let shell = self.shell.clone()?;
        shell.is_elevated().await.then_some(shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_actions_parse_case_insensitively() {
        assert_eq!(GlobalAction::parse("Back"), Some(GlobalAction::Back));
        assert_eq!(GlobalAction::parse(" HOME "), Some(GlobalAction::Home));
        assert_eq!(GlobalAction::parse("recents").map(|a| a.keycode()), Some(187));
        assert_eq!(GlobalAction::parse("menu"), None);
    }

    #[test]
    fn empty_memory_image_fails_to_load() {
        assert!(ImageRef::Memory(Vec::new()).load().is_err());
        assert_eq!(ImageRef::Memory(vec![1, 2]).load().unwrap(), vec![1, 2]);
    }
}
