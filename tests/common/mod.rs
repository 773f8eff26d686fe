#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use droidclaw::agent_engine::engine::AgentEngine;
use droidclaw::agent_engine::state::Instruction;
use droidclaw::config::{AgentConfig, AppConfig, DeviceConfig, LlmConfig, PerceptionConfig};
use droidclaw::errors::{DroidClawError, DroidClawResult};
use droidclaw::executor::ActionExecutor;
use droidclaw::llm::provider::LlmProvider;
use droidclaw::llm::types::{CallConfig, ChatMessage, EndpointConfig, FunctionCall, LlmResponse, ToolCall, ToolDef};
use droidclaw::perception::pipeline::PerceptionService;
use droidclaw::perception::types::{NodeId, Rect, UiNode};
use droidclaw::platform::{
    AccessibilityBridge, AppCatalog, AppEntry, CaptureMode, Clipboard, DeviceHandles, Gesture,
    GestureCallback, GestureOutcome, GlobalAction, ImageRef, LaunchEntry, OcrEngine, OcrMatch,
    OcrRequest, OcrSearch, ScreenCapturer, ShellBridge,
};

pub const SCREEN: Rect = Rect::new(0, 0, 1080, 2400);

// ── LLM ───────────────────────────────────────────────────────────────────

/// Replays queued replies; once the queue is empty it keeps returning
/// `fallback`. Every request transcript is recorded.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<LlmResponse, String>>>,
    fallback: LlmResponse,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    pub tool_counts: Mutex<Vec<usize>>,
    pub endpoints: Mutex<Vec<EndpointConfig>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<LlmResponse, String>>) -> Self {
        Self::with_fallback(replies, reply("Looking at the screen.", vec![]))
    }

    pub fn with_fallback(replies: Vec<Result<LlmResponse, String>>, fallback: LlmResponse) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            tool_counts: Mutex::new(Vec::new()),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        cfg: &CallConfig,
    ) -> DroidClawResult<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.endpoints.lock().unwrap().push(cfg.endpoint.clone());
        self.tool_counts.lock().unwrap().push(tools.len());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(r)) => Ok(r),
            Some(Err(e)) => Err(DroidClawError::Protocol(e)),
            None => Ok(self.fallback.clone()),
        }
    }
}

pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".into(),
        function: FunctionCall { name: name.to_string(), arguments: arguments.to_string() },
    }
}

pub fn reply(content: &str, calls: Vec<ToolCall>) -> LlmResponse {
    LlmResponse { content: content.to_string(), tool_calls: calls }
}

// ── Accessibility ─────────────────────────────────────────────────────────

/// `None` in `gesture_outcome` rejects gestures outright.
pub struct FakeBridge {
    pub root: Mutex<Option<UiNode>>,
    pub package: Option<String>,
    pub focused: Option<UiNode>,
    pub click_succeeds: bool,
    pub set_text_succeeds: bool,
    pub global_succeeds: bool,
    pub gesture_outcome: Option<GestureOutcome>,
    pub clicks: Mutex<Vec<NodeId>>,
    pub gestures: Mutex<Vec<Gesture>>,
    pub texts: Mutex<Vec<(NodeId, String)>>,
    pub globals: Mutex<Vec<GlobalAction>>,
}

impl FakeBridge {
    pub fn with_root(root: UiNode) -> Self {
        Self {
            root: Mutex::new(Some(root)),
            package: Some("com.android.settings".into()),
            focused: None,
            click_succeeds: true,
            set_text_succeeds: true,
            global_succeeds: true,
            gesture_outcome: Some(GestureOutcome::Completed),
            clicks: Mutex::new(Vec::new()),
            gestures: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
            globals: Mutex::new(Vec::new()),
        }
    }

    pub fn gesture_count(&self) -> usize {
        self.gestures.lock().unwrap().len()
    }

    pub fn click_count(&self) -> usize {
        self.clicks.lock().unwrap().len()
    }

    pub fn set_root(&self, root: Option<UiNode>) {
        *self.root.lock().unwrap() = root;
    }
}

impl AccessibilityBridge for FakeBridge {
    fn active_root(&self) -> Option<UiNode> {
        self.root.lock().unwrap().clone()
    }

    fn foreground_package(&self) -> Option<String> {
        self.package.clone()
    }

    fn screen_bounds(&self) -> Rect {
        SCREEN
    }

    fn perform_click(&self, node: NodeId) -> bool {
        self.clicks.lock().unwrap().push(node);
        self.click_succeeds
    }

    fn focused_input(&self) -> Option<UiNode> {
        self.focused.clone()
    }

    fn set_text(&self, node: NodeId, text: &str) -> bool {
        self.texts.lock().unwrap().push((node, text.to_string()));
        self.set_text_succeeds
    }

    fn global_action(&self, action: GlobalAction) -> bool {
        self.globals.lock().unwrap().push(action);
        self.global_succeeds
    }

    fn dispatch_gesture(&self, gesture: Gesture, on_done: GestureCallback) -> bool {
        self.gestures.lock().unwrap().push(gesture);
        match self.gesture_outcome {
            Some(outcome) => {
                on_done(outcome);
                true
            }
            None => false,
        }
    }
}

// ── Shell, clipboard, apps ────────────────────────────────────────────────

pub struct FakeShell {
    pub elevated: bool,
    pub commands: Mutex<Vec<String>>,
    /// `(command prefix, output)` pairs; anything else prints nothing.
    pub replies: Vec<(String, String)>,
}

impl FakeShell {
    pub fn new(elevated: bool) -> Self {
        Self { elevated, commands: Mutex::new(Vec::new()), replies: Vec::new() }
    }

    pub fn replying(elevated: bool, prefix: &str, output: &str) -> Self {
        Self { replies: vec![(prefix.to_string(), output.to_string())], ..Self::new(elevated) }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShellBridge for FakeShell {
    async fn is_elevated(&self) -> bool {
        self.elevated
    }

    async fn exec(&self, command: &str) -> DroidClawResult<String> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self
            .replies
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    pub texts: Mutex<Vec<String>>,
}

impl Clipboard for FakeClipboard {
    fn set_text(&self, text: &str) -> bool {
        self.texts.lock().unwrap().push(text.to_string());
        true
    }
}

pub struct FakeApps {
    pub apps: Vec<AppEntry>,
    /// Packages that resolve to a launcher activity.
    pub launchable: Vec<String>,
    pub launched: Mutex<Vec<LaunchEntry>>,
}

impl FakeApps {
    pub fn new(apps: &[(&str, &str)], launchable: &[&str]) -> Self {
        Self {
            apps: apps
                .iter()
                .map(|(label, package)| AppEntry { label: label.to_string(), package: package.to_string() })
                .collect(),
            launchable: launchable.iter().map(|p| p.to_string()).collect(),
            launched: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AppCatalog for FakeApps {
    async fn installed_apps(&self) -> DroidClawResult<Vec<AppEntry>> {
        Ok(self.apps.clone())
    }

    async fn launch_entry(&self, package: &str) -> DroidClawResult<Option<LaunchEntry>> {
        Ok(self.launchable.iter().any(|p| p == package).then(|| LaunchEntry {
            package: package.to_string(),
            component: format!("{package}/.MainActivity"),
        }))
    }

    async fn launch(&self, entry: &LaunchEntry) -> DroidClawResult<()> {
        self.launched.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

// ── Capture and OCR ───────────────────────────────────────────────────────

/// Serves a small PNG, or fails every capture when `frame` is `None`.
pub struct FakeCapturer {
    pub frame: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl FakeCapturer {
    pub fn working() -> Self {
        Self { frame: Some(png_frame(108, 240)), calls: AtomicUsize::new(0) }
    }

    pub fn broken() -> Self {
        Self { frame: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScreenCapturer for FakeCapturer {
    async fn capture(&self, _mode: CaptureMode) -> DroidClawResult<ImageRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.frame {
            Some(bytes) => Ok(ImageRef::Memory(bytes.clone())),
            None => Err(DroidClawError::Platform("screen capture permission missing".into())),
        }
    }
}

pub fn png_frame(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub struct FakeOcr {
    pub hit: Option<OcrMatch>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl FakeOcr {
    pub fn finding(text: &str, bounds: Rect) -> Self {
        Self {
            hit: Some(OcrMatch { text: text.to_string(), bounds }),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn blind() -> Self {
        Self { hit: None, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn search(&self, request: OcrRequest) -> DroidClawResult<OcrSearch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.target.clone(), request.language.clone()));
        Ok(OcrSearch { found: self.hit.is_some(), first_match: self.hit.clone() })
    }
}

// ── UI trees ──────────────────────────────────────────────────────────────

pub fn node(id: u64, class: &str, text: Option<&str>, bounds: Rect, clickable: bool) -> UiNode {
    UiNode {
        id: Some(NodeId(id)),
        class_name: class.to_string(),
        text: text.map(String::from),
        visible: true,
        bounds,
        clickable,
        ..Default::default()
    }
}

/// A settings-like screen: a list of rows whose labels are plain text
/// views inside clickable containers.
pub fn settings_screen() -> UiNode {
    let row = |id: u64, label: &str, top: i32| {
        let mut container = node(id, "android.widget.LinearLayout", None, Rect::new(0, top, 1080, top + 150), true);
        container.children.push(node(
            id + 100,
            "android.widget.TextView",
            Some(label),
            Rect::new(40, top + 40, 600, top + 110),
            false,
        ));
        container
    };
    let mut list = node(2, "androidx.recyclerview.widget.RecyclerView", None, Rect::new(0, 200, 1080, 2400), false);
    list.scrollable = true;
    list.children = vec![row(10, "Wi-Fi", 200), row(11, "Bluetooth", 350), row(12, "Display", 500)];

    let mut search = node(3, "android.widget.ImageButton", None, Rect::new(900, 60, 1040, 180), true);
    search.view_id = Some("com.android.settings:id/search_action_bar".into());
    search.description = Some("Search settings".into());

    let mut root = node(1, "android.widget.FrameLayout", None, SCREEN, false);
    root.children = vec![search, list];
    root
}

// ── Wiring ────────────────────────────────────────────────────────────────

pub fn test_config() -> AppConfig {
    AppConfig {
        llm: LlmConfig::default(),
        agent: AgentConfig { settle_delay_ms: 0, ..AgentConfig::default() },
        perception: PerceptionConfig::default(),
        device: DeviceConfig::default(),
    }
}

pub fn instruction(goal: &str, budget: u32) -> Instruction {
    Instruction {
        goal: goal.to_string(),
        step_budget: budget,
        endpoint: EndpointConfig {
            base_url: "http://127.0.0.1:9/v1".into(),
            api_key: "sk-test".into(),
            model: "test-model".into(),
        },
    }
}

pub fn executor(handles: DeviceHandles) -> ActionExecutor {
    let cfg = test_config();
    let perception = PerceptionService::new(handles.clone(), cfg.perception.clone(), &cfg.device);
    ActionExecutor::new(handles, perception)
}

pub fn engine(handles: DeviceHandles, llm: Arc<ScriptedLlm>) -> AgentEngine {
    AgentEngine::from_handles(handles, &test_config(), llm).unwrap()
}
