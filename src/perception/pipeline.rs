/// Per-step perception: a downsized screenshot plus the filtered UI hierarchy.
/// Neither half ever fails the step; problems degrade into `None` or an
/// "unavailable" hierarchy string.
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{DeviceConfig, PerceptionConfig};
use crate::perception::screenshot::downscale_and_encode;
use crate::perception::types::{Rect, ScreenSnapshot};
use crate::perception::ui_automation::{self, UNAVAILABLE_NO_BRIDGE, UNAVAILABLE_NO_ROOT};
use crate::platform::{AppEntry, CaptureMode, DeviceHandles};

pub const CURRENT_FOCUS_COMMAND: &str = "dumpsys window | grep mCurrentFocus";

/// Package of the focused window in `dumpsys window` output, e.g.
/// `mCurrentFocus=Window{2b2c9d5 u0 com.android.settings/com.android.settings.Settings}`.
/// `None` for `mCurrentFocus=null` or anything without a component.
pub fn parse_current_focus(output: &str) -> Option<String> {
    static USER_COMPONENT: OnceLock<Regex> = OnceLock::new();
    static BARE_COMPONENT: OnceLock<Regex> = OnceLock::new();
    if !output.contains('/') {
        return None;
    }
    let user = USER_COMPONENT.get_or_init(|| Regex::new(r"u0\s+(\S+)/(\S+)[}\s]").expect("static regex compiles"));
    let bare = BARE_COMPONENT.get_or_init(|| Regex::new(r"(\S+\.\S+)/(\S+\.\S+)").expect("static regex compiles"));
    user.captures(output)
        .or_else(|| bare.captures(output))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().rsplit('{').next().unwrap_or_default().to_string())
        .filter(|p| !p.is_empty())
}

#[derive(Clone)]
pub struct PerceptionService {
    handles: DeviceHandles,
    config: PerceptionConfig,
    fallback_screen: Rect,
}

impl PerceptionService {
    pub fn new(handles: DeviceHandles, config: PerceptionConfig, device: &DeviceConfig) -> Self {
        Self {
            handles,
            config,
            fallback_screen: Rect::new(0, 0, device.screen_width, device.screen_height),
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Screen rectangle reported by the bridge, else the configured size.
    pub fn screen_bounds(&self) -> Rect {
        self.handles
            .accessibility
            .as_ref()
            .map(|a| a.screen_bounds())
            .filter(|r| !r.is_empty())
            .unwrap_or(self.fallback_screen)
    }

    /// Base64 JPEG of the current screen, or `None` if any stage fails.
    pub async fn capture_screen(&self) -> Option<String> {
        let Some(capturer) = self.handles.capturer.as_ref() else {
            tracing::warn!("no screen capturer available");
            return None;
        };
        let frame = match capturer.capture(CaptureMode::Auto).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "screen capture failed");
                return None;
            }
        };
        let encoded = frame
            .load()
            .and_then(|bytes| downscale_and_encode(&bytes, self.config.max_side, self.config.jpeg_quality));
        match encoded {
            Ok(shot) => Some(shot.image_base64),
            Err(e) => {
                tracing::warn!(error = %e, "screenshot processing failed");
                None
            }
        }
    }

    pub fn dump_ui_tree(&self) -> String {
        let Some(bridge) = self.handles.accessibility.as_ref() else {
            return UNAVAILABLE_NO_BRIDGE.to_string();
        };
        let Some(root) = bridge.active_root() else {
            return UNAVAILABLE_NO_ROOT.to_string();
        };
        let tree = ui_automation::dump_tree(&root, &self.screen_bounds(), self.config.min_node_px);
        tracing::debug!(chars = tree.len(), "UI hierarchy dumped");
        tree
    }

    /// Foreground package from the bridge, else from the focused window
    /// that `dumpsys` reports over the shell.
    pub async fn foreground_package(&self) -> Option<String> {
        let from_bridge = self
            .handles
            .accessibility
            .as_ref()
            .and_then(|a| a.foreground_package())
            .filter(|p| !p.is_empty());
        if from_bridge.is_some() {
            return from_bridge;
        }
        let shell = self.handles.shell.as_ref()?;
        match shell.exec(CURRENT_FOCUS_COMMAND).await {
            Ok(output) => parse_current_focus(&output),
            Err(e) => {
                tracing::warn!(error = %e, "current focus lookup failed");
                None
            }
        }
    }

    /// Launchable apps for the model, sorted by label. Empty when there is
    /// no catalog or listing fails.
    pub async fn installed_apps(&self) -> Vec<AppEntry> {
        let Some(apps) = self.handles.apps.as_ref() else {
            return Vec::new();
        };
        match apps.installed_apps().await {
            Ok(mut list) => {
                list.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
                list.dedup_by(|a, b| a.package == b.package);
                list
            }
            Err(e) => {
                tracing::warn!(error = %e, "app listing failed");
                Vec::new()
            }
        }
    }

    pub async fn snapshot(&self) -> ScreenSnapshot {
        let encoded_image = self.capture_screen().await;
        let ui_tree = self.dump_ui_tree();
        let foreground_package = self.foreground_package().await;
        tracing::info!(
            has_image = encoded_image.is_some(),
            tree_chars = ui_tree.len(),
            package = foreground_package.as_deref().unwrap_or("unknown"),
            "screen perceived"
        );
        ScreenSnapshot { encoded_image, ui_tree, foreground_package }
    }
}
