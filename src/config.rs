use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub perception: PerceptionConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub api_base: String,
    pub model: String,
    /// Optional API key stored in config.toml (overridden by env var DROIDCLAW_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

/// Knobs of the perceive-think-act loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Pause after each executed tool call, giving the UI time to settle.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_ui_tree_char_limit")]
    pub ui_tree_char_limit: usize,
    /// Identical `scroll` calls tolerated before an intervention.
    #[serde(default = "default_scroll_repeat_threshold")]
    pub scroll_repeat_threshold: u32,
    /// Identical calls of any other tool tolerated before an intervention.
    #[serde(default = "default_repeat_threshold")]
    pub repeat_threshold: u32,
    /// The urgency note is injected once this many steps or fewer remain.
    #[serde(default = "default_urgency_window")]
    pub urgency_window: u32,
    /// Expose tap / long_press / swipe / wait in addition to the six core tools.
    #[serde(default)]
    pub extended_tools: bool,
    /// Append every step to a JSONL journal under the local data directory.
    #[serde(default)]
    pub journal: bool,
}

fn default_max_steps() -> u32 {
    10
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_ui_tree_char_limit() -> usize {
    8000
}

fn default_scroll_repeat_threshold() -> u32 {
    5
}

fn default_repeat_threshold() -> u32 {
    2
}

fn default_urgency_window() -> u32 {
    2
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            settle_delay_ms: default_settle_delay_ms(),
            ui_tree_char_limit: default_ui_tree_char_limit(),
            scroll_repeat_threshold: default_scroll_repeat_threshold(),
            repeat_threshold: default_repeat_threshold(),
            urgency_window: default_urgency_window(),
            extended_tools: false,
            journal: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Longest side of the screenshot sent to the model, in pixels.
    #[serde(default = "default_max_side")]
    pub max_side: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Nodes narrower or shorter than this are left out of the hierarchy dump.
    #[serde(default = "default_min_node_px")]
    pub min_node_px: i32,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
}

fn default_max_side() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    60
}

fn default_min_node_px() -> i32 {
    1
}

fn default_ocr_language() -> String {
    "zh+en".into()
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            max_side: default_max_side(),
            jpeg_quality: default_jpeg_quality(),
            min_node_px: default_min_node_px(),
            ocr_language: default_ocr_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// `adb -s` serial; the only attached device is used when absent.
    #[serde(default)]
    pub serial: Option<String>,
    /// Screen size used for gestures when no accessibility bridge reports one.
    #[serde(default = "default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "default_screen_height")]
    pub screen_height: i32,
}

fn default_adb_path() -> String {
    "adb".into()
}

fn default_screen_width() -> i32 {
    1080
}

fn default_screen_height() -> i32 {
    2400
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

fn resolve_config_path() -> DroidClawResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(DroidClawError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> DroidClawResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> DroidClawResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[llm]
active_provider = "dashscope"

[llm.providers.dashscope]
display_name = "Aliyun Bailian"
api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
model = "qwen-vl-max"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.agent.max_steps, 10);
        assert_eq!(cfg.agent.settle_delay_ms, 500);
        assert_eq!(cfg.agent.ui_tree_char_limit, 8000);
        assert_eq!(cfg.agent.scroll_repeat_threshold, 5);
        assert_eq!(cfg.agent.repeat_threshold, 2);
        assert!(!cfg.agent.extended_tools);
        assert_eq!(cfg.perception.max_side, 1024);
        assert_eq!(cfg.perception.jpeg_quality, 60);
        assert_eq!(cfg.device.adb_path, "adb");

        let provider = &cfg.llm.providers["dashscope"];
        assert_eq!(provider.connect_timeout_secs, 60);
        assert!(provider.api_key.is_none());
    }

    #[test]
    fn load_config_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let body = format!("{MINIMAL}\n[agent]\nmax_steps = 25\nextended_tools = true\n");
        std::fs::write(&path, body).unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.agent.max_steps, 25);
        assert!(cfg.agent.extended_tools);
        assert_eq!(cfg.agent.repeat_threshold, 2);
    }

    #[test]
    fn broken_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nactive_provider = 1").unwrap();
        assert!(matches!(load_config_from(&path), Err(DroidClawError::TomlDe(_))));
    }
}
