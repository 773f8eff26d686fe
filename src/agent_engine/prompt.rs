use std::sync::OnceLock;

use regex::Regex;

use crate::config::AgentConfig;
use crate::llm::types::{ChatMessage, ContentPart, ImageUrl};
use crate::perception::types::ScreenSnapshot;
use crate::platform::AppEntry;

pub const VISION_UNAVAILABLE: &str =
    "[Vision unavailable: screenshot capture failed. Rely on the UI hierarchy.]";

pub const TRUNCATION_MARKER: &str = "...(truncated)";

pub const NO_LAUNCHABLE_APPS: &str = "No launchable apps found.";

/// `Label (package)` entries joined with ", ".
pub fn format_app_list(apps: &[AppEntry]) -> String {
    if apps.is_empty() {
        return NO_LAUNCHABLE_APPS.to_string();
    }
    apps.iter()
        .map(|a| format!("{} ({})", a.label, a.package))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn system_prompt(goal: &str, apps: &[AppEntry]) -> String {
    let app_list = format_app_list(apps);
    format!(
        "\
You are DroidClaw, an autonomous agent operating an Android phone through tools.
Every turn you receive the current screen as a screenshot and as an accessibility hierarchy.

Rules:
- Check `Current App` first. If it is not the app the task needs, call `launch_app`.
- Prefer `click_element` with the visible text or id from the hierarchy.
- After every action, look at the next screen to verify it worked before moving on.
- If a click changed nothing, try a different target instead of repeating it.
- If the element is not visible, scroll; if the page is unrelated, press back.
- Call `finish_task` as soon as the task is done, or when it cannot be done.
- Respond in the same language as the task.

# Installed Apps
Pass the package name in parentheses to `launch_app`:
{app_list}

# Goal
Complete the user's task: \"{goal}\""
    )
}

/// Text returned as tool result in place of a blocked, repeated call.
pub fn intervention_message(tool: &str, repeats: u32) -> String {
    format!(
        "SYSTEM INTERVENTION: `{tool}` was just called with identical arguments {} times in a row \
         and was NOT executed this time. The screen is probably not changing. Change strategy: \
         scroll in the opposite direction, press back, or pick a different element.",
        repeats + 1
    )
}

/// Cut `tree` to at most `limit` characters, marking the cut.
pub fn truncate_tree(tree: &str, limit: usize) -> String {
    match tree.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &tree[..byte_idx], TRUNCATION_MARKER),
        None => tree.to_string(),
    }
}

/// Steps left in the budget, counting the current one.
pub fn remaining_steps(step: u32, budget: u32) -> u32 {
    budget.saturating_sub(step)
}

/// The per-step user message: round info, hierarchy and the screenshot (or
/// a notice that there is none). `step` is zero-based.
pub fn build_user_turn(
    step: u32,
    budget: u32,
    snapshot: &ScreenSnapshot,
    last_action: &str,
    cfg: &AgentConfig,
) -> ChatMessage {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S %A");
    let remaining = remaining_steps(step, budget);

    let mut text = format!(
        "--- ROUND INFO ---\n\
         Current Step: {} / {budget}\n\
         Time: {timestamp}\n\
         Current App: {}\n\
         Last Action: {last_action}\n",
        step + 1,
        snapshot.foreground_package.as_deref().unwrap_or("Unknown"),
    );
    if remaining <= cfg.urgency_window {
        text.push_str(&format!(
            "URGENT: only {remaining} step(s) left including this one. \
             Finish the task now or call finish_task with what you have.\n"
        ));
    }
    text.push_str("\nScreen Hierarchy (Accessibility):\n");
    text.push_str(&truncate_tree(&snapshot.ui_tree, cfg.ui_tree_char_limit));

    let mut parts = vec![ContentPart::Text { text }];
    match &snapshot.encoded_image {
        Some(b64) => parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl { url: format!("data:image/jpeg;base64,{b64}") },
        }),
        None => parts.push(ContentPart::Text { text: VISION_UNAVAILABLE.to_string() }),
    }
    ChatMessage::user_parts(parts)
}

static THINKING: OnceLock<Regex> = OnceLock::new();

/// Content of a `<think>` / `<thinking>` block, if the reply has one.
pub fn extract_thinking(content: &str) -> Option<String> {
    let re = THINKING.get_or_init(|| {
        Regex::new(r"(?s)<(think|thinking)>(.*?)</(?:think|thinking)>").expect("static regex compiles")
    });
    re.captures(content)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}
