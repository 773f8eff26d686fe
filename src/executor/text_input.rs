// Text entry cascade. Direct accessibility set-text first; then, with an
// elevated shell, `input text` when the text survives it and clipboard paste
// for the rest.
use std::time::Duration;

use crate::executor::{ActionExecutor, ActionOutcome};

const KEYCODE_PASTE: u32 = 279;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputStrategy {
    SetFocusedText,
    ShellTyping,
    ClipboardPaste,
}

pub const TEXT_INPUT_STRATEGIES: [TextInputStrategy; 3] = [
    TextInputStrategy::SetFocusedText,
    TextInputStrategy::ShellTyping,
    TextInputStrategy::ClipboardPaste,
];

impl TextInputStrategy {
    fn label(&self) -> &'static str {
        match self {
            TextInputStrategy::SetFocusedText => "set on focused field",
            TextInputStrategy::ShellTyping => "typed via shell",
            TextInputStrategy::ClipboardPaste => "pasted from clipboard",
        }
    }
}

/// `input text` only takes ASCII, and it turns every `%s` into a space with
/// no way to escape a literal `%`.
pub fn typeable_by_shell(text: &str) -> bool {
    text.is_ascii() && !text.contains('%')
}

/// Argument for `input text "<...>"`: spaces become `%s`, shell-active
/// characters are backslash-escaped. Only valid for [`typeable_by_shell`] text.
pub fn escape_for_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => out.push_str("%s"),
            '"' | '\\' | '$' | '`' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

impl ActionExecutor {
    pub async fn input_text(&self, text: &str) -> ActionOutcome {
        for strategy in TEXT_INPUT_STRATEGIES {
            if self.try_input(strategy, text).await {
                tracing::debug!(strategy = strategy.label(), chars = text.chars().count(), "text entered");
                return ActionOutcome::success(format!("Text entered ({}).", strategy.label()));
            }
        }
        ActionOutcome::failure(
            "could not input text: no focused editable field and no elevated shell available.",
        )
    }

    async fn try_input(&self, strategy: TextInputStrategy, text: &str) -> bool {
        match strategy {
            TextInputStrategy::SetFocusedText => {
                let Some(bridge) = self.handles.accessibility.as_ref() else {
                    return false;
                };
                match bridge.focused_input() {
                    Some(node) if node.editable => {
                        node.id.is_some_and(|id| bridge.set_text(id, text))
                    }
                    _ => false,
                }
            }
            TextInputStrategy::ShellTyping => {
                if !typeable_by_shell(text) {
                    return false;
                }
                self.shell_input(&format!("text \"{}\"", escape_for_input_text(text)))
                    .await
            }
            TextInputStrategy::ClipboardPaste => {
                let Some(clipboard) = self.handles.clipboard.as_ref() else {
                    return false;
                };
                if self.handles.elevated_shell().await.is_none() {
                    return false;
                }
                if !clipboard.set_text(text) {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                self.shell_input(&format!("keyevent {KEYCODE_PASTE}")).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_for_input_text() {
        assert_eq!(escape_for_input_text("hello world"), "hello%sworld");
        assert_eq!(escape_for_input_text("say \"hi\""), "say%s\\\"hi\\\"");
        assert_eq!(escape_for_input_text("$HOME"), "\\$HOME");
    }

    #[test]
    fn percent_and_non_ascii_skip_the_shell() {
        assert!(typeable_by_shell("hello world"));
        assert!(!typeable_by_shell("50%s off"));
        assert!(!typeable_by_shell("100%"));
        assert!(!typeable_by_shell("打开设置"));
    }
}
