// Detection of the model repeating the same tool call.
use crate::config::AgentConfig;
use crate::llm::tools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatVerdict {
    Allow,
    /// Same call seen too often in a row; do not execute it.
    Intervene { repeats: u32 },
}

/// Remembers the last tool call (name and raw argument string) and how many
/// times in a row it was repeated. Updated exactly once per processed call,
/// including calls that end up blocked.
#[derive(Debug, Clone)]
pub struct RepeatGuard {
    last: Option<(String, String)>,
    repeats: u32,
    scroll_threshold: u32,
    default_threshold: u32,
}

impl RepeatGuard {
    pub fn new(scroll_threshold: u32, default_threshold: u32) -> Self {
        Self {
            last: None,
            repeats: 0,
            scroll_threshold,
            default_threshold,
        }
    }

    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::new(cfg.scroll_repeat_threshold, cfg.repeat_threshold)
    }

    pub fn threshold_for(&self, tool: &str) -> u32 {
        if tool == tools::SCROLL {
            self.scroll_threshold
        } else {
            self.default_threshold
        }
    }

    pub fn observe(&mut self, tool: &str, raw_arguments: &str) -> RepeatVerdict {
        let same = self
            .last
            .as_ref()
            .is_some_and(|(name, args)| name == tool && args == raw_arguments);
        if same {
            self.repeats += 1;
        } else {
            self.last = Some((tool.to_string(), raw_arguments.to_string()));
            self.repeats = 0;
        }

        if self.repeats >= self.threshold_for(tool) {
            tracing::warn!(tool, repeats = self.repeats, "repeated tool call detected");
            RepeatVerdict::Intervene { repeats: self.repeats }
        } else {
            RepeatVerdict::Allow
        }
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.repeats = 0;
    }
}

impl Default for RepeatGuard {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_identical_click_is_blocked() {
        let mut guard = RepeatGuard::default();
        let args = r#"{"target":"OK"}"#;
        assert_eq!(guard.observe("click_element", args), RepeatVerdict::Allow);
        assert_eq!(guard.observe("click_element", args), RepeatVerdict::Allow);
        assert_eq!(guard.observe("click_element", args), RepeatVerdict::Intervene { repeats: 2 });
        assert_eq!(guard.observe("click_element", args), RepeatVerdict::Intervene { repeats: 3 });
    }

    #[test]
    fn sixth_identical_scroll_is_blocked() {
        let mut guard = RepeatGuard::default();
        let args = r#"{"direction":"down"}"#;
        for _ in 0..5 {
            assert_eq!(guard.observe("scroll", args), RepeatVerdict::Allow);
        }
        assert_eq!(guard.observe("scroll", args), RepeatVerdict::Intervene { repeats: 5 });
    }

    #[test]
    fn changed_arguments_reset_the_count() {
        let mut guard = RepeatGuard::default();
        guard.observe("click_element", r#"{"target":"OK"}"#);
        guard.observe("click_element", r#"{"target":"OK"}"#);
        assert_eq!(guard.repeats(), 1);
        assert_eq!(guard.observe("click_element", r#"{"target":"Cancel"}"#), RepeatVerdict::Allow);
        assert_eq!(guard.repeats(), 0);
        assert_eq!(guard.observe("click_element", r#"{"target":"OK"}"#), RepeatVerdict::Allow);
        // Raw strings are compared, so formatting differences count as new calls.
        assert_eq!(guard.observe("click_element", r#"{"target": "OK"}"#), RepeatVerdict::Allow);
    }
}
