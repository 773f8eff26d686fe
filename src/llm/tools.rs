use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::types::ToolDef;

pub const CLICK_ELEMENT: &str = "click_element";
pub const INPUT_TEXT: &str = "input_text";
pub const SCROLL: &str = "scroll";
pub const PRESS_KEY: &str = "press_key";
pub const LAUNCH_APP: &str = "launch_app";
pub const FINISH_TASK: &str = "finish_task";

pub const TAP: &str = "tap";
pub const LONG_PRESS: &str = "long_press";
pub const SWIPE: &str = "swipe";
pub const WAIT: &str = "wait";

/// Loads the tool schema sent with every request.
/// The six core tools come from prompts/tools/builtin.json; with `extended`
/// the coordinate tools of prompts/tools/extended.json are appended.
pub fn load_builtin_tools(extended: bool) -> DroidClawResult<Vec<ToolDef>> {
    let mut tools = parse_tools(include_str!("../../prompts/tools/builtin.json"), "builtin")?;
    if extended {
        tools.extend(parse_tools(include_str!("../../prompts/tools/extended.json"), "extended")?);
    }
    Ok(tools)
}

fn parse_tools(json: &str, which: &str) -> DroidClawResult<Vec<ToolDef>> {
    serde_json::from_str(json)
        .map_err(|e| DroidClawError::Config(format!("Failed to parse {which} tools: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tools: &[ToolDef]) -> Vec<&str> {
        tools.iter().map(|t| t.function.name.as_str()).collect()
    }

    #[test]
    fn core_schema_is_exactly_six_tools() {
        let tools = load_builtin_tools(false).unwrap();
        assert_eq!(
            names(&tools),
            vec![CLICK_ELEMENT, INPUT_TEXT, SCROLL, PRESS_KEY, LAUNCH_APP, FINISH_TASK]
        );
        assert!(tools.iter().all(|t| t.def_type == "function"));
    }

    #[test]
    fn extended_schema_appends_coordinate_tools() {
        let tools = load_builtin_tools(true).unwrap();
        assert_eq!(tools.len(), 10);
        assert_eq!(&names(&tools)[6..], &[TAP, LONG_PRESS, SWIPE, WAIT]);
    }

    #[test]
    fn enums_match_executor_vocabulary() {
        let tools = load_builtin_tools(false).unwrap();
        let scroll = tools.iter().find(|t| t.function.name == SCROLL).unwrap();
        assert_eq!(
            scroll.function.parameters["properties"]["direction"]["enum"],
            serde_json::json!(["up", "down", "left", "right"])
        );
        let key = tools.iter().find(|t| t.function.name == PRESS_KEY).unwrap();
        assert_eq!(
            key.function.parameters["properties"]["action"]["enum"],
            serde_json::json!(["back", "home", "recents"])
        );
    }
}
