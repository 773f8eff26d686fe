use std::time::Duration;

use crate::executor::coordinator::visible_center;
use crate::executor::locator::{locate, NodeMatch};
use crate::executor::{ActionExecutor, ActionOutcome};
use crate::platform::{CaptureMode, OcrRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Gesture tap at the center of the on-screen part of the node.
    TapCenter,
    /// Accessibility click action on the node itself.
    DirectClick,
    /// Accessibility click on the nearest clickable ancestor.
    AncestorClick,
}

pub const CLICK_STRATEGIES: [ClickStrategy; 3] = [
    ClickStrategy::TapCenter,
    ClickStrategy::DirectClick,
    ClickStrategy::AncestorClick,
];

impl ClickStrategy {
    fn label(&self) -> &'static str {
        match self {
            ClickStrategy::TapCenter => "tapped center",
            ClickStrategy::DirectClick => "accessibility click",
            ClickStrategy::AncestorClick => "clicked parent container",
        }
    }
}

impl ActionExecutor {
    /// Click the element best matching `target`: structural lookup first,
    /// then OCR on a fresh screenshot.
    pub async fn click_element(&self, target: &str) -> ActionOutcome {
        if target.trim().is_empty() {
            return ActionOutcome::error("click_element needs a non-empty target");
        }

        let root = self.handles.accessibility.as_ref().and_then(|a| a.active_root());
        let structural = match root.as_ref().and_then(|r| locate(r, target)) {
            Some(found) => {
                tracing::debug!(target, locator = found.locator.label(), score = found.score, "element located");
                match self.click_node(&found).await {
                    Some(how) => {
                        return ActionOutcome::success(format!(
                            "Clicked '{target}' ({}, {how}).",
                            found.locator.label()
                        ));
                    }
                    None => "element found but every click attempt failed",
                }
            }
            None if root.is_none() => "no accessibility tree available",
            None => "no matching node",
        };

        tracing::info!(target, reason = structural, "structural lookup exhausted, trying OCR");
        match self.click_by_ocr(target).await {
            Ok((x, y)) => ActionOutcome::success(format!(
                "'{target}' was not clickable in the UI hierarchy; clicked it via OCR at ({x}, {y})."
            )),
            Err(ocr_reason) => ActionOutcome::failure(format!(
                "could not find '{target}' on screen: structural lookup exhausted ({structural}) and OCR also failed ({ocr_reason})."
            )),
        }
    }

    /// Run the click strategies in order; returns the label of the one that worked.
    async fn click_node(&self, found: &NodeMatch<'_>) -> Option<&'static str> {
        for strategy in CLICK_STRATEGIES {
            if self.try_click(strategy, found).await {
                return Some(strategy.label());
            }
        }
        None
    }

    async fn try_click(&self, strategy: ClickStrategy, found: &NodeMatch<'_>) -> bool {
        match strategy {
            ClickStrategy::TapCenter => match visible_center(&found.node.bounds, &self.screen()) {
                Some((x, y)) => self.tap_point(x, y).await,
                None => false,
            },
            ClickStrategy::DirectClick => {
                let Some(bridge) = self.handles.accessibility.as_ref() else {
                    return false;
                };
                match found.node.id {
                    Some(id) if found.node.clickable => bridge.perform_click(id),
                    _ => false,
                }
            }
            ClickStrategy::AncestorClick => {
                let Some(bridge) = self.handles.accessibility.as_ref() else {
                    return false;
                };
                found
                    .ancestors
                    .iter()
                    .filter(|a| a.clickable)
                    .filter_map(|a| a.id)
                    .any(|id| bridge.perform_click(id))
            }
        }
    }

    /// Poll the hierarchy until nothing matches `target` any more.
    pub async fn wait_for_element_to_disappear(&self, target: &str, timeout: Duration) -> ActionOutcome {
        let Some(bridge) = self.handles.accessibility.as_ref() else {
            return ActionOutcome::error("accessibility service not running, cannot observe the screen");
        };
        let started = tokio::time::Instant::now();
        let polled = tokio::time::timeout(timeout, async {
            loop {
                match bridge.active_root() {
                    None => tokio::time::sleep(Duration::from_millis(500)).await,
                    Some(root) if locate(&root, target).is_none() => return,
                    Some(_) => tokio::time::sleep(Duration::from_secs(1)).await,
                }
            }
        })
        .await;

        match polled {
            Ok(()) => {
                tracing::debug!(target, elapsed_ms = started.elapsed().as_millis() as u64, "element disappeared");
                ActionOutcome::success(format!("'{target}' has disappeared."))
            }
            Err(_) => ActionOutcome::failure(format!(
                "'{target}' was still on screen after {} ms.",
                timeout.as_millis()
            )),
        }
    }

    async fn click_by_ocr(&self, target: &str) -> Result<(i32, i32), String> {
        let capturer = self.handles.capturer.as_ref().ok_or("no screen capturer")?;
        let ocr = self.handles.ocr.as_ref().ok_or("no OCR engine")?;

        let image = capturer
            .capture(CaptureMode::Auto)
            .await
            .map_err(|e| format!("screenshot failed: {e}"))?;
        let search = ocr
            .search(OcrRequest {
                image,
                target: target.to_string(),
                language: self.perception.config().ocr_language.clone(),
            })
            .await
            .map_err(|e| format!("OCR error: {e}"))?;

        let hit = match search.first_match {
            Some(hit) if search.found => hit,
            _ => return Err("text not recognized on screen".into()),
        };
        let (x, y) = hit.bounds.center();
        tracing::info!(target, matched = %hit.text, x, y, "OCR located target");
        if self.tap_point(x, y).await {
            Ok((x, y))
        } else {
            Err(format!("tap at ({x}, {y}) failed"))
        }
    }
}
