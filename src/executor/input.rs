// Gesture and key injection. Each primitive tries the accessibility gesture
// first and falls back to `input` over an elevated shell.
use std::time::Duration;

use tokio::sync::oneshot;

use crate::executor::coordinator::{scroll_path, ScrollDirection};
use crate::executor::{ActionExecutor, ActionOutcome};
use crate::platform::{Gesture, GestureOutcome, GlobalAction, Stroke};

const TAP_MS: u64 = 50;
const SCROLL_MS: u64 = 300;
const DOUBLE_TAP_GAP_MS: u64 = 100;

impl ActionExecutor {
    /// Dispatch through the accessibility bridge and wait for the platform's
    /// verdict. A callback dropped without firing counts as cancelled.
    pub(crate) async fn dispatch_gesture(&self, gesture: Gesture) -> bool {
        let Some(bridge) = self.handles.accessibility.as_ref() else {
            return false;
        };
        let (tx, rx) = oneshot::channel();
        let accepted = bridge.dispatch_gesture(
            gesture,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        if !accepted {
            tracing::debug!("gesture rejected by accessibility bridge");
            return false;
        }
        matches!(rx.await, Ok(GestureOutcome::Completed))
    }

    /// Run `input <args>` when an elevated shell is available.
    pub(crate) async fn shell_input(&self, args: &str) -> bool {
        let Some(shell) = self.handles.elevated_shell().await else {
            return false;
        };
        match shell.exec(&format!("input {args}")).await {
            Ok(out) => !out.trim_start().starts_with("Error"),
            Err(e) => {
                tracing::warn!(error = %e, args, "shell input failed");
                false
            }
        }
    }

    pub(crate) async fn tap_point(&self, x: i32, y: i32) -> bool {
        if self.dispatch_gesture(Gesture::single(vec![(x, y)], TAP_MS)).await {
            return true;
        }
        self.shell_input(&format!("tap {x} {y}")).await
    }

    async fn swipe_path(&self, from: (i32, i32), to: (i32, i32), duration_ms: u64) -> bool {
        if self.dispatch_gesture(Gesture::single(vec![from, to], duration_ms)).await {
            return true;
        }
        self.shell_input(&format!(
            "swipe {} {} {} {} {duration_ms}",
            from.0, from.1, to.0, to.1
        ))
        .await
    }

    pub async fn tap(&self, x: i32, y: i32) -> ActionOutcome {
        if self.tap_point(x, y).await {
            ActionOutcome::success(format!("Tapped at ({x}, {y})."))
        } else {
            ActionOutcome::failure(format!("Could not tap at ({x}, {y})."))
        }
    }

    pub async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> ActionOutcome {
        if self.swipe_path((x, y), (x, y), duration_ms).await {
            ActionOutcome::success(format!("Long pressed at ({x}, {y}) for {duration_ms} ms."))
        } else {
            ActionOutcome::failure("Could not long press.")
        }
    }

    pub async fn double_tap(&self, x: i32, y: i32) -> ActionOutcome {
        let gesture = Gesture {
            strokes: vec![
                Stroke { points: vec![(x, y)], start_ms: 0, duration_ms: TAP_MS },
                Stroke { points: vec![(x, y)], start_ms: DOUBLE_TAP_GAP_MS, duration_ms: TAP_MS },
            ],
        };
        if self.dispatch_gesture(gesture).await {
            return ActionOutcome::success(format!("Double tapped at ({x}, {y})."));
        }
        let tap = format!("tap {x} {y}");
        if self.shell_input(&tap).await && self.shell_input(&tap).await {
            return ActionOutcome::success(format!("Double tapped (shell) at ({x}, {y})."));
        }
        ActionOutcome::failure("Could not double tap.")
    }

    pub async fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u64) -> ActionOutcome {
        if self.swipe_path((x1, y1), (x2, y2), duration_ms).await {
            ActionOutcome::success(format!("Swiped from ({x1}, {y1}) to ({x2}, {y2})."))
        } else {
            ActionOutcome::failure("Could not swipe (gesture and shell both failed).")
        }
    }

    pub async fn scroll(&self, direction: &str) -> ActionOutcome {
        let Some(dir) = ScrollDirection::parse(direction) else {
            return ActionOutcome::error(format!(
                "unknown scroll direction '{direction}', expected up, down, left or right"
            ));
        };
        let (from, to) = scroll_path(dir, &self.screen());
        if self.swipe_path(from, to, SCROLL_MS).await {
            ActionOutcome::success(format!("Scrolled {}.", dir.as_str()))
        } else {
            ActionOutcome::failure(format!("Scroll {} was cancelled or no input back-end is available.", dir.as_str()))
        }
    }

    pub async fn press_key(&self, action: &str) -> ActionOutcome {
        let Some(key) = GlobalAction::parse(action) else {
            return ActionOutcome::error(format!(
                "unknown key '{action}', expected back, home or recents"
            ));
        };
        if let Some(bridge) = self.handles.accessibility.as_ref() {
            if bridge.global_action(key) {
                return ActionOutcome::success(format!("Pressed {}.", action.trim().to_lowercase()));
            }
        }
        if self.shell_input(&format!("keyevent {}", key.keycode())).await {
            return ActionOutcome::success(format!("Pressed {} (shell).", action.trim().to_lowercase()));
        }
        ActionOutcome::failure(format!("Could not press {}.", action.trim().to_lowercase()))
    }

    /// Sleep `seconds`, clamped to 1..=60.
    pub async fn wait(&self, seconds: u64) -> ActionOutcome {
        let secs = seconds.clamp(1, 60);
        tracing::debug!(secs, "agent waiting");
        tokio::time::sleep(Duration::from_secs(secs)).await;
        ActionOutcome::success(format!("Waited for {secs} seconds. Check the screen status again."))
    }
}
