use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in physical screen pixels, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Intersection with `other`, or `None` when they do not overlap.
    pub fn clipped(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        })
    }

    /// `[l,t][r,b]`, the notation used in hierarchy dumps.
    pub fn to_bounds_string(&self) -> String {
        format!("[{},{}][{},{}]", self.left, self.top, self.right, self.bottom)
    }
}

/// Stable handle of a node inside the accessibility bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Owned snapshot of one accessibility node and its subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiNode {
    pub id: Option<NodeId>,
    /// Fully qualified class, e.g. `android.widget.Button`.
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    /// Resource id, e.g. `com.android.settings:id/search`.
    pub view_id: Option<String>,
    pub visible: bool,
    pub bounds: Rect,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Resource id without its `package:id/` prefix.
    pub fn short_id(&self) -> Option<&str> {
        let id = self.view_id.as_deref()?;
        let short = match id.split_once(":id/") {
            Some((_, rest)) => rest,
            None => id,
        };
        (!short.is_empty()).then_some(short)
    }

    /// Last segment of the class name (`Button` for `android.widget.Button`).
    pub fn simple_class(&self) -> &str {
        self.class_name.rsplit('.').next().unwrap_or(&self.class_name)
    }

    pub fn has_label(&self) -> bool {
        [&self.text, &self.description, &self.view_id]
            .iter()
            .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Everything the model sees about the screen in one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    /// Base64 JPEG, absent when capture failed.
    pub encoded_image: Option<String>,
    pub ui_tree: String,
    pub foreground_package: Option<String>,
}
