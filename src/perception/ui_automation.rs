/// Accessibility tree serialization.
///
/// Turns the foreground window's node tree into an indented pseudo-markup the
/// model can read, keeping only nodes that are on screen and carry a label or
/// an interaction flag.
use crate::perception::types::{Rect, UiNode};

pub const UNAVAILABLE_NO_BRIDGE: &str =
    "UI hierarchy unavailable (accessibility service not running)";
pub const UNAVAILABLE_NO_ROOT: &str = "UI hierarchy unavailable (no active window)";

/// Serialize `root` and its descendants.
///
/// A node that is invisible, outside `screen` or smaller than `min_px` in
/// either dimension is dropped together with its whole subtree. Other nodes
/// are printed only when they have text, a description, an id, or are
/// clickable, editable or scrollable; their children are visited regardless.
pub fn dump_tree(root: &UiNode, screen: &Rect, min_px: i32) -> String {
    let mut out = String::new();
    dump_node(root, screen, min_px, 0, &mut out);
    out
}

fn dump_node(node: &UiNode, screen: &Rect, min_px: i32, depth: usize, out: &mut String) {
    if !node.visible || !node.bounds.intersects(screen) {
        return;
    }
    if node.bounds.width() < min_px || node.bounds.height() < min_px {
        return;
    }

    let interactive = node.clickable || node.editable || node.scrollable;
    if node.has_label() || interactive {
        out.push_str(&"  ".repeat(depth));
        out.push('<');
        out.push_str(if node.class_name.is_empty() { "View" } else { node.simple_class() });

        if let Some(text) = non_blank(&node.text) {
            out.push_str(&format!(" text=\"{}\"", sanitize(text)));
        }
        if let Some(desc) = non_blank(&node.description) {
            out.push_str(&format!(" desc=\"{}\"", sanitize(desc)));
        }
        if let Some(id) = node.short_id() {
            out.push_str(&format!(" id=\"{id}\""));
        }
        if node.clickable {
            out.push_str(" clickable=\"true\"");
        }
        if node.editable {
            out.push_str(" editable=\"true\"");
        }
        if node.scrollable {
            out.push_str(" scrollable=\"true\"");
        }
        let visible_rect = node.bounds.clipped(screen).unwrap_or(node.bounds);
        out.push_str(&format!(" bounds=\"{}\"", visible_rect.to_bounds_string()));
        out.push_str(" />\n");
    }

    for child in &node.children {
        dump_node(child, screen, min_px, depth + 1, out);
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn sanitize(value: &str) -> String {
    value.replace('\n', " ").replace('"', "'")
}
