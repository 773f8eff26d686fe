/// Resolves a symbolic click target to a node of the accessibility tree.
use std::collections::VecDeque;

use crate::perception::types::UiNode;

/// Fuzzy matches scoring at or above this are rejected.
pub const FUZZY_ACCEPT_BELOW: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    ExactText,
    ExactViewId,
    Fuzzy,
}

/// Tried in order; the first hit wins.
pub const LOCATORS: [Locator; 3] = [Locator::ExactText, Locator::ExactViewId, Locator::Fuzzy];

impl Locator {
    pub fn label(&self) -> &'static str {
        match self {
            Locator::ExactText => "exact text match",
            Locator::ExactViewId => "exact id match",
            Locator::Fuzzy => "fuzzy match",
        }
    }

    pub fn find<'a>(&self, root: &'a UiNode, target: &str) -> Option<NodeMatch<'a>> {
        let found = match self {
            Locator::ExactText => best_node(root, |n| {
                (n.text.as_deref() == Some(target)).then_some(0)
            }),
            Locator::ExactViewId => best_node(root, |n| {
                (n.view_id.as_deref() == Some(target) || n.short_id() == Some(target)).then_some(0)
            }),
            Locator::Fuzzy => {
                let clean_target = normalize(target);
                best_node(root, |n| node_score(n, &clean_target))
                    .filter(|m| m.score < FUZZY_ACCEPT_BELOW)
            }
        };
        found.map(|m| NodeMatch { locator: *self, ..m })
    }
}

#[derive(Debug, Clone)]
pub struct NodeMatch<'a> {
    pub node: &'a UiNode,
    /// Nearest parent first.
    pub ancestors: Vec<&'a UiNode>,
    pub score: u32,
    pub locator: Locator,
}

/// Run the locators in order against `root`.
pub fn locate<'a>(root: &'a UiNode, target: &str) -> Option<NodeMatch<'a>> {
    LOCATORS.iter().find_map(|locator| locator.find(root, target))
}

/// Keep ASCII letters/digits and CJK ideographs (U+4E00..=U+9FA5), lowercased.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Match quality of an already normalized `candidate` against `target`;
/// lower is better, `None` means no match.
pub fn score(candidate: &str, target: &str) -> Option<u32> {
    if candidate.is_empty() {
        return None;
    }
    if candidate == target {
        return Some(0);
    }
    let len_diff = candidate.chars().count().abs_diff(target.chars().count()) as u32;
    if target.contains(candidate) {
        Some(10 + len_diff)
    } else if candidate.contains(target) {
        Some(50 + len_diff)
    } else {
        None
    }
}

/// Best score over the node's text, description and short id.
pub fn node_score(node: &UiNode, clean_target: &str) -> Option<u32> {
    let fields = [
        node.text.as_deref(),
        node.description.as_deref(),
        node.short_id(),
    ];
    fields
        .into_iter()
        .flatten()
        .filter_map(|field| score(&normalize(field), clean_target))
        .min()
}

/// Breadth-first search for the visible node with the lowest score.
/// Stops at the first perfect (zero) score. Invisible nodes are not
/// candidates, but their children are still visited.
fn best_node<'a>(root: &'a UiNode, mut score_of: impl FnMut(&UiNode) -> Option<u32>) -> Option<NodeMatch<'a>> {
    // (node, index of parent in `seen`)
    let mut seen: Vec<(&'a UiNode, Option<usize>)> = Vec::new();
    let mut queue: VecDeque<(&'a UiNode, Option<usize>)> = VecDeque::from([(root, None)]);
    let mut best: Option<(usize, u32)> = None;

    while let Some((node, parent)) = queue.pop_front() {
        let idx = seen.len();
        seen.push((node, parent));

        if node.visible {
            if let Some(s) = score_of(node) {
                if best.map_or(true, |(_, b)| s < b) {
                    best = Some((idx, s));
                    if s == 0 {
                        break;
                    }
                }
            }
        }
        queue.extend(node.children.iter().map(|c| (c, Some(idx))));
    }

    let (idx, score) = best?;
    let mut ancestors = Vec::new();
    let mut cursor = seen[idx].1;
    while let Some(p) = cursor {
        ancestors.push(seen[p].0);
        cursor = seen[p].1;
    }
    Some(NodeMatch {
        node: seen[idx].0,
        ancestors,
        score,
        locator: Locator::Fuzzy,
    })
}
