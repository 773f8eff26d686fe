// Screen geometry for gestures.
use crate::perception::types::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse(direction: &str) -> Option<Self> {
        match direction.trim().to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

const NEAR: f64 = 0.2;
const FAR: f64 = 0.8;

/// Start and end of a scroll swipe across 60% of the screen. Scrolling
/// "down" reveals content below, so the finger moves upwards.
pub fn scroll_path(direction: ScrollDirection, screen: &Rect) -> ((i32, i32), (i32, i32)) {
    let (cx, cy) = screen.center();
    let at_x = |f: f64| screen.left + (screen.width() as f64 * f) as i32;
    let at_y = |f: f64| screen.top + (screen.height() as f64 * f) as i32;
    match direction {
        ScrollDirection::Down => ((cx, at_y(FAR)), (cx, at_y(NEAR))),
        ScrollDirection::Up => ((cx, at_y(NEAR)), (cx, at_y(FAR))),
        ScrollDirection::Right => ((at_x(FAR), cy), (at_x(NEAR), cy)),
        ScrollDirection::Left => ((at_x(NEAR), cy), (at_x(FAR), cy)),
    }
}

/// Tap point for a node: the center of the part of `bounds` that is on screen.
pub fn visible_center(bounds: &Rect, screen: &Rect) -> Option<(i32, i32)> {
    bounds
        .clipped(screen)
        .filter(|r| !r.is_empty())
        .map(|r| r.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_down_swipes_upwards_through_sixty_percent() {
        let screen = Rect::new(0, 0, 1080, 2400);
        assert_eq!(scroll_path(ScrollDirection::Down, &screen), ((540, 1920), (540, 480)));
        assert_eq!(scroll_path(ScrollDirection::Up, &screen), ((540, 480), (540, 1920)));
        assert_eq!(scroll_path(ScrollDirection::Right, &screen), ((864, 1200), (216, 1200)));
        assert_eq!(ScrollDirection::parse("LEFT"), Some(ScrollDirection::Left));
        assert_eq!(ScrollDirection::parse("sideways"), None);
    }

    #[test]
    fn visible_center_uses_clipped_bounds() {
        let screen = Rect::new(0, 0, 1080, 2400);
        assert_eq!(visible_center(&Rect::new(900, 2300, 1300, 2500), &screen), Some((990, 2350)));
        assert_eq!(visible_center(&Rect::new(0, 2400, 100, 2500), &screen), None);
    }
}
