//! Geometry
//!
//! Rectangles and root margins used for viewport intersection.

use crate::{DomError, DomResult};

/// DOM rect
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DomRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DomRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 { self.x + self.width }
    pub fn bottom(&self) -> f32 { self.y + self.height }

    /// Calculate intersection with another rect
    pub fn intersect(&self, other: &DomRect) -> Option<DomRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(DomRect {
                x,
                y,
                width: right - x,
                height: bottom - y,
            })
        } else {
            None
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Fraction of this rect's area that lies inside `other`
    pub fn visible_ratio(&self, other: &DomRect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            // Zero-area targets count as fully visible when they sit inside the root
            let inside = self.x >= other.x
                && self.right() <= other.right()
                && self.y >= other.y
                && self.bottom() <= other.bottom();
            return if inside { 1.0 } else { 0.0 };
        }
        self.intersect(other).map(|i| i.area() / area).unwrap_or(0.0)
    }
}

/// A single root-margin component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    Px(f32),
    /// Percentage of the root's width (left/right) or height (top/bottom)
    Percent(f32),
}

impl MarginValue {
    fn parse(token: &str) -> Option<Self> {
        if let Some(num) = token.strip_suffix("px") {
            num.parse().ok().map(MarginValue::Px)
        } else if let Some(num) = token.strip_suffix('%') {
            num.parse().ok().map(MarginValue::Percent)
        } else if token == "0" {
            Some(MarginValue::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, extent: f32) -> f32 {
        match self {
            MarginValue::Px(px) => px,
            MarginValue::Percent(pct) => extent * pct / 100.0,
        }
    }
}

/// Root margin in CSS shorthand order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl Default for RootMargin {
    fn default() -> Self {
        let zero = MarginValue::Px(0.0);
        Self { top: zero, right: zero, bottom: zero, left: zero }
    }
}

impl RootMargin {
    /// Parse `"10px"`, `"10px 5%"`, `"1px 2px 3px"` or `"1px 2px 3px 4px"`
    pub fn parse(input: &str) -> DomResult<Self> {
        let values = input
            .split_whitespace()
            .map(MarginValue::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| DomError::InvalidRootMargin(input.to_string()))?;

        let (top, right, bottom, left) = match values.as_slice() {
            [] => return Ok(Self::default()),
            [all] => (*all, *all, *all, *all),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(DomError::InvalidRootMargin(input.to_string())),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// Grow (or shrink, for negative values) a root rect
    pub fn apply(&self, root: DomRect) -> DomRect {
        let top = self.top.resolve(root.height);
        let bottom = self.bottom.resolve(root.height);
        let left = self.left.resolve(root.width);
        let right = self.right.resolve(root.width);

        DomRect {
            x: root.x - left,
            y: root.y - top,
            width: (root.width + left + right).max(0.0),
            height: (root.height + top + bottom).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let a = DomRect::new(0.0, 0.0, 100.0, 100.0);
        let b = DomRect::new(50.0, 50.0, 100.0, 100.0);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i, DomRect::new(50.0, 50.0, 50.0, 50.0));
        assert!(a.intersect(&DomRect::new(200.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_visible_ratio() {
        let viewport = DomRect::new(0.0, 0.0, 800.0, 600.0);
        let half = DomRect::new(0.0, 500.0, 100.0, 200.0);
        assert!((half.visible_ratio(&viewport) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_root_margin_shorthand() {
        let m = RootMargin::parse("10px 20%").unwrap();
        assert_eq!(m.top, MarginValue::Px(10.0));
        assert_eq!(m.right, MarginValue::Percent(20.0));
        assert_eq!(m.left, MarginValue::Percent(20.0));

        let grown = m.apply(DomRect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(grown, DomRect::new(-20.0, -10.0, 140.0, 120.0));
    }

    #[test]
    fn test_root_margin_rejects_units() {
        assert!(RootMargin::parse("10em").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
    }
}
