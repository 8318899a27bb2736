//! Screen-space coordinates for ambient overlays.

use serde::{Deserialize, Serialize};

/// A position expressed as percentages of the viewport (0.0 to 100.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPercent {
    /// Horizontal position, 0 = left edge.
    pub x_percent: f64,
    /// Vertical position, 0 = top edge.
    pub y_percent: f64,
}

impl ScreenPercent {
    /// Creates a position, clamping both axes into `0..=100`.
    #[must_use]
    pub fn new(x_percent: f64, y_percent: f64) -> Self {
        Self {
            x_percent: clamp_percent(x_percent),
            y_percent: clamp_percent(y_percent),
        }
    }

    /// Checks if the position lies inside a margin-inset box.
    #[must_use]
    pub fn is_within(self, min: Self, max: Self) -> bool {
        (min.x_percent..=max.x_percent).contains(&self.x_percent)
            && (min.y_percent..=max.y_percent).contains(&self.y_percent)
    }
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_percent_clamps() {
        let p = ScreenPercent::new(-10.0, 150.0);
        assert!((p.x_percent - 0.0).abs() < f64::EPSILON);
        assert!((p.y_percent - 100.0).abs() < f64::EPSILON);
        assert!((ScreenPercent::new(f64::NAN, 5.0).x_percent).abs() < f64::EPSILON);
    }
}
