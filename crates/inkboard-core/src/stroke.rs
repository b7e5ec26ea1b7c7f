//! Freehand stroke geometry.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// One continuous drawn path between a begin and an end event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Points in canvas-local coordinates. The first point is the origin.
    points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at `origin`. A stroke is never empty.
    pub fn begin(origin: Point) -> Self {
        Self {
            points: vec![origin],
        }
    }

    /// Append a point and return the segment it closes.
    pub fn extend_to(&mut self, point: Point) -> (Point, Point) {
        let previous = self.last();
        self.points.push(point);
        (previous, point)
    }

    pub fn origin(&self) -> Point {
        self.points[0]
    }

    pub fn last(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Number of rendered segments.
    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }
}
