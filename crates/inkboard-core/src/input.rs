//! Pointer input normalization for mouse and touch events.
//!
//! Mouse and touch events arrive in different coordinate spaces. Both are
//! converted into a single [`PointerInput`] carrying a canvas-local position,
//! so the drawing surface only ever sees one kind of event.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Which input system produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Mouse,
    Touch,
}

/// Coordinate space a raw position was reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Already relative to the canvas top-left corner (mouse `offsetX/Y`).
    CanvasLocal,
    /// Relative to the viewport (touch `clientX/Y`).
    Client,
}

impl InputSource {
    /// The space this source reports positions in.
    pub fn coordinate_space(self) -> CoordinateSpace {
        match self {
            InputSource::Mouse => CoordinateSpace::CanvasLocal,
            InputSource::Touch => CoordinateSpace::Client,
        }
    }

    /// Whether the platform's default handling (scroll, pinch-zoom) must be
    /// suppressed for events from this source over the drawing surface.
    pub fn suppresses_default(self) -> bool {
        matches!(self, InputSource::Touch)
    }
}

/// Pointer event phase, shared by mouse and touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Mouse-down or touch-start.
    Down { position: Point },
    /// Mouse-move or touch-move.
    Move { position: Point },
    /// Mouse-up or touch-end.
    Up { position: Point },
    /// Pointer left the surface (mouse-out).
    Leave { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position }
            | PointerEvent::Leave { position } => position,
        }
    }

    fn with_position(self, position: Point) -> Self {
        match self {
            PointerEvent::Down { .. } => PointerEvent::Down { position },
            PointerEvent::Move { .. } => PointerEvent::Move { position },
            PointerEvent::Up { .. } => PointerEvent::Up { position },
            PointerEvent::Leave { .. } => PointerEvent::Leave { position },
        }
    }
}

/// On-screen placement of the drawing surface (its bounding rect origin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOffset {
    pub left: f64,
    pub top: f64,
}

impl SurfaceOffset {
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }

    /// Map a raw position into canvas-local coordinates.
    ///
    /// This is the only place coordinate math happens for either input
    /// system.
    pub fn to_canvas_local(&self, raw: Point, space: CoordinateSpace) -> Point {
        match space {
            CoordinateSpace::CanvasLocal => raw,
            CoordinateSpace::Client => raw - Vec2::new(self.left, self.top),
        }
    }
}

/// A normalized pointer event in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub source: InputSource,
    pub event: PointerEvent,
}

impl PointerInput {
    /// Normalize a raw event from `source`, whose position is in the source's
    /// native coordinate space.
    pub fn normalize(source: InputSource, raw: PointerEvent, offset: SurfaceOffset) -> Self {
        let local = offset.to_canvas_local(raw.position(), source.coordinate_space());
        Self {
            source,
            event: raw.with_position(local),
        }
    }

    /// A mouse event; mouse positions are already canvas-local.
    pub fn mouse(event: PointerEvent) -> Self {
        Self::normalize(InputSource::Mouse, event, SurfaceOffset::default())
    }

    /// A touch event with client-space coordinates.
    pub fn touch(event: PointerEvent, offset: SurfaceOffset) -> Self {
        Self::normalize(InputSource::Touch, event, offset)
    }

    pub fn position(&self) -> Point {
        self.event.position()
    }

    pub fn suppresses_default(&self) -> bool {
        self.source.suppresses_default()
    }
}
