//! Drawing surface controller.
//!
//! Owns the raster while Drawing mode is active, turns normalized pointer
//! input into strokes, renders each segment as soon as it arrives and
//! encodes the raster into a [`DrawingPayload`] on submission.
//!
//! ```text
//!            Down                 Up / Leave
//!   Idle ───────────▶ Stroking ───────────────▶ Idle
//!                      │   ▲
//!                      └───┘ Move (render segment)
//! ```

use crate::input::{PointerEvent, PointerInput};
use crate::payload::{DrawingPayload, EncodeError};
use crate::raster::{Brush, MAX_RASTER_EDGE, Raster, Rgba8};
use crate::stroke::Stroke;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Appearance settings for the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceStyle {
    /// Opaque fill applied on activation and reset.
    pub background: Rgba8,
    pub brush: Brush,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            background: Rgba8::white(),
            brush: Brush::default(),
        }
    }
}

/// Stroke recording state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StrokeState {
    /// No active stroke.
    #[default]
    Idle,
    /// A stroke is being recorded.
    Stroking { stroke: Stroke },
}

/// What a pointer event did to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputOutcome {
    /// The event had no effect.
    Ignored,
    /// A new stroke started at this point.
    Began(Point),
    /// A segment was rendered.
    Segment { from: Point, to: Point },
    /// The active stroke closed; carries its segment count.
    Ended { segments: usize },
}

/// The drawing surface controller.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    style: SurfaceStyle,
    /// Present only while Drawing mode is active.
    raster: Option<Raster>,
    state: StrokeState,
    /// Completed strokes since the last activation or reset.
    strokes: Vec<Stroke>,
    segments_rendered: usize,
    /// Set while a submission is in flight.
    locked: bool,
    /// Pixel area changed since the last [`DrawingSurface::take_dirty`].
    dirty: Option<Rect>,
}

impl DrawingSurface {
    pub fn new(style: SurfaceStyle) -> Self {
        Self {
            style,
            raster: None,
            state: StrokeState::Idle,
            strokes: Vec::new(),
            segments_rendered: 0,
            locked: false,
            dirty: None,
        }
    }

    /// (Re)create the raster at the displayed size, filled with the opaque
    /// background, with no strokes and in the `Idle` state.
    pub fn activate(&mut self, width: u32, height: u32) {
        let background = self.style.background.opaque();
        if width > MAX_RASTER_EDGE || height > MAX_RASTER_EDGE {
            log::warn!(
                "Surface size {}x{} exceeds {} px per edge, clamping",
                width,
                height,
                MAX_RASTER_EDGE
            );
        }
        let raster = Raster::new(width, height, background);
        log::debug!("Drawing surface activated at {}x{}", raster.width(), raster.height());
        self.dirty = Some(raster.bounds());
        self.raster = Some(raster);
        self.clear_strokes();
        self.locked = false;
    }

    /// Discard the raster and all strokes.
    pub fn deactivate(&mut self) {
        if self.raster.take().is_some() {
            log::debug!("Drawing surface discarded");
        }
        self.clear_strokes();
        self.locked = false;
        self.dirty = None;
    }

    /// Clear the drawing back to the background, keeping the surface active.
    pub fn reset(&mut self) {
        let background = self.style.background.opaque();
        if let Some(raster) = &mut self.raster {
            raster.fill(background);
            self.dirty = Some(raster.bounds());
        }
        self.clear_strokes();
    }

    fn clear_strokes(&mut self) {
        self.state = StrokeState::Idle;
        self.strokes.clear();
        self.segments_rendered = 0;
    }

    /// Feed one normalized pointer event through the state machine.
    pub fn handle(&mut self, input: &PointerInput) -> InputOutcome {
        if self.raster.is_none() {
            return InputOutcome::Ignored;
        }

        match input.event {
            PointerEvent::Down { position } => {
                // Only one stroke can be open at a time.
                if matches!(self.state, StrokeState::Stroking { .. }) {
                    return InputOutcome::Ignored;
                }
                if self.locked {
                    log::debug!("Ignoring stroke start while a drawing is being submitted");
                    return InputOutcome::Ignored;
                }
                self.state = StrokeState::Stroking {
                    stroke: Stroke::begin(position),
                };
                InputOutcome::Began(position)
            }
            PointerEvent::Move { position } => {
                let StrokeState::Stroking { stroke } = &mut self.state else {
                    return InputOutcome::Ignored;
                };
                let (from, to) = stroke.extend_to(position);
                self.render_segment(from, to);
                InputOutcome::Segment { from, to }
            }
            // Leave ends the stroke at the last recorded point, exactly like Up.
            PointerEvent::Up { .. } | PointerEvent::Leave { .. } => {
                let StrokeState::Stroking { stroke } = std::mem::take(&mut self.state) else {
                    return InputOutcome::Ignored;
                };
                let segments = stroke.segment_count();
                self.strokes.push(stroke);
                InputOutcome::Ended { segments }
            }
        }
    }

    fn render_segment(&mut self, from: Point, to: Point) {
        let Some(raster) = self.raster.as_mut() else {
            return;
        };
        if let Some(area) = raster.draw_segment(from, to, &self.style.brush) {
            self.dirty = Some(match self.dirty {
                Some(dirty) => dirty.union(area),
                None => area,
            });
        }
        self.segments_rendered += 1;
    }

    /// Encode the current raster. Only valid while `Idle`.
    pub fn encode(&self) -> Result<DrawingPayload, EncodeError> {
        let raster = self.raster.as_ref().ok_or(EncodeError::NoSurface)?;
        if self.is_stroking() {
            return Err(EncodeError::StrokeInProgress);
        }
        DrawingPayload::encode(raster)
    }

    /// Block new strokes until [`DrawingSurface::unlock`].
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_active(&self) -> bool {
        self.raster.is_some()
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking { .. })
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    pub fn raster(&self) -> Option<&Raster> {
        self.raster.as_ref()
    }

    pub fn style(&self) -> &SurfaceStyle {
        &self.style
    }

    /// Completed strokes.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Total segments rendered since activation or reset.
    pub fn segments_rendered(&self) -> usize {
        self.segments_rendered
    }

    /// Take the pixel area changed since the last call, for blitting.
    pub fn take_dirty(&mut self) -> Option<Rect> {
        self.dirty.take()
    }
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new(SurfaceStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SurfaceOffset;

    fn down(x: f64, y: f64) -> PointerInput {
        PointerInput::mouse(PointerEvent::Down { position: Point::new(x, y) })
    }

    fn mv(x: f64, y: f64) -> PointerInput {
        PointerInput::mouse(PointerEvent::Move { position: Point::new(x, y) })
    }

    fn up(x: f64, y: f64) -> PointerInput {
        PointerInput::mouse(PointerEvent::Up { position: Point::new(x, y) })
    }

    fn leave(x: f64, y: f64) -> PointerInput {
        PointerInput::mouse(PointerEvent::Leave { position: Point::new(x, y) })
    }

    fn active_surface() -> DrawingSurface {
        let mut surface = DrawingSurface::default();
        surface.activate(200, 200);
        surface
    }

    #[test]
    fn test_inactive_surface_ignores_input() {
        let mut surface = DrawingSurface::default();
        assert_eq!(surface.handle(&down(1.0, 1.0)), InputOutcome::Ignored);
        assert!(!surface.is_stroking());
    }

    #[test]
    fn test_segments_equal_moves() {
        let mut surface = active_surface();
        let strokes: [&[(f64, f64)]; 3] = [
            &[(10.0, 10.0), (20.0, 20.0), (30.0, 10.0)],
            &[],
            &[(50.0, 50.0)],
        ];

        for (i, moves) in strokes.iter().enumerate() {
            let before = surface.segments_rendered();
            assert!(matches!(surface.handle(&down(5.0, 5.0 + i as f64)), InputOutcome::Began(_)));
            for &(x, y) in moves.iter() {
                assert!(matches!(surface.handle(&mv(x, y)), InputOutcome::Segment { .. }));
            }
            assert_eq!(
                surface.handle(&up(0.0, 0.0)),
                InputOutcome::Ended { segments: moves.len() }
            );
            assert_eq!(surface.segments_rendered() - before, moves.len());
        }
        assert_eq!(surface.strokes().len(), 3);
    }

    #[test]
    fn test_move_before_begin_is_noop() {
        let mut surface = active_surface();
        assert_eq!(surface.handle(&mv(10.0, 10.0)), InputOutcome::Ignored);
        assert_eq!(surface.segments_rendered(), 0);
        assert!(surface.raster().unwrap().is_filled_with(Rgba8::white()));
    }

    #[test]
    fn test_segment_renders_immediately() {
        let mut surface = active_surface();
        surface.handle(&down(10.0, 10.0));
        surface.handle(&mv(100.0, 100.0));
        // Still stroking, but the pixels are already there.
        assert!(surface.is_stroking());
        assert_eq!(surface.raster().unwrap().pixel(50, 50), Some(Rgba8::black()));
    }

    #[test]
    fn test_leave_ends_stroke_like_up() {
        let mut left = active_surface();
        left.handle(&down(10.0, 10.0));
        left.handle(&mv(40.0, 40.0));
        left.handle(&leave(250.0, 40.0));

        let mut lifted = active_surface();
        lifted.handle(&down(10.0, 10.0));
        lifted.handle(&mv(40.0, 40.0));
        lifted.handle(&up(40.0, 40.0));

        assert!(!left.is_stroking());
        assert_eq!(left.strokes(), lifted.strokes());
        assert_eq!(left.strokes()[0].last(), Point::new(40.0, 40.0));
        assert_eq!(left.raster(), lifted.raster());

        // Later moves do nothing until a new begin.
        assert_eq!(left.handle(&mv(60.0, 60.0)), InputOutcome::Ignored);
        assert!(matches!(left.handle(&down(60.0, 60.0)), InputOutcome::Began(_)));
        left.handle(&mv(70.0, 70.0));
        left.handle(&up(70.0, 70.0));
        assert_eq!(left.strokes().len(), 2);
        assert_eq!(left.strokes()[1].origin(), Point::new(60.0, 60.0));
    }

    #[test]
    fn test_second_down_while_stroking_is_ignored() {
        let mut surface = active_surface();
        surface.handle(&down(10.0, 10.0));
        assert_eq!(surface.handle(&down(90.0, 90.0)), InputOutcome::Ignored);
        surface.handle(&mv(20.0, 20.0));
        surface.handle(&up(20.0, 20.0));
        assert_eq!(surface.strokes()[0].origin(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_activate_always_blank() {
        let mut surface = active_surface();
        surface.handle(&down(0.0, 0.0));
        surface.handle(&mv(150.0, 150.0));
        surface.handle(&up(150.0, 150.0));
        assert!(!surface.raster().unwrap().is_filled_with(Rgba8::white()));

        surface.activate(300, 120);
        let raster = surface.raster().unwrap();
        assert_eq!((raster.width(), raster.height()), (300, 120));
        assert!(raster.is_filled_with(Rgba8::white()));
        assert!(surface.strokes().is_empty());
        assert_eq!(surface.segments_rendered(), 0);
        assert_eq!(*surface.state(), StrokeState::Idle);
    }

    #[test]
    fn test_activate_clamps_huge_size() {
        let mut surface = DrawingSurface::default();
        surface.activate(u32::MAX, u32::MAX);
        let raster = surface.raster().unwrap();
        assert_eq!((raster.width(), raster.height()), (MAX_RASTER_EDGE, MAX_RASTER_EDGE));
    }

    #[test]
    fn test_activate_mid_stroke_resets_to_idle() {
        let mut surface = active_surface();
        surface.handle(&down(0.0, 0.0));
        surface.activate(10, 10);
        assert!(!surface.is_stroking());
    }

    #[test]
    fn test_background_is_forced_opaque() {
        let mut surface = DrawingSurface::new(SurfaceStyle {
            background: Rgba8::new(10, 20, 30, 0),
            brush: Brush::default(),
        });
        surface.activate(4, 4);
        assert!(surface.raster().unwrap().is_filled_with(Rgba8::new(10, 20, 30, 255)));
    }

    #[test]
    fn test_touch_and_mouse_draw_identically() {
        let offset = SurfaceOffset::new(100.0, 40.0);
        let touch = |event: PointerEvent| {
            let p = event.position();
            let client = Point::new(p.x + offset.left, p.y + offset.top);
            let raw = match event {
                PointerEvent::Down { .. } => PointerEvent::Down { position: client },
                PointerEvent::Move { .. } => PointerEvent::Move { position: client },
                PointerEvent::Up { .. } => PointerEvent::Up { position: client },
                PointerEvent::Leave { .. } => PointerEvent::Leave { position: client },
            };
            PointerInput::touch(raw, offset)
        };

        let events = [
            PointerEvent::Down { position: Point::new(10.0, 10.0) },
            PointerEvent::Move { position: Point::new(60.0, 30.0) },
            PointerEvent::Move { position: Point::new(100.0, 100.0) },
            PointerEvent::Up { position: Point::new(100.0, 100.0) },
        ];

        let mut by_mouse = active_surface();
        let mut by_touch = active_surface();
        for event in events {
            by_mouse.handle(&PointerInput::mouse(event));
            by_touch.handle(&touch(event));
        }

        assert_eq!(by_mouse.strokes(), by_touch.strokes());
        assert_eq!(by_mouse.raster(), by_touch.raster());
    }

    #[test]
    fn test_lock_blocks_new_strokes() {
        let mut surface = active_surface();
        surface.lock();
        assert_eq!(surface.handle(&down(5.0, 5.0)), InputOutcome::Ignored);
        surface.unlock();
        assert!(matches!(surface.handle(&down(5.0, 5.0)), InputOutcome::Began(_)));
    }

    #[test]
    fn test_encode_requires_surface() {
        let surface = DrawingSurface::default();
        assert!(matches!(surface.encode(), Err(EncodeError::NoSurface)));
    }

    #[test]
    fn test_encode_rejects_open_stroke() {
        let mut surface = active_surface();
        surface.handle(&down(5.0, 5.0));
        assert!(matches!(surface.encode(), Err(EncodeError::StrokeInProgress)));
    }

    #[test]
    fn test_deactivate_then_encode_fails() {
        let mut surface = active_surface();
        surface.deactivate();
        assert!(!surface.is_active());
        assert!(matches!(surface.encode(), Err(EncodeError::NoSurface)));
    }

    #[test]
    fn test_reset_keeps_size() {
        let mut surface = active_surface();
        surface.handle(&down(0.0, 0.0));
        surface.handle(&mv(50.0, 50.0));
        surface.handle(&up(50.0, 50.0));
        surface.take_dirty();

        surface.reset();
        let raster = surface.raster().unwrap();
        let bounds = raster.bounds();
        assert_eq!(raster.width(), 200);
        assert!(raster.is_filled_with(Rgba8::white()));
        assert!(surface.strokes().is_empty());
        assert_eq!(surface.take_dirty(), Some(bounds));
    }

    #[test]
    fn test_dirty_accumulates_segments() {
        let mut surface = active_surface();
        surface.take_dirty();
        surface.handle(&down(10.0, 10.0));
        surface.handle(&mv(20.0, 10.0));
        surface.handle(&mv(20.0, 30.0));
        let dirty = surface.take_dirty().unwrap();
        assert!(dirty.contains(Point::new(10.0, 10.0)));
        assert!(dirty.contains(Point::new(20.0, 29.0)));
        assert!(surface.take_dirty().is_none());
    }
}
