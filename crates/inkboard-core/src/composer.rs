//! Reply composer: name field, text field and drawing surface.
//!
//! Exactly one of the text field and the drawing surface is live at a time,
//! selected by [`Mode`]. Submitting produces a [`NewPost`] from whichever is
//! live and never reads the other.

use crate::board::{NewPost, Post, ThreadId, ValidationError};
use crate::input::PointerInput;
use crate::payload::EncodeError;
use crate::store::{RemoteStore, StoreError};
use crate::surface::{DrawingSurface, InputOutcome, SurfaceStyle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which input produces the next post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Text,
    Drawing,
}

/// Why a submission did not go through.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Could not encode drawing: {0}")]
    Encode(#[from] EncodeError),
    #[error("Could not save post: {0}")]
    Remote(#[from] StoreError),
}

/// A post that passed validation and is waiting for the remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPost {
    pub post: NewPost,
    pub mode: Mode,
}

/// Composer state for one thread view.
#[derive(Debug, Clone)]
pub struct PostComposer {
    mode: Mode,
    /// Optional author name; kept across submissions.
    pub name: String,
    text: String,
    surface: DrawingSurface,
    in_flight: bool,
}

impl PostComposer {
    pub fn new(style: SurfaceStyle) -> Self {
        Self {
            mode: Mode::Text,
            name: String::new(),
            text: String::new(),
            surface: DrawingSurface::new(style),
            in_flight: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes. Entering Drawing mode sizes the raster to the displayed
    /// size and blanks it; leaving it discards the drawing.
    pub fn set_mode(&mut self, mode: Mode, display_width: u32, display_height: u32) {
        if self.in_flight {
            log::warn!("Mode change ignored while a post is being submitted");
            return;
        }
        match mode {
            Mode::Drawing => self.surface.activate(display_width, display_height),
            Mode::Text => self.surface.deactivate(),
        }
        if mode != self.mode {
            log::info!("Composer mode: {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Flip between Text and Drawing.
    pub fn toggle_mode(&mut self, display_width: u32, display_height: u32) {
        let next = match self.mode {
            Mode::Text => Mode::Drawing,
            Mode::Drawing => Mode::Text,
        };
        self.set_mode(next, display_width, display_height);
    }

    /// Edit the reply text. Ignored outside Text mode.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.mode == Mode::Text {
            self.text = text.into();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Route pointer input to the surface. Ignored outside Drawing mode.
    pub fn handle_pointer(&mut self, input: &PointerInput) -> InputOutcome {
        match self.mode {
            Mode::Drawing => self.surface.handle(input),
            Mode::Text => InputOutcome::Ignored,
        }
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut DrawingSurface {
        &mut self.surface
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Validate and build the outbound post. In Drawing mode the raster is
    /// encoded here, synchronously, and the surface is locked against new
    /// strokes until [`PostComposer::finish_submit`] or
    /// [`PostComposer::cancel_submit`].
    ///
    /// On error nothing is cleared.
    pub fn begin_submit(&mut self, thread: Option<ThreadId>) -> Result<PendingPost, SubmitError> {
        if self.in_flight {
            return Err(ValidationError::SubmitInFlight.into());
        }
        let thread_id = thread.ok_or(ValidationError::NoThreadSelected)?;

        let post = match self.mode {
            Mode::Text => {
                if self.text.trim().is_empty() {
                    return Err(ValidationError::EmptyPost.into());
                }
                NewPost::text(thread_id, self.text.clone(), &self.name)
            }
            Mode::Drawing => {
                let surface = &self.surface;
                // A tap records a stroke but renders nothing.
                if surface.is_active()
                    && !surface.is_stroking()
                    && surface.segments_rendered() == 0
                {
                    return Err(ValidationError::EmptyDrawing.into());
                }
                let payload = self.surface.encode().inspect_err(|e| {
                    log::error!("Drawing encode failed, keeping surface: {}", e);
                })?;
                self.surface.lock();
                NewPost::drawing(thread_id, payload.into_string(), &self.name)
            }
        };

        self.in_flight = true;
        Ok(PendingPost {
            post,
            mode: self.mode,
        })
    }

    /// Apply the remote outcome. Fields are cleared only on success.
    pub fn finish_submit(
        &mut self,
        pending: &PendingPost,
        result: Result<Post, StoreError>,
    ) -> Result<Post, SubmitError> {
        self.in_flight = false;
        self.surface.unlock();

        match result {
            Ok(post) => {
                match pending.mode {
                    Mode::Text => self.text.clear(),
                    Mode::Drawing => self.surface.reset(),
                }
                log::info!("Post {} created in thread {}", post.id, post.thread_id);
                Ok(post)
            }
            Err(e) => {
                log::error!("Error adding post: {}", e);
                Err(e.into())
            }
        }
    }

    /// Abandon an in-flight submission locally and allow drawing again.
    pub fn cancel_submit(&mut self) {
        if self.in_flight {
            log::info!("Submission cancelled");
        }
        self.in_flight = false;
        self.surface.unlock();
    }

    /// Full submission: validate, encode, send, then apply the outcome.
    pub async fn submit<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        thread: Option<ThreadId>,
    ) -> Result<Post, SubmitError> {
        let pending = self.begin_submit(thread)?;
        let result = store.create_post(&pending.post).await;
        self.finish_submit(&pending, result)
    }
}

impl Default for PostComposer {
    fn default() -> Self {
        Self::new(SurfaceStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{ANONYMOUS, NewThread};
    use crate::input::{PointerEvent, SurfaceOffset};
    use crate::payload::{PNG_DATA_URL_PREFIX, decode_drawing};
    use crate::raster::Rgba8;
    use crate::store::{MemoryStore, SortOrder};
    use crate::surface::StrokeState;
    use kurbo::Point;
    use pollster::block_on;

    fn store_with_thread() -> (MemoryStore, ThreadId) {
        let store = MemoryStore::new();
        let thread = block_on(store.create_thread(&NewThread::validated("Rounds").unwrap())).unwrap();
        (store, thread.id)
    }

    fn touch(event: PointerEvent, offset: SurfaceOffset) -> PointerInput {
        PointerInput::touch(event, offset)
    }

    fn mouse(event: PointerEvent) -> PointerInput {
        PointerInput::mouse(event)
    }

    fn scribble(composer: &mut PostComposer) {
        composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(2.0, 2.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Move { position: Point::new(20.0, 20.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Up { position: Point::new(20.0, 20.0) }));
    }

    #[test]
    fn test_touch_drawing_scenario() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.name = "Alice".to_string();
        composer.set_mode(Mode::Drawing, 500, 300);

        let offset = SurfaceOffset::new(20.0, 200.0);
        let client = |x: f64, y: f64| Point::new(x + offset.left, y + offset.top);
        composer.handle_pointer(&touch(PointerEvent::Down { position: client(10.0, 10.0) }, offset));
        composer.handle_pointer(&touch(PointerEvent::Move { position: client(100.0, 100.0) }, offset));
        composer.handle_pointer(&touch(PointerEvent::Up { position: client(100.0, 100.0) }, offset));

        let post = block_on(composer.submit(&store, Some(thread_id))).unwrap();
        assert!(post.is_drawing);
        assert_eq!(post.author_name, "Alice");
        assert!(post.content.starts_with(PNG_DATA_URL_PREFIX));
        assert!(post.content.len() > PNG_DATA_URL_PREFIX.len());

        let raster = decode_drawing(&post.content).unwrap();
        assert_eq!((raster.width(), raster.height()), (500, 300));
        assert_eq!(raster.pixel(55, 55), Some(Rgba8::black()));

        // Surface cleared after success.
        assert!(composer.surface().raster().unwrap().is_filled_with(Rgba8::white()));
    }

    #[test]
    fn test_blank_name_text_post_is_anonymous() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_text("hello");

        let post = block_on(composer.submit(&store, Some(thread_id))).unwrap();
        assert_eq!(post.author_name, ANONYMOUS);
        assert_eq!(post.content, "hello");
        assert!(!post.is_drawing);
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn test_text_submit_never_touches_surface() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_text("words");
        // No raster exists in Text mode, so the submit cannot read one.
        assert!(!composer.surface().is_active());
        let post = block_on(composer.submit(&store, Some(thread_id))).unwrap();
        assert_eq!(post.content, "words");
    }

    #[test]
    fn test_drawing_submit_ignores_text_field() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_text("draft that must not be sent");
        composer.set_mode(Mode::Drawing, 40, 40);
        composer.set_text("typed while drawing");
        scribble(&mut composer);

        let post = block_on(composer.submit(&store, Some(thread_id))).unwrap();
        assert!(post.is_drawing);
        assert!(post.content.starts_with(PNG_DATA_URL_PREFIX));
        // The text field is neither sent nor cleared.
        assert_eq!(composer.text(), "draft that must not be sent");
    }

    #[test]
    fn test_pointer_ignored_in_text_mode() {
        let mut composer = PostComposer::default();
        let outcome = composer.handle_pointer(&mouse(PointerEvent::Down {
            position: Point::new(1.0, 1.0),
        }));
        assert_eq!(outcome, InputOutcome::Ignored);
    }

    #[test]
    fn test_empty_text_is_rejected_without_call() {
        let (store, thread_id) = store_with_thread();
        let calls = store.call_count();
        let mut composer = PostComposer::default();
        composer.set_text("   ");

        let result = block_on(composer.submit(&store, Some(thread_id)));
        assert!(matches!(result, Err(SubmitError::Validation(ValidationError::EmptyPost))));
        assert_eq!(store.call_count(), calls);
    }

    #[test]
    fn test_no_thread_selected() {
        let store = MemoryStore::new();
        let mut composer = PostComposer::default();
        composer.set_text("hi");
        let result = block_on(composer.submit(&store, None));
        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::NoThreadSelected))
        ));
        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn test_remote_failure_keeps_fields() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_text("keep me");
        store.set_offline(true);

        let result = block_on(composer.submit(&store, Some(thread_id)));
        assert!(matches!(result, Err(SubmitError::Remote(StoreError::Network(_)))));
        assert_eq!(composer.text(), "keep me");
        assert!(!composer.is_submitting());
    }

    #[test]
    fn test_remote_failure_keeps_drawing() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_mode(Mode::Drawing, 100, 100);
        composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(0.0, 0.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Move { position: Point::new(90.0, 90.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Up { position: Point::new(90.0, 90.0) }));
        store.set_offline(true);

        assert!(block_on(composer.submit(&store, Some(thread_id))).is_err());
        assert_eq!(composer.surface().strokes().len(), 1);
        assert!(!composer.surface().is_locked());

        store.set_offline(false);
        let posts_before = block_on(store.list_posts(thread_id, SortOrder::Ascending)).unwrap();
        assert!(posts_before.is_empty());
    }

    #[test]
    fn test_encode_error_keeps_surface() {
        let mut composer = PostComposer::default();
        composer.set_mode(Mode::Drawing, 50, 50);
        composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(5.0, 5.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Move { position: Point::new(25.0, 25.0) }));

        let result = composer.begin_submit(Some(1));
        assert!(matches!(result, Err(SubmitError::Encode(EncodeError::StrokeInProgress))));
        assert!(composer.surface().is_stroking());
        assert_eq!(composer.surface().segments_rendered(), 1);
        assert!(!composer.is_submitting());
    }

    #[test]
    fn test_no_strokes_while_in_flight() {
        let mut composer = PostComposer::default();
        composer.set_mode(Mode::Drawing, 50, 50);
        scribble(&mut composer);
        let pending = composer.begin_submit(Some(1)).unwrap();
        assert!(composer.is_submitting());

        let outcome = composer.handle_pointer(&mouse(PointerEvent::Down {
            position: Point::new(5.0, 5.0),
        }));
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(*composer.surface().state(), StrokeState::Idle);
        assert!(matches!(
            composer.begin_submit(Some(1)),
            Err(SubmitError::Validation(ValidationError::SubmitInFlight))
        ));

        composer.cancel_submit();
        assert!(matches!(
            composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(5.0, 5.0) })),
            InputOutcome::Began(_)
        ));
        assert!(pending.post.is_drawing);
    }

    #[test]
    fn test_blank_drawing_is_rejected() {
        let mut composer = PostComposer::default();
        composer.set_mode(Mode::Drawing, 50, 50);
        assert!(matches!(
            composer.begin_submit(Some(1)),
            Err(SubmitError::Validation(ValidationError::EmptyDrawing))
        ));
        assert!(!composer.surface().is_locked());
    }

    #[test]
    fn test_tap_only_drawing_is_rejected() {
        let (store, thread_id) = store_with_thread();
        let mut composer = PostComposer::default();
        composer.set_mode(Mode::Drawing, 50, 50);
        composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(5.0, 5.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Up { position: Point::new(5.0, 5.0) }));
        assert_eq!(composer.surface().strokes().len(), 1);

        let calls = store.call_count();
        let result = block_on(composer.submit(&store, Some(thread_id)));
        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::EmptyDrawing))
        ));
        assert_eq!(store.call_count(), calls);
        assert!(!composer.surface().is_locked());
        assert!(!composer.is_submitting());
    }

    #[test]
    fn test_toggle_back_discards_drawing() {
        let mut composer = PostComposer::default();
        composer.toggle_mode(60, 60);
        assert_eq!(composer.mode(), Mode::Drawing);
        composer.handle_pointer(&mouse(PointerEvent::Down { position: Point::new(0.0, 0.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Move { position: Point::new(30.0, 30.0) }));
        composer.handle_pointer(&mouse(PointerEvent::Up { position: Point::new(30.0, 30.0) }));

        composer.toggle_mode(60, 60);
        assert_eq!(composer.mode(), Mode::Text);
        assert!(!composer.surface().is_active());

        composer.toggle_mode(60, 60);
        let raster = composer.surface().raster().unwrap();
        assert!(raster.is_filled_with(Rgba8::white()));
        assert!(composer.surface().strokes().is_empty());
    }
}
