//! WebAssembly entry point and the browser drawing canvas.

use crate::remote::RestStore;
use inkboard_core::{
    InputOutcome, MAX_RASTER_EDGE, Mode, PointerEvent, PointerInput, PostComposer, Raster,
    RemoteStore, SurfaceOffset, SurfaceStyle,
};
use kurbo::{Point, Rect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Event, HtmlCanvasElement, ImageData,
    MouseEvent, TouchEvent,
};

type Listener = Closure<dyn FnMut(Event)>;

struct CanvasState {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    composer: PostComposer,
}

impl CanvasState {
    fn offset(&self) -> SurfaceOffset {
        let rect = self.canvas.get_bounding_client_rect();
        SurfaceOffset::new(rect.left(), rect.top())
    }

    fn handle(&mut self, input: PointerInput) {
        if let InputOutcome::Segment { .. } = self.composer.handle_pointer(&input) {
            self.blit_dirty();
        }
    }

    /// Match the backing store to the displayed size. Resizing clears it.
    fn fit_to_display(&self) -> (u32, u32) {
        let edge = MAX_RASTER_EDGE as i32;
        let width = self.canvas.client_width().clamp(1, edge) as u32;
        let height = self.canvas.client_height().clamp(1, edge) as u32;
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        (width, height)
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.composer.is_submitting() {
            log::warn!("Cannot switch to {:?} while a post is being submitted", mode);
            return;
        }
        let (width, height) = self.fit_to_display();
        self.composer.set_mode(mode, width, height);
        match mode {
            Mode::Drawing => self.blit_dirty(),
            Mode::Text => self
                .context
                .clear_rect(0.0, 0.0, width as f64, height as f64),
        }
    }

    /// Copy the changed part of the raster onto the canvas.
    fn blit_dirty(&mut self) {
        let Some(dirty) = self.composer.surface_mut().take_dirty() else {
            return;
        };
        let Some(raster) = self.composer.surface().raster() else {
            return;
        };
        if let Err(e) = put_region(&self.context, raster, dirty) {
            log::error!("Failed to draw canvas region: {:?}", e);
        }
    }
}

/// Pixel-aligned copy of `area` from the raster into the 2D context.
fn put_region(
    context: &CanvasRenderingContext2d,
    raster: &Raster,
    area: Rect,
) -> Result<(), JsValue> {
    let area = area.expand().intersect(raster.bounds());
    let (x0, y0) = (area.x0 as u32, area.y0 as u32);
    let (w, h) = (area.width() as u32, area.height() as u32);
    if w == 0 || h == 0 {
        return Ok(());
    }

    let stride = raster.width() as usize * 4;
    let bytes = raster.as_bytes();
    let mut region = Vec::with_capacity(w as usize * h as usize * 4);
    for row in y0..y0 + h {
        let start = row as usize * stride + x0 as usize * 4;
        region.extend_from_slice(&bytes[start..start + w as usize * 4]);
    }

    let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(&region), w, h)?;
    context.put_image_data(&image, x0 as f64, y0 as f64)
}

fn mouse_input(event: &Event, phase: fn(Point) -> PointerEvent) -> Option<PointerInput> {
    let event = event.dyn_ref::<MouseEvent>()?;
    let position = Point::new(event.offset_x() as f64, event.offset_y() as f64);
    Some(PointerInput::mouse(phase(position)))
}

fn touch_input(
    event: &Event,
    offset: SurfaceOffset,
    phase: fn(Point) -> PointerEvent,
) -> Option<PointerInput> {
    let event = event.dyn_ref::<TouchEvent>()?;
    // touchend has no active touches left; the lifted one is in changedTouches.
    let touch = event.touches().get(0).or_else(|| event.changed_touches().get(0))?;
    let position = Point::new(touch.client_x() as f64, touch.client_y() as f64);
    Some(PointerInput::touch(phase(position), offset))
}

/// A drawing surface bound to an `HtmlCanvasElement`.
#[wasm_bindgen]
pub struct DrawingCanvas {
    state: Rc<RefCell<CanvasState>>,
    store: Rc<RestStore>,
    listeners: Vec<(&'static str, Listener)>,
}

#[wasm_bindgen]
impl DrawingCanvas {
    /// Bind to the canvas with `canvas_id`, sized to its displayed size.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, backend_url: &str, anon_key: &str) -> Result<DrawingCanvas, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("No element with id {}", canvas_id)))?
            .dyn_into()?;
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("Canvas has no 2d context"))?
            .dyn_into()?;

        let state = Rc::new(RefCell::new(CanvasState {
            canvas,
            context,
            composer: PostComposer::new(SurfaceStyle::default()),
        }));
        state.borrow_mut().set_mode(Mode::Drawing);

        let mut drawing = DrawingCanvas {
            state,
            store: Rc::new(RestStore::new(backend_url, anon_key)),
            listeners: Vec::new(),
        };
        drawing.attach()?;
        log::info!("Drawing canvas {} attached", canvas_id);
        Ok(drawing)
    }

    /// Enter Drawing mode at the canvas's current displayed size, or leave
    /// it and discard the drawing.
    pub fn set_drawing(&self, drawing: bool) {
        let mode = if drawing { Mode::Drawing } else { Mode::Text };
        self.state.borrow_mut().set_mode(mode);
    }

    /// Flip between Text and Drawing. Returns true when now drawing.
    pub fn toggle_mode(&self) -> bool {
        let drawing = self.is_drawing();
        self.set_drawing(!drawing);
        self.is_drawing()
    }

    pub fn is_drawing(&self) -> bool {
        self.state.borrow().composer.mode() == Mode::Drawing
    }

    /// Author name for the next drawing; blank posts as Anonymous.
    pub fn set_author(&self, name: &str) {
        self.state.borrow_mut().composer.name = name.to_string();
    }

    /// Clear the drawing back to the background.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.composer.surface_mut().reset();
        state.blit_dirty();
    }

    pub fn is_submitting(&self) -> bool {
        self.state.borrow().composer.is_submitting()
    }

    /// Encode and post the drawing to `thread_id`. Resolves with the post id.
    /// The canvas is cleared only if the post was saved.
    pub fn submit(&self, thread_id: f64) -> js_sys::Promise {
        let state = self.state.clone();
        let store = self.store.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let pending = state
                .borrow_mut()
                .composer
                .begin_submit(Some(thread_id as i64))
                .map_err(|e| JsValue::from_str(&e.to_string()))?;

            let result = store.create_post(&pending.post).await;

            let mut state = state.borrow_mut();
            let outcome = state.composer.finish_submit(&pending, result);
            state.blit_dirty();
            outcome
                .map(|post| JsValue::from_f64(post.id as f64))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }
}

impl DrawingCanvas {
    fn attach(&mut self) -> Result<(), JsValue> {
        type Phase = fn(Point) -> PointerEvent;
        let down: Phase = |position| PointerEvent::Down { position };
        let moved: Phase = |position| PointerEvent::Move { position };
        let up: Phase = |position| PointerEvent::Up { position };
        let leave: Phase = |position| PointerEvent::Leave { position };

        for (name, phase) in [
            ("mousedown", down),
            ("mousemove", moved),
            ("mouseup", up),
            ("mouseout", leave),
        ] {
            let state = self.state.clone();
            let listener = Listener::new(move |event: Event| {
                if let Some(input) = mouse_input(&event, phase) {
                    state.borrow_mut().handle(input);
                }
            });
            self.listen(name, listener)?;
        }

        for (name, phase) in [
            ("touchstart", down),
            ("touchmove", moved),
            ("touchend", up),
            ("touchcancel", up),
        ] {
            let state = self.state.clone();
            let listener = Listener::new(move |event: Event| {
                // Keep the page from scrolling or zooming while drawing.
                event.prevent_default();
                let offset = state.borrow().offset();
                if let Some(input) = touch_input(&event, offset, phase) {
                    state.borrow_mut().handle(input);
                }
            });
            self.listen(name, listener)?;
        }
        Ok(())
    }

    fn listen(&mut self, name: &'static str, listener: Listener) -> Result<(), JsValue> {
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        self.state
            .borrow()
            .canvas
            .add_event_listener_with_callback_and_add_event_listener_options(
                name,
                listener.as_ref().unchecked_ref(),
                &options,
            )?;
        self.listeners.push((name, listener));
        Ok(())
    }
}

impl Drop for DrawingCanvas {
    fn drop(&mut self) {
        let state = self.state.borrow();
        for (name, listener) in self.listeners.drain(..) {
            let _ = state
                .canvas
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
    }
}

/// Initialize logging for the WASM build.
#[wasm_bindgen(start)]
pub fn run_wasm() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("Logger already initialized"));
    }

    log::info!("Starting Inkboard (WASM)");
}
