//! Inkboard Core Library
//!
//! Platform-agnostic board records, the freehand drawing pipeline and the
//! remote store contract for the Inkboard discussion board.

pub mod board;
pub mod composer;
pub mod input;
pub mod payload;
pub mod raster;
pub mod refresh;
pub mod session;
pub mod state;
pub mod store;
pub mod stroke;
pub mod surface;
pub mod view;

pub use board::{ANONYMOUS, NewPost, NewThread, Post, SpecialThread, Thread, ThreadId, ValidationError};
pub use composer::{Mode, PendingPost, PostComposer, SubmitError};
pub use input::{InputSource, PointerEvent, PointerInput, SurfaceOffset};
pub use payload::{DrawingPayload, EncodeError, PNG_DATA_URL_PREFIX, PayloadError};
pub use raster::{Brush, MAX_RASTER_EDGE, Raster, Rgba8};
pub use refresh::{DEFAULT_REFRESH_INTERVAL_SECS, RefreshSchedule};
pub use session::{AuthEvent, Credentials, Identity, Session, SessionContext, User};
pub use state::{BoardError, BoardSnapshot, BoardState, PinnedThreads};
pub use store::{BoxFuture, MemoryIdentity, MemoryStore, RemoteStore, SortOrder, StoreError, StoreResult};
pub use stroke::Stroke;
pub use surface::{DrawingSurface, InputOutcome, StrokeState, SurfaceStyle};
pub use view::PostView;
