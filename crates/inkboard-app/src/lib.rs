//! Inkboard Application
//!
//! Hosted-backend client, configuration and platform shells: the native
//! command-line front end and the browser drawing canvas.

mod config;
mod remote;
mod replay;

pub use config::{AppConfig, CanvasConfig, ConfigError};
pub use remote::RestStore;
pub use replay::{RecordedEvent, Recording, ReplayError, ReplaySummary};

#[cfg(feature = "native")]
mod poll;
#[cfg(feature = "native")]
pub mod session_file;

#[cfg(feature = "native")]
pub use poll::{PollHandle, PollTask};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{DrawingCanvas, run_wasm};
