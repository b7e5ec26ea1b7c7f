//! Recorded pointer sessions.
//!
//! A recording is a JSON file of raw mouse/touch events plus the surface's
//! on-screen offset at the time. Replaying it drives the composer exactly as
//! live input would.

use inkboard_core::{
    InputOutcome, InputSource, MAX_RASTER_EDGE, Mode, PointerEvent, PointerInput, PostComposer,
    SurfaceOffset,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read recording {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid recording: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Recorded surface size {width}x{height} is outside 1-{max} px per edge", max = MAX_RASTER_EDGE)]
    SurfaceSize { width: u32, height: u32 },
}

/// One raw event as the platform reported it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub source: InputSource,
    pub event: PointerEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Displayed surface size; the configured canvas size when absent.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Bounding-rect origin of the surface, for touch coordinates.
    #[serde(default)]
    pub offset: SurfaceOffset,
    pub events: Vec<RecordedEvent>,
}

/// Counts from a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub strokes: usize,
    pub segments: usize,
    pub ignored: usize,
}

impl Recording {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Put the composer in Drawing mode at the recording's size and feed it
    /// every event. The composer is left untouched if the size is unusable.
    pub fn replay(
        &self,
        composer: &mut PostComposer,
        default_width: u32,
        default_height: u32,
    ) -> Result<ReplaySummary, ReplayError> {
        let width = self.width.unwrap_or(default_width);
        let height = self.height.unwrap_or(default_height);
        let edges = 1..=MAX_RASTER_EDGE;
        if !edges.contains(&width) || !edges.contains(&height) {
            return Err(ReplayError::SurfaceSize { width, height });
        }
        composer.set_mode(Mode::Drawing, width, height);

        let mut summary = ReplaySummary::default();
        for recorded in &self.events {
            let input = PointerInput::normalize(recorded.source, recorded.event, self.offset);
            match composer.handle_pointer(&input) {
                InputOutcome::Ignored => summary.ignored += 1,
                InputOutcome::Began(_) => summary.strokes += 1,
                InputOutcome::Segment { .. } => summary.segments += 1,
                InputOutcome::Ended { .. } => {}
            }
        }
        log::info!(
            "Replayed {} events: {} strokes, {} segments, {} ignored",
            self.events.len(),
            summary.strokes,
            summary.segments,
            summary.ignored
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_core::Rgba8;

    const TOUCH_RECORDING: &str = r#"{
        "width": 500,
        "height": 300,
        "offset": {"left": 20.0, "top": 200.0},
        "events": [
            {"source": "touch", "event": {"kind": "down", "position": {"x": 30.0, "y": 210.0}}},
            {"source": "touch", "event": {"kind": "move", "position": {"x": 120.0, "y": 300.0}}},
            {"source": "touch", "event": {"kind": "up", "position": {"x": 120.0, "y": 300.0}}},
            {"source": "mouse", "event": {"kind": "move", "position": {"x": 5.0, "y": 5.0}}}
        ]
    }"#;

    #[test]
    fn test_replay_touch_recording() {
        let recording = Recording::from_json(TOUCH_RECORDING).unwrap();
        let mut composer = PostComposer::default();
        let summary = recording.replay(&mut composer, 10, 10).unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                strokes: 1,
                segments: 1,
                ignored: 1
            }
        );
        let raster = composer.surface().raster().unwrap();
        assert_eq!((raster.width(), raster.height()), (500, 300));
        // (10,10)-(100,100) in canvas space.
        assert_eq!(raster.pixel(55, 55), Some(Rgba8::black()));
        assert_eq!(raster.pixel(5, 5), Some(Rgba8::white()));
    }

    #[test]
    fn test_default_size_used() {
        let recording = Recording::from_json(r#"{"events": []}"#).unwrap();
        let mut composer = PostComposer::default();
        recording.replay(&mut composer, 64, 32).unwrap();
        let raster = composer.surface().raster().unwrap();
        assert_eq!((raster.width(), raster.height()), (64, 32));
    }

    #[test]
    fn test_out_of_range_size_is_rejected() {
        let recording =
            Recording::from_json(r#"{"width": 4294967295, "height": 4294967295, "events": []}"#)
                .unwrap();
        let mut composer = PostComposer::default();
        assert!(matches!(
            recording.replay(&mut composer, 10, 10),
            Err(ReplayError::SurfaceSize {
                width: u32::MAX,
                height: u32::MAX
            })
        ));
        assert_eq!(composer.mode(), Mode::Text);
        assert!(composer.surface().raster().is_none());

        let zero = Recording::from_json(r#"{"width": 0, "events": []}"#).unwrap();
        assert!(matches!(
            zero.replay(&mut composer, 10, 10),
            Err(ReplayError::SurfaceSize { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(Recording::load(&missing), Err(ReplayError::Read { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{\"events\": 3}").unwrap();
        assert!(matches!(Recording::load(&bad), Err(ReplayError::Parse(_))));
    }
}
