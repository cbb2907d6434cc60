use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::format::FontFamily;

/// Input the editor session reacts to.
///
/// Pointer coordinates are in frame space; the preview container sits at
/// the frame origin when the session is driven headless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Lay out and draw the current page in a `width` x `height` frame
    Render { width: f64, height: f64 },
    ToggleEditor,
    NextPage,
    PrevPage,
    GoToPage { page: usize },
    DoubleClick { x: f64, y: f64 },
    Press { x: f64, y: f64 },
    Motion { x: f64, y: f64 },
    Release,
    /// Replace the text of the active overlay
    Type { text: String },
    /// Commit the active overlay
    Commit,
    SetFont { family: FontFamily },
    SetSize { size: f32 },
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    SetColor { color: String },
    /// Write all edits to `output` and reopen the result
    Apply { output: PathBuf },
    Quit,
}

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Whether another event is available
    fn poll(&mut self) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<EditorEvent>;
}

/// Events replayed from a list
pub struct SimulatedEventSource {
    pub(crate) events: Vec<EditorEvent>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<EditorEvent>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    /// Parse a JSON array of events
    pub fn from_json(json: &str) -> Result<Self> {
        let events: Vec<EditorEvent> =
            serde_json::from_str(json).context("Invalid editor event script")?;
        Ok(Self::new(events))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event script {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.current_index
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<EditorEvent> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(event)
        } else {
            // Return a quit event if we've exhausted all events
            Ok(EditorEvent::Quit)
        }
    }
}
