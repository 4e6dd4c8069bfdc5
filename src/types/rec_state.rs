//! Video recording state

use serde::{Deserialize, Serialize};

/// Recording state as last derived from a status poll.
///
/// Reset to `Unknown` after every record command so the next poll
/// re-derives the authoritative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum RecState {
    #[default]
    Unknown,
    Stopped,
    Started,
}

impl RecState {
    pub fn from_recording(recording: bool) -> Self {
        if recording { RecState::Started } else { RecState::Stopped }
    }
}
