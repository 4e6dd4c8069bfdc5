//! Change notifications delivered to the session consumer

use std::sync::Arc;

use super::{CameraMode, CameraState, LabeledCode, RecState};
use crate::liveview::JpegFrame;

/// Ordered notification of one observable change.
///
/// Emitted only when the observed value differs from the last one reported.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// A complete live-view JPEG arrived
    LiveViewFrame(JpegFrame),
    IsoChanged(LabeledCode),
    ShutterChanged(LabeledCode),
    ApertureChanged(LabeledCode),
    /// Mode changed; adjustability is recomputed alongside
    CameraModeChanged { mode: CameraMode, can_change_aperture: bool, can_change_shutter: bool },
    StateChanged(Arc<CameraState>),
    RecStateChanged(RecState),
    ConnectionChanged(bool),
    /// Session ended; `still_available` reports whether the stop-stream call succeeded
    Disconnected { still_available: bool },
}

/// Current exposure values as last decoded from off-frame bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct TelemetrySnapshot {
    pub iso: Option<LabeledCode>,
    pub shutter: Option<LabeledCode>,
    pub aperture: Option<LabeledCode>,
    pub mode: CameraMode,
    pub can_change_aperture: bool,
    pub can_change_shutter: bool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            iso: None,
            shutter: None,
            aperture: None,
            mode: CameraMode::Unknown,
            can_change_aperture: true,
            can_change_shutter: true,
        }
    }
}
