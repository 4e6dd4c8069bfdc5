//! Device status snapshot returned by `getstate`

use serde::{Deserialize, Serialize};

/// Last status reported by the camera.
///
/// Replaced wholesale on each poll that returns a different value; compared
/// structurally to suppress redundant notifications.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct CameraState {
    /// Battery level, e.g. `3/3`
    pub batt: Option<String>,
    /// `rec` or `play`
    pub cammode: Option<String>,
    /// Remaining still shots
    pub remaincapacity: Option<String>,
    pub sdcardstatus: Option<String>,
    pub sd_memory: Option<String>,
    /// Remaining video seconds
    pub video_remaincapacity: Option<String>,
    /// `on` while recording video
    pub rec: Option<String>,
    pub burst_interval_status: Option<String>,
    pub sd_access: Option<String>,
    pub rem_disp_typ: Option<String>,
    pub progress_disp_typ: Option<String>,
    pub operate: Option<String>,
    pub stop_motion_num: Option<String>,
    pub stop_motion: Option<String>,
    pub temperature: Option<String>,
    pub lens: Option<String>,
    pub add_location_data: Option<String>,
    pub interval_status: Option<String>,
    pub version: Option<String>,
}

impl CameraState {
    pub fn is_recording(&self) -> bool {
        self.rec.as_deref().is_some_and(|rec| rec.eq_ignore_ascii_case("on"))
    }

    pub fn is_rec_mode(&self) -> bool {
        self.cammode.as_deref() == Some("rec")
    }
}
