//! Core value types shared by the capability model, telemetry decoder and session.
//!
//! - [`LabeledCode`] is one decoded setting value (text plus raw code)
//! - [`SettingCategory`] names the settings with per-device decode tables
//! - [`CameraMode`] and [`RecState`] are the closed enumerations reported to observers
//! - [`CameraState`] is the status snapshot replaced on every changed poll
//! - [`CommandSpec`] carries the wire tokens of one control command
//! - [`CameraEvent`] is the ordered change notification delivered to the consumer

mod camera_mode;
mod category;
mod command;
mod event;
mod labeled_code;
mod rec_state;
mod state;

pub use camera_mode::CameraMode;
pub use category::{ISO_AUTO_CODE, ISO_INTELLIGENT_CODE, SettingCategory};
pub use command::CommandSpec;
pub use event::{CameraEvent, TelemetrySnapshot};
pub use labeled_code::LabeledCode;
pub use rec_state::RecState;
pub use state::CameraState;
