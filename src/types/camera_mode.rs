//! Exposure mode reported in off-frame bytes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exposure mode dial position.
///
/// Derived from a single byte of the off-frame block. Values without a
/// mapping resolve to [`CameraMode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[repr(u8)]
pub enum CameraMode {
    #[default]
    Unknown = 0,
    /// Program
    P = 1,
    /// Aperture priority
    A = 2,
    /// Shutter priority
    S = 3,
    /// Manual
    M = 4,
    /// Intelligent auto
    IntelligentAuto = 9,
    /// Creative video
    CreativeVideo = 0x3c,
}

impl CameraMode {
    const TABLE: [CameraMode; 6] = [
        CameraMode::P,
        CameraMode::A,
        CameraMode::S,
        CameraMode::M,
        CameraMode::IntelligentAuto,
        CameraMode::CreativeVideo,
    ];

    /// Map a raw mode byte through the static table.
    pub fn from_raw(value: u8) -> Self {
        Self::TABLE.into_iter().find(|mode| *mode as u8 == value).unwrap_or(CameraMode::Unknown)
    }

    /// Aperture is fixed by the camera in shutter priority.
    pub fn can_change_aperture(self) -> bool {
        self != CameraMode::S
    }

    /// Shutter speed is fixed by the camera in aperture priority.
    pub fn can_change_shutter(self) -> bool {
        self != CameraMode::A
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraMode::Unknown => "Unknown",
            CameraMode::P => "P",
            CameraMode::A => "A",
            CameraMode::S => "S",
            CameraMode::M => "M",
            CameraMode::IntelligentAuto => "iA",
            CameraMode::CreativeVideo => "Creative Video",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_bytes_map_to_modes() {
        assert_eq!(CameraMode::from_raw(1), CameraMode::P);
        assert_eq!(CameraMode::from_raw(2), CameraMode::A);
        assert_eq!(CameraMode::from_raw(3), CameraMode::S);
        assert_eq!(CameraMode::from_raw(4), CameraMode::M);
        assert_eq!(CameraMode::from_raw(9), CameraMode::IntelligentAuto);
        assert_eq!(CameraMode::from_raw(0x3c), CameraMode::CreativeVideo);
    }

    #[test]
    fn unmapped_byte_is_unknown() {
        assert_eq!(CameraMode::from_raw(250), CameraMode::Unknown);
        assert_eq!(CameraMode::from_raw(0), CameraMode::Unknown);
    }

    #[test]
    fn priority_modes_lock_one_control() {
        assert!(!CameraMode::S.can_change_aperture());
        assert!(CameraMode::S.can_change_shutter());
        assert!(CameraMode::A.can_change_aperture());
        assert!(!CameraMode::A.can_change_shutter());
        assert!(CameraMode::M.can_change_aperture() && CameraMode::M.can_change_shutter());
    }

    proptest! {
        #[test]
        fn from_raw_never_panics_and_roundtrips_known(value in any::<u8>()) {
            let mode = CameraMode::from_raw(value);
            if mode != CameraMode::Unknown {
                prop_assert_eq!(mode as u8, value);
            }
        }
    }
}
