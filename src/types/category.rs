//! Settings categories decoded from off-frame bytes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exposure setting with a per-device decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SettingCategory {
    Iso,
    Shutter,
    Aperture,
}

/// Code used by the camera for automatic ISO.
pub const ISO_AUTO_CODE: i32 = 0xFFFF;
/// Code used by the camera for intelligent ISO.
pub const ISO_INTELLIGENT_CODE: i32 = 0xFFFE;

impl SettingCategory {
    pub const ALL: [SettingCategory; 3] =
        [SettingCategory::Iso, SettingCategory::Shutter, SettingCategory::Aperture];

    /// `cmd_type` token used by the menu descriptor and setsetting commands.
    pub fn cmd_type(self) -> &'static str {
        match self {
            SettingCategory::Iso => "iso",
            SettingCategory::Shutter => "shtrspeed",
            SettingCategory::Aperture => "focal",
        }
    }

    pub fn from_cmd_type(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.cmd_type() == token)
    }

    /// Convert a descriptor `cmd_value` to the raw code found in off-frame bytes.
    ///
    /// ISO values are decimal; shutter and aperture values are APEX fractions
    /// (`3072/256`) whose numerator is the raw code.
    pub fn code_from_value(self, value: &str) -> Option<i32> {
        let value = value.trim();
        match self {
            SettingCategory::Iso => match value {
                "auto" => Some(ISO_AUTO_CODE),
                "i_iso" => Some(ISO_INTELLIGENT_CODE),
                _ => value.parse().ok(),
            },
            SettingCategory::Shutter | SettingCategory::Aperture => {
                let numerator = value.split_once('/').map_or(value, |(n, _)| n);
                numerator.trim().parse().ok()
            }
        }
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingCategory::Iso => "ISO",
            SettingCategory::Shutter => "shutter",
            SettingCategory::Aperture => "aperture",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_type_tokens_roundtrip() {
        for category in SettingCategory::ALL {
            assert_eq!(SettingCategory::from_cmd_type(category.cmd_type()), Some(category));
        }
        assert_eq!(SettingCategory::from_cmd_type("whitebalance"), None);
    }

    #[test]
    fn value_conversion() {
        assert_eq!(SettingCategory::Iso.code_from_value("100"), Some(100));
        assert_eq!(SettingCategory::Iso.code_from_value("auto"), Some(ISO_AUTO_CODE));
        assert_eq!(SettingCategory::Iso.code_from_value("high"), None);
        assert_eq!(SettingCategory::Shutter.code_from_value("3072/256"), Some(3072));
        assert_eq!(SettingCategory::Shutter.code_from_value("-1024/256"), Some(-1024));
        assert_eq!(SettingCategory::Aperture.code_from_value("1024"), Some(1024));
        assert_eq!(SettingCategory::Aperture.code_from_value("F4"), None);
    }
}
