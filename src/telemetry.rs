//! Exposure telemetry decoding from off-frame bytes.
//!
//! Every off-frame block carries the current exposure settings at fixed
//! offsets. The raw mode byte maps through a static table; ISO, shutter and
//! aperture codes are only meaningful through the per-device
//! [`CapabilityModel`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::CapabilityModel;
use crate::liveview::MIN_METADATA_LEN;
use crate::types::{CameraEvent, CameraMode, LabeledCode, SettingCategory, TelemetrySnapshot};
use crate::{CameraError, Result};

/// Encoding of one off-frame field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    U8,
    U16Be,
    I16Be,
}

impl FieldKind {
    pub fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16Be | FieldKind::I16Be => 2,
        }
    }
}

/// Position and encoding of one field inside an off-frame block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocation {
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldLocation {
    pub const fn new(offset: usize, kind: FieldKind) -> Self {
        Self { offset, kind }
    }

    /// One past the last byte of the field; `None` if that overflows.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.kind.width())
    }

    pub fn read(&self, block: &[u8]) -> Option<i32> {
        let bytes = block.get(self.offset..self.end()?)?;
        Some(match self.kind {
            FieldKind::U8 => i32::from(bytes[0]),
            FieldKind::U16Be => i32::from(u16::from_be_bytes([bytes[0], bytes[1]])),
            FieldKind::I16Be => i32::from(i16::from_be_bytes([bytes[0], bytes[1]])),
        })
    }
}

/// Field offsets inside an off-frame block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffFrameLayout {
    pub mode: FieldLocation,
    pub iso: FieldLocation,
    pub shutter: FieldLocation,
    pub aperture: FieldLocation,
}

impl Default for OffFrameLayout {
    fn default() -> Self {
        Self {
            mode: FieldLocation::new(92, FieldKind::U8),
            iso: FieldLocation::new(127, FieldKind::U16Be),
            shutter: FieldLocation::new(68, FieldKind::I16Be),
            aperture: FieldLocation::new(56, FieldKind::U16Be),
        }
    }
}

impl OffFrameLayout {
    /// Every field must lie inside the shortest block that is decoded.
    pub fn validate(&self) -> Result<()> {
        for (name, field) in self.fields() {
            match field.end() {
                Some(end) if end <= MIN_METADATA_LEN => {}
                Some(end) => {
                    return Err(CameraError::config(format!(
                        "off-frame field '{name}' ends at byte {end} beyond the {MIN_METADATA_LEN}-byte block"
                    )));
                }
                None => {
                    return Err(CameraError::config(format!(
                        "off-frame field '{name}' offset {} is out of range",
                        field.offset
                    )));
                }
            }
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, FieldLocation); 4] {
        [("mode", self.mode), ("iso", self.iso), ("shutter", self.shutter), ("aperture", self.aperture)]
    }

    fn location(&self, category: SettingCategory) -> FieldLocation {
        match category {
            SettingCategory::Iso => self.iso,
            SettingCategory::Shutter => self.shutter,
            SettingCategory::Aperture => self.aperture,
        }
    }
}

/// Decodes off-frame blocks and suppresses unchanged values.
///
/// Holds the last reported value of each field, so one decoder belongs to
/// exactly one session.
#[derive(Debug, Clone)]
pub struct TelemetryDecoder {
    layout: OffFrameLayout,
    current: TelemetrySnapshot,
}

impl Default for TelemetryDecoder {
    fn default() -> Self {
        Self::new(OffFrameLayout::default())
    }
}

impl TelemetryDecoder {
    pub fn new(layout: OffFrameLayout) -> Self {
        Self { layout, current: TelemetrySnapshot::default() }
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.current
    }

    /// Forget the last reported values.
    pub fn reset(&mut self) {
        self.current = TelemetrySnapshot::default();
    }

    /// Decode one block into change events.
    ///
    /// Blocks shorter than [`MIN_METADATA_LEN`] are ignored. Without a model
    /// only the camera mode is decoded. A failed lookup yields
    /// [`LabeledCode::error`] for that field alone.
    pub fn decode(&mut self, block: &[u8], model: Option<&CapabilityModel>) -> Vec<CameraEvent> {
        let mut events = Vec::new();
        if block.len() < MIN_METADATA_LEN {
            return events;
        }

        if let Some(model) = model {
            for category in SettingCategory::ALL {
                let lookup = self.lookup(block, category, model);
                let slot = match category {
                    SettingCategory::Iso => &mut self.current.iso,
                    SettingCategory::Shutter => &mut self.current.shutter,
                    SettingCategory::Aperture => &mut self.current.aperture,
                };
                let value = match lookup {
                    Ok(value) => value,
                    // Reported once, when the field switches to the error value
                    Err(_) if slot.as_ref().is_some_and(LabeledCode::is_error) => continue,
                    Err(err) => {
                        warn!(%category, error = %err, model = ?model.model_name(), "Cannot decode off-frame value, reporting error value");
                        LabeledCode::error()
                    }
                };
                if slot.as_ref() == Some(&value) {
                    continue;
                }
                *slot = Some(value.clone());
                events.push(match category {
                    SettingCategory::Iso => CameraEvent::IsoChanged(value),
                    SettingCategory::Shutter => CameraEvent::ShutterChanged(value),
                    SettingCategory::Aperture => CameraEvent::ApertureChanged(value),
                });
            }
        }

        let mode = self.layout.mode.read(block).map_or(CameraMode::Unknown, |raw| {
            u8::try_from(raw).map_or(CameraMode::Unknown, CameraMode::from_raw)
        });
        if mode != self.current.mode {
            debug!(%mode, "Camera mode changed");
            self.current.mode = mode;
            self.current.can_change_aperture = mode.can_change_aperture();
            self.current.can_change_shutter = mode.can_change_shutter();
            events.push(CameraEvent::CameraModeChanged {
                mode,
                can_change_aperture: self.current.can_change_aperture,
                can_change_shutter: self.current.can_change_shutter,
            });
        }

        events
    }

    fn lookup(
        &self,
        block: &[u8],
        category: SettingCategory,
        model: &CapabilityModel,
    ) -> Result<LabeledCode> {
        let location = self.layout.location(category);
        let code = location.read(block).ok_or_else(|| {
            CameraError::config(format!(
                "off-frame field '{category}' at offset {} lies outside the {}-byte block",
                location.offset,
                block.len()
            ))
        })?;
        model.decode(category, code)
    }
}
