//! TypeScript Generation Tests
//!
//! Validates that the observable value types can be exported to TypeScript
//! when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_value_types_implement_specta_type() {
    use specta::Type;

    fn assert_type<T: Type>() {}

    assert_type::<lumix_remote::LabeledCode>();
    assert_type::<lumix_remote::CameraMode>();
    assert_type::<lumix_remote::RecState>();
    assert_type::<lumix_remote::SettingCategory>();
    assert_type::<lumix_remote::CameraState>();
    assert_type::<lumix_remote::CommandSpec>();
    assert_type::<lumix_remote::TelemetrySnapshot>();
    assert_type::<lumix_remote::SessionPhase>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    let _ = lumix_remote::SessionPhase::Idle;
}
