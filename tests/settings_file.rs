use mouse_cross::crosshair::headless::HeadlessPlatform;
use mouse_cross::crosshair::messages::HostMessage;
use mouse_cross::crosshair::settings_store::{load_or_default, save_to_path};
use mouse_cross::crosshair::{
    Color, CrosshairRenderer, CrosshairSettings, MarkerShape, Monitor, OverlayHost,
    RenderSettings, ScreenRect,
};
use tempfile::tempdir;

#[test]
fn legacy_setting_names_are_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r##"{
            "color": "#FF8000",
            "show_arrows": false,
            "circle_spacing_increase": 3.0,
            "direction_shape": "raute",
            "inverted_mode": true,
            "hotkey": "ctrl+alt+m"
        }"##,
    )
    .unwrap();

    let settings = load_or_default(&path).unwrap();
    assert_eq!(settings.color, Color::rgb(255, 128, 0));
    assert!(!settings.show_markers);
    assert_eq!(settings.marker_spacing_growth, 3.0);
    assert_eq!(settings.marker_shape, MarkerShape::Diamond);
    assert!(settings.inverted);
}

#[test]
fn saved_file_uses_current_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    save_to_path(&path, &CrosshairSettings::default()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["color"], "#ffffff");
    assert_eq!(json["marker_shape"], "circle");
    assert_eq!(json["version"], 1);
    assert!(json.get("show_arrows").is_none());
}

#[test]
fn reload_message_applies_the_file_to_a_running_overlay() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    save_to_path(
        &path,
        &CrosshairSettings {
            offset_from_cursor: 120,
            opacity: 0.4,
            ..CrosshairSettings::default()
        },
    )
    .unwrap();

    let platform = HeadlessPlatform::new(vec![Monitor::new(ScreenRect::new(0, 0, 800, 600), 1.0)]);
    platform.set_cursor((400, 300));
    let mut renderer = CrosshairRenderer::new(Box::new(platform.clone()), RenderSettings::default());
    assert!(renderer.initialize());
    let mut host = OverlayHost::new(renderer, Some(path));

    assert!(host.handle_message(HostMessage::Show).is_continue());
    assert_ne!(platform.probe().pixel(330, 300).unwrap()[3], 0);

    assert!(host.handle_message(HostMessage::ReloadSettings).is_continue());
    assert_eq!(host.renderer().settings().offset_from_cursor, 120);
    assert_eq!(platform.probe().opacity, 0.4);
    assert_eq!(platform.probe().pixel(330, 300).unwrap()[3], 0);
    assert_ne!(platform.probe().pixel(270, 300).unwrap()[3], 0);
}
