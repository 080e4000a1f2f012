use mouse_cross::crosshair::headless::HeadlessPlatform;
use mouse_cross::crosshair::{
    CrosshairRenderer, MarkerShape, Monitor, OverlayHost, RenderSettings, ScreenRect,
};
use std::time::Duration;

fn full_hd() -> HeadlessPlatform {
    HeadlessPlatform::new(vec![
        Monitor::new(ScreenRect::new(0, 0, 1920, 1080), 1.0).primary()
    ])
}

fn alpha(platform: &HeadlessPlatform, x: u32, y: u32) -> u8 {
    platform.probe().pixel(x, y).expect("pixel inside surface")[3]
}

fn started(platform: &HeadlessPlatform, settings: RenderSettings) -> CrosshairRenderer {
    let mut renderer = CrosshairRenderer::new(Box::new(platform.clone()), settings);
    assert!(renderer.initialize());
    renderer.start_rendering();
    renderer
}

#[test]
fn crosshair_leaves_the_cursor_clear_and_reaches_every_edge() {
    let platform = full_hd();
    platform.set_cursor((500, 500));
    let renderer = started(&platform, RenderSettings::default());
    assert_eq!(renderer.frames_rendered(), 1);

    assert_eq!(alpha(&platform, 500, 500), 0);
    assert_eq!(alpha(&platform, 480, 500), 0);
    assert_eq!(alpha(&platform, 500, 530), 0);
    assert_ne!(alpha(&platform, 440, 500), 0);
    assert_ne!(alpha(&platform, 0, 500), 0);
    assert_ne!(alpha(&platform, 1918, 500), 0);
    assert_ne!(alpha(&platform, 500, 0), 0);
    assert_ne!(alpha(&platform, 500, 1078), 0);
    assert_eq!(alpha(&platform, 100, 100), 0);
}

#[test]
fn moving_the_cursor_erases_the_old_crosshair() {
    let platform = full_hd();
    platform.set_cursor((500, 500));
    let mut renderer = started(&platform, RenderSettings::default());
    assert_ne!(alpha(&platform, 200, 500), 0);

    assert!(renderer.update_mouse_position((900, 700)));
    assert_eq!(alpha(&platform, 200, 500), 0);
    assert_ne!(alpha(&platform, 200, 700), 0);
    assert!(!renderer.update_mouse_position((900, 700)));
    assert_eq!(renderer.frames_rendered(), 2);
}

#[test]
fn offset_past_every_edge_draws_nothing() {
    let platform = HeadlessPlatform::new(vec![Monitor::new(ScreenRect::new(0, 0, 200, 100), 1.0)]);
    platform.set_cursor((100, 50));
    let settings = RenderSettings {
        offset_from_cursor: 500,
        ..RenderSettings::default()
    };
    let renderer = started(&platform, settings);
    assert!(renderer.is_rendering());
    assert_eq!(platform.probe().covered_pixels(), 0);
}

#[test]
fn gaps_between_monitors_stay_transparent() {
    let platform = HeadlessPlatform::new(vec![
        Monitor::new(ScreenRect::new(0, 0, 800, 600), 1.0).primary(),
        Monitor::new(ScreenRect::new(800, 0, 800, 300), 1.0),
    ]);
    platform.set_cursor((400, 450));
    let renderer = started(&platform, RenderSettings::default());
    assert_eq!(renderer.bounds(), ScreenRect::new(0, 0, 1600, 600));

    assert_ne!(alpha(&platform, 700, 450), 0);
    assert_eq!(alpha(&platform, 1000, 450), 0);
    assert_eq!(alpha(&platform, 1599, 450), 0);
}

#[test]
fn every_marker_shape_renders() {
    for shape in [
        MarkerShape::Circle,
        MarkerShape::Arrow,
        MarkerShape::Cross,
        MarkerShape::Diamond,
    ] {
        let platform = full_hd();
        platform.set_cursor((960, 540));
        let with_markers = RenderSettings {
            marker_shape: shape,
            ..RenderSettings::default()
        };
        started(&platform, with_markers);
        let marked = platform.probe().pixels;

        let platform = full_hd();
        platform.set_cursor((960, 540));
        started(
            &platform,
            RenderSettings {
                show_markers: false,
                ..with_markers
            },
        );
        let plain = platform.probe().pixels;
        assert_ne!(marked, plain, "{shape:?} markers changed nothing");
    }
}

#[test]
fn host_thread_can_be_driven_from_another_thread() {
    let platform = full_hd();
    platform.set_cursor((300, 300));
    let mut renderer =
        CrosshairRenderer::new(Box::new(platform.clone()), RenderSettings::default());
    assert!(renderer.initialize());
    let mut host = OverlayHost::new(renderer, None);
    let handle = host.handle();

    let driver = std::thread::spawn(move || {
        assert!(handle.show());
        std::thread::sleep(Duration::from_millis(50));
        assert!(handle.hide());
        assert!(handle.shutdown());
    });
    host.run();
    driver.join().expect("driver thread");

    let probe = platform.probe();
    assert!(probe.presents >= 1);
    assert!(!probe.visible);
    assert!(probe.destroyed);
}
