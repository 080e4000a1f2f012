use mouse_cross::crosshair::settings_store;
use mouse_cross::crosshair::settings_watch::watch_settings_file;
use mouse_cross::crosshair::host::forward_commands;
use mouse_cross::crosshair::{
    native_platform, CrosshairRenderer, CrosshairSettings, HostHandle, OverlayHost,
};
use mouse_cross::logging;

fn main() -> anyhow::Result<()> {
    let show_now = std::env::args().skip(1).any(|arg| arg == "--show");

    let settings_path = settings_store::resolve_settings_path()?;
    let (settings, load_error) = match settings_store::load_or_default(&settings_path) {
        Ok(settings) => (settings, None),
        Err(err) => (CrosshairSettings::default(), Some(err)),
    };
    logging::init(settings.debug_logging);
    if let Some(err) = load_error {
        tracing::warn!(
            path = %settings_path.display(),
            error = %format!("{err:#}"),
            "settings file unreadable; using defaults"
        );
    }

    let platform = native_platform();
    tracing::info!(platform = platform.name(), "starting mouse crosshair");
    let mut renderer = CrosshairRenderer::new(platform, settings.snapshot());
    if !renderer.initialize() {
        tracing::warn!("mouse crosshair feature unavailable on this desktop");
        return Ok(());
    }

    let mut host = OverlayHost::new(renderer, Some(settings_path.clone()));
    let handle = host.handle();

    let _watcher = match watch_settings_file(&settings_path, handle.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "settings changes will not be picked up");
            None
        }
    };

    if settings.activate_on_start || show_now {
        handle.show();
    }

    spawn_stdin_commands(handle);
    host.run();
    Ok(())
}

fn spawn_stdin_commands(handle: HostHandle) {
    std::thread::spawn(move || forward_commands(std::io::stdin().lock(), &handle));
}
