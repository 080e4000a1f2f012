use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not consulted. Debug output is limited to
/// this crate so the platform libraries stay quiet.
pub fn filter_directive(debug: bool) -> &'static str {
    if debug {
        "mouse_cross=debug,info"
    } else {
        "info"
    }
}

/// Initialise logging once per process. `RUST_LOG` is only honored when
/// `debug_logging` is enabled in the settings file; otherwise `info` is
/// forced. Later calls are ignored.
pub fn init(debug: bool) {
    let directive = filter_directive(debug);
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    } else {
        EnvFilter::new(directive)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .try_init();
}
