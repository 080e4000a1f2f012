pub mod geometry;
pub mod headless;
pub mod host;
pub mod messages;
pub mod model;
pub mod monitor;
pub mod render;
pub mod renderer;
pub mod settings;
pub mod settings_store;
pub mod settings_watch;
pub mod state;
pub mod surface;
pub mod timer;

#[cfg(windows)]
mod win32;
#[cfg(target_os = "linux")]
mod x11;

pub use host::{HostHandle, OverlayHost};
pub use model::{Color, MarkerShape, ScreenRect};
pub use monitor::{DesktopLayout, Monitor};
pub use renderer::CrosshairRenderer;
pub use settings::{CrosshairSettings, RenderSettings};
pub use surface::{native_platform, DesktopPlatform, OverlaySurface};
