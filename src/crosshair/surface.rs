use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::monitor::Monitor;
use crate::crosshair::render::{DirtyRect, FrameBuffer};
use anyhow::{anyhow, Result};

/// A borderless window covering the virtual desktop that the crosshair is
/// presented into.
pub trait OverlaySurface {
    fn set_always_on_top(&mut self) -> Result<()>;
    /// Lets every pointer and keyboard event pass through to the windows
    /// beneath.
    fn set_input_transparent(&mut self) -> Result<()>;
    /// Enables per-pixel alpha.
    fn set_translucent(&mut self) -> Result<()>;
    fn set_bounds(&mut self, bounds: ScreenRect) -> Result<()>;
    /// Whole-window alpha in `[0, 1]`.
    fn set_opacity(&mut self, opacity: f32);
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    /// Copies the premultiplied BGRA pixels inside `dirty` to the screen.
    fn present(&mut self, frame: &FrameBuffer, dirty: &[DirtyRect]) -> Result<()>;
    /// Drains pending window-system events.
    fn pump_events(&mut self) {}
    /// Releases the native window. Safe to call more than once.
    fn destroy(&mut self);
}

/// Desktop queries plus surface construction for one windowing system.
pub trait DesktopPlatform {
    fn name(&self) -> &'static str;
    fn cursor_position(&self) -> Option<Point>;
    fn monitors(&self) -> Vec<Monitor>;
    fn create_surface(&mut self, bounds: ScreenRect) -> Result<Box<dyn OverlaySurface>>;
}

/// Stand-in when no native adapter can be opened. Every surface request
/// fails, so the renderer reports itself unavailable.
#[derive(Debug)]
pub struct UnavailablePlatform {
    reason: String,
}

impl UnavailablePlatform {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl DesktopPlatform for UnavailablePlatform {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn cursor_position(&self) -> Option<Point> {
        None
    }

    fn monitors(&self) -> Vec<Monitor> {
        Vec::new()
    }

    fn create_surface(&mut self, _bounds: ScreenRect) -> Result<Box<dyn OverlaySurface>> {
        Err(anyhow!("no overlay surface available: {}", self.reason))
    }
}

/// The adapter for the windowing system this binary runs on.
pub fn native_platform() -> Box<dyn DesktopPlatform> {
    #[cfg(windows)]
    {
        Box::new(crate::crosshair::win32::Win32Platform::new())
    }

    #[cfg(target_os = "linux")]
    {
        match crate::crosshair::x11::X11Platform::open() {
            Ok(platform) => Box::new(platform),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "X11 display unavailable");
                Box::new(UnavailablePlatform::new(format!("{err:#}")))
            }
        }
    }

    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(UnavailablePlatform::new(
            "no overlay adapter for this operating system",
        ))
    }
}
