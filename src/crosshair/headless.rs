//! In-memory platform used by tests and benchmarks. The cursor and monitor
//! layout are scripted; the surface records what it was asked to do.

use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::monitor::Monitor;
use crate::crosshair::render::{DirtyRect, FrameBuffer};
use crate::crosshair::surface::{DesktopPlatform, OverlaySurface};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// What the headless surface has been told so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceProbe {
    pub surfaces_created: usize,
    pub always_on_top: bool,
    pub input_transparent: bool,
    pub translucent: bool,
    pub visible: bool,
    pub destroyed: bool,
    pub bounds: ScreenRect,
    pub opacity: f32,
    pub presents: usize,
    pub last_dirty: Vec<DirtyRect>,
    /// Premultiplied BGRA as of the last present.
    pub pixels: Vec<u8>,
    pub pixel_size: (u32, u32),
}

impl SurfaceProbe {
    /// BGRA of a pixel in surface coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.pixel_size.0 || y >= self.pixel_size.1 {
            return None;
        }
        let idx = ((y as usize) * (self.pixel_size.0 as usize) + x as usize) * 4;
        let px = self.pixels.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn covered_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[3] != 0).count()
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    cursor: Option<Point>,
    monitors: Vec<Monitor>,
    refuse_surfaces: bool,
    probe: SurfaceProbe,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessPlatform {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        let platform = Self::default();
        platform.set_monitors(monitors);
        platform
    }

    pub fn set_cursor(&self, point: Point) {
        self.with_state(|state| state.cursor = Some(point));
    }

    pub fn set_monitors(&self, monitors: Vec<Monitor>) {
        self.with_state(|state| state.monitors = monitors);
    }

    /// Makes every later `create_surface` fail.
    pub fn refuse_surfaces(&self, refuse: bool) {
        self.with_state(|state| state.refuse_surfaces = refuse);
    }

    pub fn probe(&self) -> SurfaceProbe {
        self.with_state(|state| state.probe.clone())
            .unwrap_or_default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut HeadlessState) -> R) -> Option<R> {
        match self.state.lock() {
            Ok(mut state) => Some(f(&mut state)),
            Err(err) => {
                tracing::error!(?err, "headless platform state poisoned");
                None
            }
        }
    }
}

impl DesktopPlatform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn cursor_position(&self) -> Option<Point> {
        self.with_state(|state| state.cursor).flatten()
    }

    fn monitors(&self) -> Vec<Monitor> {
        self.with_state(|state| state.monitors.clone())
            .unwrap_or_default()
    }

    fn create_surface(&mut self, bounds: ScreenRect) -> Result<Box<dyn OverlaySurface>> {
        let refused = self
            .with_state(|state| state.refuse_surfaces)
            .unwrap_or(true);
        if refused {
            return Err(anyhow!("headless surface creation refused"));
        }
        self.with_state(|state| {
            state.probe = SurfaceProbe {
                surfaces_created: state.probe.surfaces_created + 1,
                bounds,
                opacity: 1.0,
                ..SurfaceProbe::default()
            };
        });
        Ok(Box::new(HeadlessSurface {
            platform: self.clone(),
        }))
    }
}

struct HeadlessSurface {
    platform: HeadlessPlatform,
}

impl HeadlessSurface {
    fn update(&self, f: impl FnOnce(&mut SurfaceProbe)) {
        self.platform.with_state(|state| f(&mut state.probe));
    }

    fn ensure_alive(&self) -> Result<()> {
        let destroyed = self
            .platform
            .with_state(|state| state.probe.destroyed)
            .unwrap_or(true);
        if destroyed {
            return Err(anyhow!("headless surface already destroyed"));
        }
        Ok(())
    }
}

impl OverlaySurface for HeadlessSurface {
    fn set_always_on_top(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.update(|probe| probe.always_on_top = true);
        Ok(())
    }

    fn set_input_transparent(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.update(|probe| probe.input_transparent = true);
        Ok(())
    }

    fn set_translucent(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.update(|probe| probe.translucent = true);
        Ok(())
    }

    fn set_bounds(&mut self, bounds: ScreenRect) -> Result<()> {
        self.ensure_alive()?;
        self.update(|probe| probe.bounds = bounds);
        Ok(())
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.update(|probe| probe.opacity = opacity.clamp(0.0, 1.0));
    }

    fn show(&mut self) {
        self.update(|probe| probe.visible = !probe.destroyed);
    }

    fn hide(&mut self) {
        self.update(|probe| probe.visible = false);
    }

    fn is_visible(&self) -> bool {
        self.platform
            .with_state(|state| state.probe.visible)
            .unwrap_or(false)
    }

    fn present(&mut self, frame: &FrameBuffer, dirty: &[DirtyRect]) -> Result<()> {
        self.ensure_alive()?;
        self.update(|probe| {
            probe.presents += 1;
            probe.last_dirty = dirty.to_vec();
            probe.pixels = frame.bgra_pixels().to_vec();
            probe.pixel_size = frame.size();
        });
        Ok(())
    }

    fn destroy(&mut self) {
        self.update(|probe| {
            probe.visible = false;
            probe.destroyed = true;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::HeadlessPlatform;
    use crate::crosshair::model::ScreenRect;
    use crate::crosshair::monitor::Monitor;
    use crate::crosshair::surface::DesktopPlatform;

    #[test]
    fn scripted_cursor_and_monitors_are_reported() {
        let platform = HeadlessPlatform::new(vec![Monitor::new(
            ScreenRect::new(0, 0, 800, 600),
            1.0,
        )]);
        assert_eq!(platform.cursor_position(), None);
        platform.set_cursor((10, 20));
        assert_eq!(platform.cursor_position(), Some((10, 20)));
        assert_eq!(platform.monitors().len(), 1);
    }

    #[test]
    fn surface_flags_and_visibility_are_recorded() {
        let mut platform = HeadlessPlatform::default();
        let mut surface = platform
            .create_surface(ScreenRect::new(0, 0, 10, 10))
            .expect("surface");
        surface.set_always_on_top().expect("top");
        surface.set_input_transparent().expect("click-through");
        surface.show();
        assert!(surface.is_visible());

        let probe = platform.probe();
        assert!(probe.always_on_top && probe.input_transparent && !probe.translucent);
        assert_eq!(probe.surfaces_created, 1);

        surface.destroy();
        assert!(!surface.is_visible());
        surface.show();
        assert!(!surface.is_visible());
        assert!(surface.set_bounds(ScreenRect::new(0, 0, 1, 1)).is_err());
    }

    #[test]
    fn refused_surface_creation_errors() {
        let mut platform = HeadlessPlatform::default();
        platform.refuse_surfaces(true);
        assert!(platform.create_surface(ScreenRect::new(0, 0, 1, 1)).is_err());
    }
}
