use crate::crosshair::geometry::build_frame;
use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::monitor::DesktopLayout;
use crate::crosshair::render::{ClipRegion, FrameBuffer};
use crate::crosshair::settings::RenderSettings;
use crate::crosshair::state::{can_transition, RendererState};
use crate::crosshair::surface::{DesktopPlatform, OverlaySurface};
use crate::crosshair::timer::FrameTimer;
use anyhow::{anyhow, Context, Result};
use std::time::{Duration, Instant};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const DISPLAY_RECHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Owns the overlay surface and repaints the crosshair whenever the pointer
/// moves. Single-threaded: every call happens on the thread that owns the
/// surface.
pub struct CrosshairRenderer {
    platform: Box<dyn DesktopPlatform>,
    surface: Option<Box<dyn OverlaySurface>>,
    state: RendererState,
    settings: RenderSettings,
    layout: DesktopLayout,
    clip: ClipRegion,
    frame_buffer: FrameBuffer,
    timer: FrameTimer,
    next_display_check: Option<Instant>,
    mouse_position: Option<Point>,
    frames_rendered: u64,
}

impl CrosshairRenderer {
    pub fn new(platform: Box<dyn DesktopPlatform>, settings: RenderSettings) -> Self {
        Self {
            platform,
            surface: None,
            state: RendererState::Uninitialized,
            settings,
            layout: DesktopLayout::default(),
            clip: ClipRegion::unbounded(),
            frame_buffer: FrameBuffer::default(),
            timer: FrameTimer::new(FRAME_INTERVAL),
            next_display_check: None,
            mouse_position: None,
            frames_rendered: 0,
        }
    }

    /// Creates the overlay surface over every monitor. `false` means the
    /// overlay is unavailable for this session.
    pub fn initialize(&mut self) -> bool {
        if self.state.is_initialized() {
            return true;
        }
        if self.state == RendererState::Released {
            tracing::warn!("crosshair renderer already released; not re-initializing");
            return false;
        }

        match self.create_surface() {
            Ok(()) => {
                self.transition(RendererState::Stopped);
                tracing::info!(
                    platform = self.platform.name(),
                    bounds = ?self.layout.bounds(),
                    monitors = self.layout.monitors().len(),
                    "crosshair overlay initialized"
                );
                true
            }
            Err(err) => {
                tracing::warn!(
                    platform = self.platform.name(),
                    error = %format!("{err:#}"),
                    "crosshair overlay unavailable"
                );
                false
            }
        }
    }

    fn create_surface(&mut self) -> Result<()> {
        let layout = DesktopLayout::new(self.platform.monitors());
        if layout.is_empty() {
            return Err(anyhow!("no monitors reported by {}", self.platform.name()));
        }

        let bounds = layout.bounds();
        let mut surface = self
            .platform
            .create_surface(bounds)
            .with_context(|| format!("create overlay surface covering {bounds:?}"))?;
        let configured = surface
            .set_always_on_top()
            .and_then(|_| surface.set_input_transparent())
            .and_then(|_| surface.set_translucent());
        if let Err(err) = configured {
            surface.destroy();
            return Err(err.context("configure overlay surface"));
        }
        surface.set_opacity(self.settings.opacity);

        self.frame_buffer.resize(bounds.size());
        self.clip = layout.clip_region();
        self.layout = layout;
        self.surface = Some(surface);
        Ok(())
    }

    pub fn start_rendering(&mut self) {
        self.start_rendering_at(Instant::now());
    }

    pub fn start_rendering_at(&mut self, now: Instant) {
        if self.state != RendererState::Stopped {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.show();
        self.timer.start(now);
        self.next_display_check = Some(now + DISPLAY_RECHECK_INTERVAL);
        self.transition(RendererState::Rendering);
        tracing::debug!("crosshair rendering started");

        // Monitors may have changed while hidden.
        self.reload_layout();

        if let Some(position) = self.platform.cursor_position() {
            self.mouse_position = Some(position);
        }
        self.repaint();
    }

    pub fn stop_rendering(&mut self) {
        if self.state != RendererState::Rendering {
            return;
        }
        self.timer.stop();
        self.next_display_check = None;
        if let Some(surface) = self.surface.as_mut() {
            surface.hide();
        }
        self.transition(RendererState::Stopped);
        tracing::debug!(frames = self.frames_rendered, "crosshair rendering stopped");
    }

    /// Starts when stopped, stops when rendering. Returns the new rendering
    /// state.
    pub fn toggle(&mut self) -> bool {
        if self.is_rendering() {
            self.stop_rendering();
        } else {
            self.start_rendering();
        }
        self.is_rendering()
    }

    pub fn update_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
        if let Some(surface) = self.surface.as_mut() {
            surface.set_opacity(settings.opacity);
        }
        self.repaint();
    }

    /// Records the pointer position. Repaints only when it moved; returns
    /// whether a frame was presented.
    pub fn update_mouse_position(&mut self, position: Point) -> bool {
        if self.mouse_position == Some(position) {
            return false;
        }
        self.mouse_position = Some(position);
        self.repaint()
    }

    pub fn is_rendering(&self) -> bool {
        self.state == RendererState::Rendering
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn bounds(&self) -> ScreenRect {
        self.layout.bounds()
    }

    pub fn mouse_position(&self) -> Option<Point> {
        self.mouse_position
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    /// How long the owning loop may sleep before the next `tick`. `None`
    /// while not rendering.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.timer.time_until_next(now)
    }

    /// Timer callback: polls the pointer when a frame is due and re-reads
    /// the monitor layout on the slow cadence.
    pub fn tick(&mut self, now: Instant) {
        if let Some(surface) = self.surface.as_mut() {
            surface.pump_events();
        }
        if !self.timer.poll(now) {
            return;
        }

        if self.next_display_check.is_some_and(|due| now >= due) {
            self.next_display_check = Some(now + DISPLAY_RECHECK_INTERVAL);
            self.refresh_display_layout();
        }

        if let Some(position) = self.platform.cursor_position() {
            self.update_mouse_position(position);
        }
    }

    /// Re-reads the monitor layout and resizes the surface when it changed.
    /// Returns `true` when the layout changed.
    pub fn refresh_display_layout(&mut self) -> bool {
        if !self.reload_layout() {
            return false;
        }
        self.repaint();
        true
    }

    fn reload_layout(&mut self) -> bool {
        let layout = DesktopLayout::new(self.platform.monitors());
        if layout.is_empty() || layout == self.layout {
            return false;
        }

        let bounds = layout.bounds();
        if let Some(surface) = self.surface.as_mut() {
            if let Err(err) = surface.set_bounds(bounds) {
                tracing::warn!(error = %format!("{err:#}"), "resize overlay surface failed");
                return false;
            }
        }
        tracing::info!(
            bounds = ?bounds,
            monitors = layout.monitors().len(),
            "display layout changed"
        );
        self.frame_buffer.resize(bounds.size());
        self.clip = layout.clip_region();
        self.layout = layout;
        true
    }

    fn repaint(&mut self) -> bool {
        if self.state != RendererState::Rendering {
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };

        let bounds = self.layout.bounds();
        let frame = match self.mouse_position {
            Some(position) => build_frame(
                position,
                bounds,
                &self.settings,
                self.layout.scale_factor_at(position),
            ),
            None => Default::default(),
        };
        let dirty = self
            .frame_buffer
            .render(&frame, bounds.origin(), &self.clip);
        if let Err(err) = surface.present(&self.frame_buffer, &dirty) {
            tracing::debug!(error = %format!("{err:#}"), "present overlay frame failed");
            return false;
        }
        self.frames_rendered += 1;
        true
    }

    /// Stops rendering and releases the surface. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.stop_rendering();
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
            tracing::debug!("crosshair overlay surface released");
        }
        self.transition(RendererState::Released);
    }

    fn transition(&mut self, next: RendererState) {
        if !can_transition(self.state, next) {
            tracing::warn!(from = ?self.state, to = ?next, "unexpected renderer state change");
        }
        self.state = next;
    }
}

impl Drop for CrosshairRenderer {
    fn drop(&mut self) {
        self.cleanup();
    }
}
