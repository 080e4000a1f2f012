use crate::crosshair::model::{Point, ScreenRect};
use crate::crosshair::render::{ClipRegion, DirtyRect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Monitor {
    pub rect: ScreenRect,
    /// Device pixel ratio, 1.0 at 96 DPI.
    pub scale_factor: f64,
    pub primary: bool,
}

impl Monitor {
    pub fn new(rect: ScreenRect, scale_factor: f64) -> Self {
        Self {
            rect,
            scale_factor,
            primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

pub fn monitor_contains_point(rect: ScreenRect, point: Point) -> bool {
    rect.contains(point)
}

pub fn select_monitor_for_point(monitors: &[Monitor], point: Point) -> Option<&Monitor> {
    monitors
        .iter()
        .find(|monitor| monitor_contains_point(monitor.rect, point))
}

pub fn global_to_local(point: Point, origin: Point) -> Point {
    (point.0 - origin.0, point.1 - origin.1)
}

/// The virtual desktop as seen by the overlay: every monitor plus the
/// union rectangle the overlay surface covers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesktopLayout {
    monitors: Vec<Monitor>,
    bounds: ScreenRect,
}

impl DesktopLayout {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        let bounds = monitors
            .iter()
            .fold(ScreenRect::default(), |acc, monitor| acc.union(monitor.rect));
        Self { monitors, bounds }
    }

    pub fn bounds(&self) -> ScreenRect {
        self.bounds
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty() || self.bounds.is_empty()
    }

    pub fn monitor_at(&self, point: Point) -> Option<&Monitor> {
        select_monitor_for_point(&self.monitors, point)
    }

    /// Scale of the monitor under `point`; the primary monitor's scale when
    /// the point is off every monitor, and 1.0 when nothing is known.
    pub fn scale_factor_at(&self, point: Point) -> f64 {
        self.monitor_at(point)
            .or_else(|| self.monitors.iter().find(|monitor| monitor.primary))
            .map(|monitor| monitor.scale_factor)
            .filter(|scale| scale.is_finite() && *scale > 0.0)
            .unwrap_or(1.0)
    }

    /// Monitor rectangles in overlay-surface coordinates.
    pub fn clip_region(&self) -> ClipRegion {
        let origin = self.bounds.origin();
        ClipRegion::new(
            self.monitors
                .iter()
                .map(|monitor| {
                    let (x, y) = global_to_local(monitor.rect.origin(), origin);
                    DirtyRect {
                        x,
                        y,
                        width: monitor.rect.width,
                        height: monitor.rect.height,
                    }
                })
                .collect(),
        )
    }
}
