//! Crosshair geometry: rays from the cursor to the desktop edges, split into
//! graduated-thickness segments and decorated with graduated markers.
//!
//! Everything here is pure; coordinates are virtual-desktop pixels.

use crate::crosshair::model::{BlendMode, Color, MarkerShape, Point, ScreenRect};
use crate::crosshair::settings::RenderSettings;

pub const SEGMENTS_PER_RAY: u32 = 50;
pub const MIN_BASE_THICKNESS: i32 = 3;

pub type PointF = (f32, f32);

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Flat-capped stroke.
    Segment {
        start: PointF,
        end: PointF,
        width: f32,
        color: Color,
    },
    Polygon {
        points: Vec<PointF>,
        color: Color,
    },
    Circle {
        center: PointF,
        radius: f32,
        color: Color,
    },
}

impl Primitive {
    /// `(min_x, min_y, max_x, max_y)` of the covered area.
    pub fn extent(&self) -> (f32, f32, f32, f32) {
        match self {
            Primitive::Segment {
                start, end, width, ..
            } => {
                let half = width / 2.0;
                (
                    start.0.min(end.0) - half,
                    start.1.min(end.1) - half,
                    start.0.max(end.0) + half,
                    start.1.max(end.1) + half,
                )
            }
            Primitive::Polygon { points, .. } => points.iter().fold(
                (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
                |(x0, y0, x1, y1), p| (x0.min(p.0), y0.min(p.1), x1.max(p.0), y1.max(p.1)),
            ),
            Primitive::Circle { center, radius, .. } => (
                center.0 - radius,
                center.1 - radius,
                center.0 + radius,
                center.1 + radius,
            ),
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Primitive::Segment { color, .. }
            | Primitive::Polygon { color, .. }
            | Primitive::Circle { color, .. } => *color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ray {
    pub direction: RayDirection,
    /// Cursor moved out by the clearance offset.
    pub start: Point,
    /// Point on the desktop edge.
    pub end: Point,
    pub total_distance: i32,
}

impl Ray {
    pub fn new(direction: RayDirection, start: Point, end: Point) -> Self {
        let total_distance = (end.0 - start.0).abs() + (end.1 - start.1).abs();
        Self {
            direction,
            start,
            end,
            total_distance,
        }
    }

    /// Unit vector pointing from `start` toward `end`. `None` for a
    /// zero-length ray.
    fn unit(&self) -> Option<(f64, f64)> {
        let dx = (self.end.0 - self.start.0) as f64;
        let dy = (self.end.1 - self.start.1) as f64;
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        Some((dx / length, dy / length))
    }

    fn point_at(&self, fraction: f64) -> Point {
        (
            self.start.0 + ((self.end.0 - self.start.0) as f64 * fraction) as i32,
            self.start.1 + ((self.end.1 - self.start.1) as f64 * fraction) as i32,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RayGeometry {
    pub ray: Ray,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrosshairFrame {
    pub blend: BlendMode,
    pub rays: Vec<RayGeometry>,
}

impl CrosshairFrame {
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.rays.iter().flat_map(|ray| ray.primitives.iter())
    }

    pub fn ray(&self, direction: RayDirection) -> Option<&RayGeometry> {
        self.rays.iter().find(|ray| ray.ray.direction == direction)
    }

    pub fn is_empty(&self) -> bool {
        self.rays.iter().all(|ray| ray.primitives.is_empty())
    }
}

/// `max(3, trunc(line_width * scale))`.
pub fn scaled_line_width(line_width: u32, scale_factor: f64) -> i32 {
    let scaled = (line_width as f64 * scale_factor) as i32;
    scaled.max(MIN_BASE_THICKNESS)
}

pub fn thickness(base: f64, multiplier: f64, progress: f64) -> f64 {
    base * (1.0 + (multiplier - 1.0) * progress)
}

pub fn marker_diameter(base: f64, multiplier: f64, distance: f64, total_distance: f64) -> f64 {
    base * (1.0 + (multiplier - 1.0) * distance / total_distance) / 2.0
}

/// Distances from the ray start at which markers sit. The first gap is two
/// near-cursor diameters and every following gap grows by
/// `growth_percent`.
pub fn marker_distances(
    base: f64,
    multiplier: f64,
    growth_percent: f64,
    total_distance: f64,
) -> Vec<f64> {
    if !(total_distance > 0.0) {
        return Vec::new();
    }

    let first_gap = 2.0 * marker_diameter(base, multiplier, 0.0, total_distance);
    let ratio = 1.0 + growth_percent / 100.0;
    if !first_gap.is_finite() || first_gap <= 0.0 || !ratio.is_finite() || ratio <= 0.0 {
        return Vec::new();
    }

    let limit =
        total_distance + marker_diameter(base, multiplier, total_distance, total_distance) / 2.0;
    let mut distances = Vec::new();
    let mut gap = first_gap;
    let mut distance = first_gap;
    while distance <= limit {
        distances.push(distance);
        gap *= ratio;
        if gap < 1.0 {
            break;
        }
        distance += gap;
    }
    distances
}

/// The four rays, dropping any whose clearance offset reaches past the edge.
pub fn crosshair_rays(cursor: Point, bounds: ScreenRect, offset_from_cursor: u32) -> Vec<Ray> {
    let (x, y) = cursor;
    let offset = offset_from_cursor.min(i32::MAX as u32) as i32;
    let candidates = [
        (
            RayDirection::Left,
            (x.saturating_sub(offset), y),
            (bounds.left(), y),
            x.saturating_sub(offset) - bounds.left(),
        ),
        (
            RayDirection::Right,
            (x.saturating_add(offset), y),
            (bounds.right(), y),
            bounds.right() - x.saturating_add(offset),
        ),
        (
            RayDirection::Up,
            (x, y.saturating_sub(offset)),
            (x, bounds.top()),
            y.saturating_sub(offset) - bounds.top(),
        ),
        (
            RayDirection::Down,
            (x, y.saturating_add(offset)),
            (x, bounds.bottom()),
            bounds.bottom() - y.saturating_add(offset),
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, _, _, signed_distance)| *signed_distance > 0)
        .map(|(direction, start, end, _)| Ray::new(direction, start, end))
        .collect()
}

pub fn build_frame(
    cursor: Point,
    bounds: ScreenRect,
    settings: &RenderSettings,
    scale_factor: f64,
) -> CrosshairFrame {
    let base = scaled_line_width(settings.line_width, scale_factor);
    let blend = if settings.inverted {
        BlendMode::Difference
    } else {
        BlendMode::Normal
    };

    let rays = crosshair_rays(cursor, bounds, settings.offset_from_cursor)
        .into_iter()
        .map(|ray| {
            let mut primitives = graduated_line(&ray, base, settings);
            if settings.show_markers {
                primitives.extend(graduated_markers(&ray, base, settings));
            }
            RayGeometry { ray, primitives }
        })
        .collect();

    CrosshairFrame { blend, rays }
}

pub fn graduated_line(ray: &Ray, base: i32, settings: &RenderSettings) -> Vec<Primitive> {
    let mut primitives = Vec::with_capacity(SEGMENTS_PER_RAY as usize * 2);
    if ray.total_distance <= 0 {
        return primitives;
    }

    let inverse = settings.color.inverse();
    for i in 0..SEGMENTS_PER_RAY {
        let progress = i as f64 / SEGMENTS_PER_RAY as f64;
        let next_progress = (i + 1) as f64 / SEGMENTS_PER_RAY as f64;
        let width = thickness(base as f64, settings.thickness_multiplier, progress) as i32;
        let start = ray.point_at(progress);
        let end = ray.point_at(next_progress);
        if start == end || width <= 0 {
            continue;
        }

        let start = (start.0 as f32, start.1 as f32);
        let end = (end.0 as f32, end.1 as f32);
        primitives.push(Primitive::Segment {
            start,
            end,
            width: width as f32,
            color: settings.color,
        });

        let inner_width = width / 2;
        if !settings.inverted && inner_width > 0 {
            primitives.push(Primitive::Segment {
                start,
                end,
                width: inner_width as f32,
                color: inverse,
            });
        }
    }
    primitives
}

pub fn graduated_markers(ray: &Ray, base: i32, settings: &RenderSettings) -> Vec<Primitive> {
    let Some(outward) = ray.unit() else {
        return Vec::new();
    };
    let total = ray.total_distance as f64;
    let base = base as f64;

    marker_distances(
        base,
        settings.thickness_multiplier,
        settings.marker_spacing_growth,
        total,
    )
    .into_iter()
    .filter_map(|distance| {
        let center = (
            ray.start.0 as f64 + outward.0 * distance,
            ray.start.1 as f64 + outward.1 * distance,
        );
        let size = marker_diameter(base, settings.thickness_multiplier, distance, total);
        marker_primitive(
            settings.marker_shape,
            center,
            (-outward.0, -outward.1),
            size,
            settings.color,
        )
    })
    .collect()
}

/// One marker of `size` centred at `center`. `toward_cursor` must be a unit
/// vector; arrows point along it.
pub fn marker_primitive(
    shape: MarkerShape,
    center: (f64, f64),
    toward_cursor: (f64, f64),
    size: f64,
    color: Color,
) -> Option<Primitive> {
    if !(size > 0.0) || !size.is_finite() {
        return None;
    }
    let (dx, dy) = toward_cursor;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let (px, py) = (-dy, dx);
    let half = size / 2.0;
    let at = |along: f64, across: f64| -> PointF {
        (
            (center.0 + dx * along + px * across) as f32,
            (center.1 + dy * along + py * across) as f32,
        )
    };

    let primitive = match shape {
        MarkerShape::Circle => Primitive::Circle {
            center: (center.0 as f32, center.1 as f32),
            radius: half as f32,
            color,
        },
        MarkerShape::Arrow => Primitive::Polygon {
            points: vec![at(half, 0.0), at(-half, half), at(-half, -half)],
            color,
        },
        MarkerShape::Diamond => Primitive::Polygon {
            points: vec![at(half, 0.0), at(0.0, half), at(-half, 0.0), at(0.0, -half)],
            color,
        },
        MarkerShape::Cross => {
            // One outline so the centre is covered once under difference blending.
            let arm = (size / 8.0).max(0.5);
            Primitive::Polygon {
                points: vec![
                    at(half, arm),
                    at(arm, arm),
                    at(arm, half),
                    at(-arm, half),
                    at(-arm, arm),
                    at(-half, arm),
                    at(-half, -arm),
                    at(-arm, -arm),
                    at(-arm, -half),
                    at(arm, -half),
                    at(arm, -arm),
                    at(half, -arm),
                ],
                color,
            }
        }
    };
    Some(primitive)
}

#[cfg(test)]
mod tests {
    use super::{
        build_frame, crosshair_rays, marker_distances, marker_primitive, scaled_line_width,
        thickness, Primitive, RayDirection, SEGMENTS_PER_RAY,
    };
    use crate::crosshair::model::{BlendMode, Color, MarkerShape, ScreenRect};
    use crate::crosshair::settings::RenderSettings;

    fn full_hd() -> ScreenRect {
        ScreenRect::new(0, 0, 1920, 1080)
    }

    fn segments(primitives: &[Primitive]) -> Vec<(f32, f32, f32, f32, f32, Color)> {
        primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Segment {
                    start,
                    end,
                    width,
                    color,
                } => Some((start.0, start.1, end.0, end.1, *width, *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn base_width_is_scaled_and_floored() {
        assert_eq!(scaled_line_width(4, 1.0), 4);
        assert_eq!(scaled_line_width(4, 1.5), 6);
        assert_eq!(scaled_line_width(3, 1.25), 3);
        assert_eq!(scaled_line_width(1, 1.0), 3);
    }

    #[test]
    fn thickness_interpolates_from_base_to_multiplied() {
        assert_eq!(thickness(4.0, 3.0, 0.0), 4.0);
        assert_eq!(thickness(4.0, 3.0, 1.0), 12.0);
        let mut previous = 0.0;
        for step in 0..=100 {
            let value = thickness(4.0, 3.0, step as f64 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn marker_gaps_grow_with_positive_growth() {
        let distances = marker_distances(4.0, 3.0, 5.0, 1000.0);
        assert!(distances.len() > 3);
        assert_eq!(distances[0], 4.0);
        let gaps: Vec<f64> = distances.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn marker_gaps_are_constant_without_growth() {
        let distances = marker_distances(4.0, 3.0, 0.0, 100.0);
        let gaps: Vec<f64> = distances.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.iter().all(|gap| (gap - 4.0).abs() < 1e-9));
        // Overrun: last marker may sit up to half a far diameter past the end.
        assert_eq!(distances.last().copied(), Some(100.0));
    }

    #[test]
    fn marker_distances_reject_degenerate_input() {
        assert!(marker_distances(4.0, 3.0, 5.0, 0.0).is_empty());
        assert!(marker_distances(4.0, 3.0, 5.0, -10.0).is_empty());
        assert!(marker_distances(0.0, 3.0, 5.0, 100.0).is_empty());
        assert!(marker_distances(4.0, f64::NAN, 5.0, 100.0).is_empty());
    }

    #[test]
    fn rays_reach_each_desktop_edge() {
        let rays = crosshair_rays((500, 500), full_hd(), 49);
        assert_eq!(rays.len(), 4);
        let left = rays
            .iter()
            .find(|r| r.direction == RayDirection::Left)
            .expect("left");
        assert_eq!(left.start, (451, 500));
        assert_eq!(left.end, (0, 500));
        assert_eq!(left.total_distance, 451);
        let right = rays
            .iter()
            .find(|r| r.direction == RayDirection::Right)
            .expect("right");
        assert_eq!(right.end, (1919, 500));
        let down = rays
            .iter()
            .find(|r| r.direction == RayDirection::Down)
            .expect("down");
        assert_eq!(down.end, (500, 1079));
    }

    #[test]
    fn ray_is_skipped_when_offset_reaches_the_edge() {
        let rays = crosshair_rays((30, 500), full_hd(), 49);
        assert!(rays.iter().all(|r| r.direction != RayDirection::Left));
        let rays = crosshair_rays((49, 500), full_hd(), 49);
        assert!(rays.iter().all(|r| r.direction != RayDirection::Left));
        assert_eq!(crosshair_rays((49, 500), full_hd(), 49).len(), 3);
    }

    #[test]
    fn left_ray_thickens_toward_the_edge() {
        let settings = RenderSettings {
            show_markers: false,
            ..RenderSettings::default()
        };
        let frame = build_frame((500, 500), full_hd(), &settings, 1.0);
        let left = frame.ray(RayDirection::Left).expect("left ray");
        let outer: Vec<_> = segments(&left.primitives)
            .into_iter()
            .filter(|s| s.5 == settings.color)
            .collect();

        assert_eq!(outer.len(), SEGMENTS_PER_RAY as usize);
        assert_eq!((outer[0].0, outer[0].1), (451.0, 500.0));
        assert_eq!(outer[0].4, 4.0);
        let last = outer.last().expect("last");
        assert_eq!((last.2, last.3), (0.0, 500.0));
        assert_eq!(last.4, 11.0);
        assert!(outer.windows(2).all(|w| w[1].4 >= w[0].4));
        // Adjacent segments share endpoints exactly.
        assert!(outer.windows(2).all(|w| (w[0].2, w[0].3) == (w[1].0, w[1].1)));
    }

    #[test]
    fn normal_mode_adds_half_width_inverse_stroke() {
        let settings = RenderSettings {
            color: Color::rgb(255, 0, 0),
            show_markers: false,
            ..RenderSettings::default()
        };
        let frame = build_frame((500, 500), full_hd(), &settings, 1.0);
        assert_eq!(frame.blend, BlendMode::Normal);
        let left = frame.ray(RayDirection::Left).expect("left ray");
        let all = segments(&left.primitives);
        assert_eq!(all[1].5, Color::rgb(0, 255, 255));
        assert_eq!(all[1].4, all[0].4 / 2.0);
    }

    #[test]
    fn inverted_mode_uses_difference_blend_without_inner_stroke() {
        let settings = RenderSettings {
            inverted: true,
            show_markers: false,
            ..RenderSettings::default()
        };
        let frame = build_frame((500, 500), full_hd(), &settings, 1.0);
        assert_eq!(frame.blend, BlendMode::Difference);
        assert!(frame
            .primitives()
            .all(|primitive| primitive.color() == settings.color));
    }

    #[test]
    fn unit_multiplier_gives_uniform_width() {
        let settings = RenderSettings {
            thickness_multiplier: 1.0,
            show_markers: false,
            inverted: true,
            ..RenderSettings::default()
        };
        let frame = build_frame((700, 300), full_hd(), &settings, 1.0);
        assert_eq!(frame.rays.len(), 4);
        for (_, _, _, _, width, _) in frame
            .rays
            .iter()
            .flat_map(|ray| segments(&ray.primitives))
        {
            assert_eq!(width, 4.0);
        }
    }

    #[test]
    fn cursor_in_corner_emits_only_the_long_rays() {
        let frame = build_frame((0, 0), full_hd(), &RenderSettings::default(), 1.0);
        let directions: Vec<_> = frame.rays.iter().map(|r| r.ray.direction).collect();
        assert_eq!(directions, vec![RayDirection::Right, RayDirection::Down]);
    }

    #[test]
    fn markers_follow_the_lines() {
        let settings = RenderSettings {
            marker_shape: MarkerShape::Circle,
            ..RenderSettings::default()
        };
        let frame = build_frame((500, 500), full_hd(), &settings, 1.0);
        let left = frame.ray(RayDirection::Left).expect("left ray");
        let circles: Vec<_> = left
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Circle { center, radius, .. } => Some((*center, *radius)),
                _ => None,
            })
            .collect();
        assert!(!circles.is_empty());
        // First marker two near diameters out, radius half a near diameter.
        assert_eq!(circles[0].0, (447.0, 500.0));
        assert!((circles[0].1 - 1.0).abs() < 0.05);
        assert!(circles.windows(2).all(|w| w[1].1 >= w[0].1));
    }

    #[test]
    fn arrow_tip_points_toward_the_cursor() {
        let arrow = marker_primitive(
            MarkerShape::Arrow,
            (100.0, 50.0),
            (1.0, 0.0),
            10.0,
            Color::WHITE,
        )
        .expect("arrow");
        let Primitive::Polygon { points, .. } = arrow else {
            panic!("arrow should be a polygon");
        };
        assert_eq!(points[0], (105.0, 50.0));
        assert!(points[1..].iter().all(|p| p.0 == 95.0));
    }

    #[test]
    fn zero_direction_or_size_produces_no_marker() {
        for shape in [
            MarkerShape::Circle,
            MarkerShape::Arrow,
            MarkerShape::Cross,
            MarkerShape::Diamond,
        ] {
            assert!(marker_primitive(shape, (0.0, 0.0), (0.0, 0.0), 5.0, Color::WHITE).is_none());
            assert!(marker_primitive(shape, (0.0, 0.0), (1.0, 0.0), 0.0, Color::WHITE).is_none());
        }
    }

    #[test]
    fn cross_and_diamond_stay_within_their_size() {
        for shape in [MarkerShape::Cross, MarkerShape::Diamond] {
            let primitive = marker_primitive(shape, (10.0, 10.0), (0.0, -1.0), 8.0, Color::WHITE)
                .expect("marker");
            let (x0, y0, x1, y1) = primitive.extent();
            assert!(x0 >= 6.0 - 1e-4 && y0 >= 6.0 - 1e-4);
            assert!(x1 <= 14.0 + 1e-4 && y1 <= 14.0 + 1e-4);
        }
    }
}
