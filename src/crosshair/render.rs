use crate::crosshair::geometry::{CrosshairFrame, PointF, Primitive};
use crate::crosshair::model::{BlendMode, Color, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn full(size: (u32, u32)) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.0 as i32,
            height: size.1 as i32,
        }
    }

    /// Smallest pixel rectangle covering the float extent, plus `pad`.
    pub fn from_extent(extent: (f32, f32, f32, f32), pad: i32) -> Option<Self> {
        let (x0, y0, x1, y1) = extent;
        if !(x0 <= x1 && y0 <= y1) {
            return None;
        }
        let min_x = x0.floor() as i32 - pad;
        let min_y = y0.floor() as i32 - pad;
        let max_x = x1.ceil() as i32 + pad;
        let max_y = y1.ceil() as i32 + pad;
        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        })
    }

    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        DirtyRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        }
    }

    pub fn translate(self, dx: i32, dy: i32) -> DirtyRect {
        DirtyRect {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Pixels outside every rectangle are never written. An empty region
/// clips nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipRegion {
    rects: Vec<DirtyRect>,
}

impl ClipRegion {
    pub fn new(rects: Vec<DirtyRect>) -> Self {
        Self { rects }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.rects.is_empty() || self.rects.iter().any(|rect| rect.contains(x, y))
    }
}

/// Overlay pixels: a straight-alpha RGBA working copy plus the premultiplied
/// BGRA copy handed to the surface.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    rgba: Vec<u8>,
    bgra: Vec<u8>,
    size: (u32, u32),
    previous_dirty: Vec<DirtyRect>,
    needs_full_present: bool,
}

impl FrameBuffer {
    pub fn new(size: (u32, u32)) -> Self {
        let mut buffer = Self::default();
        buffer.resize(size);
        buffer
    }

    /// Reallocates when the size changes. Returns `true` on reallocation.
    pub fn resize(&mut self, size: (u32, u32)) -> bool {
        let target_len = (size.0 as usize)
            .saturating_mul(size.1 as usize)
            .saturating_mul(4);
        let resized =
            self.size != size || self.rgba.len() != target_len || self.bgra.len() != target_len;
        if resized {
            self.rgba = vec![0; target_len];
            self.bgra = vec![0; target_len];
            self.size = size;
            self.previous_dirty.clear();
            self.needs_full_present = true;
        }
        resized
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn rgba_pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub fn bgra_pixels(&self) -> &[u8] {
        &self.bgra
    }

    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.0 || y >= self.size.1 {
            return None;
        }
        let idx = ((y as usize) * (self.size.0 as usize) + x as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Clears the previous frame's strips, rasterizes `frame` translated by
    /// `-origin`, and refreshes the BGRA copy. Returns the rectangles the
    /// surface must present.
    pub fn render(
        &mut self,
        frame: &CrosshairFrame,
        origin: Point,
        clip: &ClipRegion,
    ) -> Vec<DirtyRect> {
        let (width, height) = self.size;
        let mut present: Vec<DirtyRect> = std::mem::take(&mut self.previous_dirty);
        for rect in &present {
            clear_rect_rgba(&mut self.rgba, width, height, *rect);
        }

        let mut drawn = Vec::with_capacity(frame.rays.len());
        let mut target = RasterTarget {
            pixels: &mut self.rgba,
            width,
            height,
            clip,
            blend: frame.blend,
        };
        for ray in &frame.rays {
            let mut ray_rect: Option<DirtyRect> = None;
            for primitive in &ray.primitives {
                let translated = translate_primitive(primitive, origin);
                let Some(rect) = DirtyRect::from_extent(translated.extent(), 1) else {
                    continue;
                };
                if rect.clamp(width, height).is_none() {
                    continue;
                }
                draw_primitive(&mut target, &translated);
                ray_rect = Some(match ray_rect {
                    Some(existing) => existing.union(rect),
                    None => rect,
                });
            }
            if let Some(rect) = ray_rect.and_then(|rect| rect.clamp(width, height)) {
                drawn.push(rect);
            }
        }

        present.extend(drawn.iter().copied());
        if std::mem::take(&mut self.needs_full_present) {
            convert_rgba_to_premultiplied_bgra(&self.rgba, &mut self.bgra);
            present = vec![DirtyRect::full(self.size)];
        } else {
            for rect in &present {
                convert_rgba_to_premultiplied_bgra_rect(
                    &self.rgba, &mut self.bgra, width, height, *rect,
                );
            }
        }
        self.previous_dirty = drawn;
        present.retain(|rect| rect.clamp(width, height).is_some());
        present
    }

    /// Wipes everything drawn so far. The next present covers the whole
    /// surface.
    pub fn clear(&mut self) {
        self.rgba.fill(0);
        self.bgra.fill(0);
        self.previous_dirty.clear();
        self.needs_full_present = true;
    }
}

struct RasterTarget<'a> {
    pixels: &'a mut [u8],
    width: u32,
    height: u32,
    clip: &'a ClipRegion,
    blend: BlendMode,
}

impl RasterTarget<'_> {
    fn put(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if !self.clip.contains(x, y) {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        let Some(dst) = self.pixels.get_mut(idx..idx + 4) else {
            return;
        };
        let blended = match self.blend {
            BlendMode::Normal => blend_source_over(color, [dst[0], dst[1], dst[2], dst[3]]),
            BlendMode::Difference => blend_difference(color, [dst[0], dst[1], dst[2], dst[3]]),
        };
        dst.copy_from_slice(&blended);
    }

    fn span(&mut self, y: i32, x_start: i32, x_end: i32, color: Color) {
        let x_start = x_start.max(0);
        let x_end = x_end.min(self.width as i32);
        for x in x_start..x_end {
            self.put(x, y, color);
        }
    }
}

fn translate_primitive(primitive: &Primitive, origin: Point) -> Primitive {
    let (ox, oy) = (origin.0 as f32, origin.1 as f32);
    let shift = |p: PointF| (p.0 - ox, p.1 - oy);
    match primitive {
        Primitive::Segment {
            start,
            end,
            width,
            color,
        } => Primitive::Segment {
            start: shift(*start),
            end: shift(*end),
            width: *width,
            color: *color,
        },
        Primitive::Polygon { points, color } => Primitive::Polygon {
            points: points.iter().copied().map(shift).collect(),
            color: *color,
        },
        Primitive::Circle {
            center,
            radius,
            color,
        } => Primitive::Circle {
            center: shift(*center),
            radius: *radius,
            color: *color,
        },
    }
}

fn draw_primitive(target: &mut RasterTarget<'_>, primitive: &Primitive) {
    match primitive {
        Primitive::Segment {
            start,
            end,
            width,
            color,
        } => draw_segment(target, *start, *end, *width, *color),
        Primitive::Polygon { points, color } => fill_polygon(target, points, *color),
        Primitive::Circle {
            center,
            radius,
            color,
        } => fill_circle(target, *center, *radius, *color),
    }
}

/// Flat-capped stroke, filled as the quad around the centre line.
fn draw_segment(target: &mut RasterTarget<'_>, start: PointF, end: PointF, width: f32, color: Color) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 || !length.is_finite() || width <= 0.0 {
        return;
    }
    let half = width / 2.0;
    let nx = -dy / length * half;
    let ny = dx / length * half;
    let quad = [
        (start.0 + nx, start.1 + ny),
        (end.0 + nx, end.1 + ny),
        (end.0 - nx, end.1 - ny),
        (start.0 - nx, start.1 - ny),
    ];
    fill_polygon(target, &quad, color);
}

/// Even-odd scanline fill sampling pixel centres with half-open spans, so
/// polygons sharing an edge never cover the same pixel twice.
fn fill_polygon(target: &mut RasterTarget<'_>, points: &[PointF], color: Color) {
    if points.len() < 3 {
        return;
    }
    let (min_y, max_y) = points
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }
    let row_start = ((min_y - 0.5).ceil() as i32).max(0);
    let row_end = ((max_y - 0.5).ceil() as i32).min(target.height as i32);

    let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
    for row in row_start..row_end {
        let yc = row as f32 + 0.5;
        crossings.clear();
        for (index, a) in points.iter().enumerate() {
            let b = points[(index + 1) % points.len()];
            let (lo, hi) = if a.1 <= b.1 { (*a, b) } else { (b, *a) };
            if yc >= lo.1 && yc < hi.1 {
                crossings.push(lo.0 + (yc - lo.1) * (hi.0 - lo.0) / (hi.1 - lo.1));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let x_start = (pair[0] - 0.5).ceil() as i32;
            let x_end = (pair[1] - 0.5).ceil() as i32;
            target.span(row, x_start, x_end, color);
        }
    }
}

fn fill_circle(target: &mut RasterTarget<'_>, center: PointF, radius: f32, color: Color) {
    if radius <= 0.0 || !radius.is_finite() {
        return;
    }
    let r2 = radius * radius;
    let row_start = ((center.1 - radius - 0.5).ceil() as i32).max(0);
    let row_end = ((center.1 + radius - 0.5).ceil() as i32).min(target.height as i32);
    for row in row_start..row_end {
        let dy = row as f32 + 0.5 - center.1;
        let reach = r2 - dy * dy;
        if reach < 0.0 {
            continue;
        }
        let half_span = reach.sqrt();
        let x_start = (center.0 - half_span - 0.5).ceil() as i32;
        let x_end = (center.0 + half_span - 0.5).ceil() as i32;
        target.span(row, x_start, x_end, color);
    }
}

/// Straight-alpha source-over.
pub fn blend_source_over(src: Color, dst: [u8; 4]) -> [u8; 4] {
    if src.a == 255 {
        return src.to_rgba_array();
    }
    let sa = src.a as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| {
        let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    [
        channel(src.r, dst[0]),
        channel(src.g, dst[1]),
        channel(src.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

/// Separable difference: `Dca' = Sca + Dca - 2 min(Sca Da, Dca Sa)`,
/// `Da' = Sa + Da - Sa Da`, computed premultiplied.
pub fn blend_difference(src: Color, dst: [u8; 4]) -> [u8; 4] {
    let sa = src.a as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da - sa * da;
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| {
        let sca = s as f32 / 255.0 * sa;
        let dca = d as f32 / 255.0 * da;
        let out = sca + dca - 2.0 * (sca * da).min(dca * sa);
        (out / out_a * 255.0).round().clamp(0.0, 255.0) as u8
    };
    [
        channel(src.r, dst[0]),
        channel(src.g, dst[1]),
        channel(src.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}

pub fn convert_rgba_to_premultiplied_bgra(rgba: &[u8], bgra: &mut [u8]) {
    for (src, dst) in rgba.chunks_exact(4).zip(bgra.chunks_exact_mut(4)) {
        let alpha = src[3];
        dst[0] = premultiply(src[2], alpha);
        dst[1] = premultiply(src[1], alpha);
        dst[2] = premultiply(src[0], alpha);
        dst[3] = alpha;
    }
}

fn convert_rgba_to_premultiplied_bgra_rect(
    rgba: &[u8],
    bgra: &mut [u8],
    width: u32,
    height: u32,
    rect: DirtyRect,
) {
    let Some(rect) = rect.clamp(width, height) else {
        return;
    };
    for y in rect.y..(rect.y + rect.height) {
        let row_start = ((y as u32 * width + rect.x as u32) * 4) as usize;
        let row_end = row_start + rect.width as usize * 4;
        convert_rgba_to_premultiplied_bgra(&rgba[row_start..row_end], &mut bgra[row_start..row_end]);
    }
}

fn clear_rect_rgba(pixels: &mut [u8], width: u32, height: u32, rect: DirtyRect) {
    if let Some(rect) = rect.clamp(width, height) {
        for y in rect.y..(rect.y + rect.height) {
            let row_start = ((y as u32 * width + rect.x as u32) * 4) as usize;
            let row_end = row_start + rect.width as usize * 4;
            pixels[row_start..row_end].fill(0);
        }
    }
}
