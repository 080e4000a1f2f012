use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Point = (i32, i32);

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Channel-wise RGB inverse at full opacity.
    pub fn inverse(self) -> Self {
        Self::rgb(255 - self.r, 255 - self.g, 255 - self.b)
    }

    pub fn to_rgba_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }

    pub fn from_hex(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("color {trimmed:?} must start with '#'"))?;
        if !digits.is_ascii() || !matches!(digits.len(), 6 | 8) {
            return Err(anyhow!("color {trimmed:?} must be #rrggbb or #rrggbbaa"));
        }

        let channel = |index: usize| -> Result<u8> {
            let pair = &digits[index * 2..index * 2 + 2];
            u8::from_str_radix(pair, 16)
                .with_context(|| format!("parse channel {pair:?} of color {trimmed:?}"))
        };

        let alpha = if digits.len() == 8 { channel(3)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(1)?, channel(2)?, alpha))
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Color::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Axis-aligned rectangle in virtual-desktop pixels.
///
/// `right()` and `bottom()` are inclusive, so a 1920 wide rectangle at the
/// origin reports `right() == 1919`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.0 >= self.x
            && point.1 >= self.y
            && point.0 < self.x + self.width
            && point.1 < self.y + self.height
    }

    pub fn union(self, other: ScreenRect) -> ScreenRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        ScreenRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn origin(&self) -> Point {
        (self.x, self.y)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width.max(0) as u32, self.height.max(0) as u32)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    #[default]
    Circle,
    Arrow,
    Cross,
    #[serde(alias = "raute")]
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Difference,
}

#[cfg(test)]
mod tests {
    use super::{Color, MarkerShape, ScreenRect};

    #[test]
    fn inverse_flips_each_channel_and_forces_opaque() {
        let color = Color::rgba(10, 200, 255, 40);
        assert_eq!(color.inverse(), Color::rgba(245, 55, 0, 255));
        assert_eq!(Color::WHITE.inverse(), Color::rgb(0, 0, 0));
    }

    #[test]
    fn double_inverse_is_identity_for_opaque_colors() {
        for color in [
            Color::rgb(0, 0, 0),
            Color::rgb(12, 34, 56),
            Color::rgb(255, 128, 1),
        ] {
            assert_eq!(color.inverse().inverse(), color);
        }
    }

    #[test]
    fn hex_form_drops_alpha_when_opaque() {
        assert_eq!(Color::rgb(255, 0, 16).to_hex(), "#ff0010");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
        assert_eq!(Color::from_hex("#FF0010").expect("parse"), Color::rgb(255, 0, 16));
        assert_eq!(
            Color::from_hex(" #01020304 ").expect("parse"),
            Color::rgba(1, 2, 3, 4)
        );
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(Color::from_hex("ffffff").is_err());
        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        assert!(Color::from_hex("#ééé").is_err());
    }

    #[test]
    fn rect_edges_are_inclusive() {
        let rect = ScreenRect::new(0, 0, 1920, 1080);
        assert_eq!(rect.right(), 1919);
        assert_eq!(rect.bottom(), 1079);
        assert!(rect.contains((1919, 1079)));
        assert!(!rect.contains((1920, 0)));
    }

    #[test]
    fn union_spans_side_by_side_monitors() {
        let left = ScreenRect::new(-1920, 0, 1920, 1080);
        let right = ScreenRect::new(0, -200, 2560, 1440);
        assert_eq!(left.union(right), ScreenRect::new(-1920, -200, 4480, 1440));
        assert_eq!(ScreenRect::default().union(right), right);
    }

    #[test]
    fn legacy_shape_name_is_accepted() {
        let shape: MarkerShape = serde_json::from_str("\"raute\"").expect("parse");
        assert_eq!(shape, MarkerShape::Diamond);
        assert_eq!(
            serde_json::to_string(&MarkerShape::Diamond).expect("serialize"),
            "\"diamond\""
        );
    }
}
