use crate::crosshair::model::{Color, MarkerShape};
use serde::{Deserialize, Serialize};

pub const SETTINGS_VERSION: u32 = 1;

pub const LINE_WIDTH_RANGE: (u32, u32) = (1, 10);
pub const OFFSET_RANGE: (u32, u32) = (0, 500);
pub const THICKNESS_MULTIPLIER_RANGE: (f64, f64) = (1.0, 10.0);
pub const OPACITY_RANGE: (f32, f32) = (0.0, 1.0);
pub const MARKER_SPACING_GROWTH_RANGE: (f64, f64) = (1.0, 10.0);

/// Immutable snapshot the renderer reads on every repaint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub color: Color,
    pub line_width: u32,
    pub offset_from_cursor: u32,
    pub thickness_multiplier: f64,
    pub opacity: f32,
    pub show_markers: bool,
    /// Percent added to each successive marker gap.
    pub marker_spacing_growth: f64,
    pub marker_shape: MarkerShape,
    pub inverted: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        CrosshairSettings::default().snapshot()
    }
}

/// Persisted user settings. Everything the renderer needs plus the few
/// behavior switches the host reads at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrosshairSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_color")]
    pub color: Color,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    #[serde(default = "default_offset_from_cursor")]
    pub offset_from_cursor: u32,
    #[serde(default = "default_thickness_multiplier")]
    pub thickness_multiplier: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_show_markers", alias = "show_arrows")]
    pub show_markers: bool,
    #[serde(
        default = "default_marker_spacing_growth",
        alias = "circle_spacing_increase"
    )]
    pub marker_spacing_growth: f64,
    #[serde(default, alias = "direction_shape")]
    pub marker_shape: MarkerShape,
    #[serde(default, alias = "inverted_mode")]
    pub inverted: bool,
    #[serde(default = "default_activate_on_start")]
    pub activate_on_start: bool,
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_color() -> Color {
    Color::WHITE
}

fn default_line_width() -> u32 {
    4
}

fn default_offset_from_cursor() -> u32 {
    49
}

fn default_thickness_multiplier() -> f64 {
    3.0
}

fn default_opacity() -> f32 {
    0.8
}

fn default_show_markers() -> bool {
    true
}

fn default_marker_spacing_growth() -> f64 {
    5.0
}

fn default_activate_on_start() -> bool {
    false
}

impl Default for CrosshairSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            color: default_color(),
            line_width: default_line_width(),
            offset_from_cursor: default_offset_from_cursor(),
            thickness_multiplier: default_thickness_multiplier(),
            opacity: default_opacity(),
            show_markers: default_show_markers(),
            marker_spacing_growth: default_marker_spacing_growth(),
            marker_shape: MarkerShape::default(),
            inverted: false,
            activate_on_start: default_activate_on_start(),
            debug_logging: false,
        }
    }
}

impl CrosshairSettings {
    /// Clamps every field into its supported range. Returns `true` when
    /// anything had to change.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();

        self.version = SETTINGS_VERSION;
        self.line_width = self.line_width.clamp(LINE_WIDTH_RANGE.0, LINE_WIDTH_RANGE.1);
        self.offset_from_cursor = self.offset_from_cursor.clamp(OFFSET_RANGE.0, OFFSET_RANGE.1);
        self.thickness_multiplier = clamp_finite(
            self.thickness_multiplier,
            THICKNESS_MULTIPLIER_RANGE,
            default_thickness_multiplier(),
        );
        self.opacity = if self.opacity.is_finite() {
            self.opacity.clamp(OPACITY_RANGE.0, OPACITY_RANGE.1)
        } else {
            default_opacity()
        };
        self.marker_spacing_growth = clamp_finite(
            self.marker_spacing_growth,
            MARKER_SPACING_GROWTH_RANGE,
            default_marker_spacing_growth(),
        );

        *self != before
    }

    pub fn snapshot(&self) -> RenderSettings {
        RenderSettings {
            color: self.color,
            line_width: self.line_width,
            offset_from_cursor: self.offset_from_cursor,
            thickness_multiplier: self.thickness_multiplier,
            opacity: self.opacity,
            show_markers: self.show_markers,
            marker_spacing_growth: self.marker_spacing_growth,
            marker_shape: self.marker_shape,
            inverted: self.inverted,
        }
    }
}

fn clamp_finite(value: f64, range: (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(range.0, range.1)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::{CrosshairSettings, RenderSettings, SETTINGS_VERSION};
    use crate::crosshair::model::{Color, MarkerShape};

    #[test]
    fn defaults_match_documented_values() {
        let settings = CrosshairSettings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.color, Color::WHITE);
        assert_eq!(settings.line_width, 4);
        assert_eq!(settings.offset_from_cursor, 49);
        assert_eq!(settings.thickness_multiplier, 3.0);
        assert_eq!(settings.opacity, 0.8);
        assert!(settings.show_markers);
        assert_eq!(settings.marker_spacing_growth, 5.0);
        assert_eq!(settings.marker_shape, MarkerShape::Circle);
        assert!(!settings.inverted);
        assert!(!settings.activate_on_start);
        assert!(!settings.debug_logging);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: CrosshairSettings =
            serde_json::from_str(r##"{"line_width": 7, "color": "#00ff00"}"##).expect("parse");
        assert_eq!(settings.line_width, 7);
        assert_eq!(settings.color, Color::rgb(0, 255, 0));
        assert_eq!(settings.offset_from_cursor, 49);
        assert_eq!(settings.marker_shape, MarkerShape::Circle);
    }

    #[test]
    fn legacy_field_names_are_read_as_aliases() {
        let settings: CrosshairSettings = serde_json::from_str(
            r#"{
                "show_arrows": false,
                "circle_spacing_increase": 8.0,
                "direction_shape": "raute",
                "inverted_mode": true
            }"#,
        )
        .expect("parse");
        assert!(!settings.show_markers);
        assert_eq!(settings.marker_spacing_growth, 8.0);
        assert_eq!(settings.marker_shape, MarkerShape::Diamond);
        assert!(settings.inverted);

        let json = serde_json::to_value(&settings).expect("serialize");
        assert!(json.get("show_markers").is_some());
        assert!(json.get("show_arrows").is_none());
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut settings = CrosshairSettings {
            line_width: 0,
            offset_from_cursor: 5_000,
            thickness_multiplier: 0.25,
            opacity: 3.0,
            marker_spacing_growth: 50.0,
            ..CrosshairSettings::default()
        };

        assert!(settings.sanitize());
        assert_eq!(settings.line_width, 1);
        assert_eq!(settings.offset_from_cursor, 500);
        assert_eq!(settings.thickness_multiplier, 1.0);
        assert_eq!(settings.opacity, 1.0);
        assert_eq!(settings.marker_spacing_growth, 10.0);
    }

    #[test]
    fn sanitize_replaces_non_finite_floats() {
        let mut settings = CrosshairSettings {
            thickness_multiplier: f64::NAN,
            opacity: f32::INFINITY,
            marker_spacing_growth: f64::NEG_INFINITY,
            ..CrosshairSettings::default()
        };

        assert!(settings.sanitize());
        assert_eq!(settings, CrosshairSettings::default());
    }

    #[test]
    fn sanitize_reports_no_change_for_valid_settings() {
        let mut settings = CrosshairSettings::default();
        assert!(!settings.sanitize());
    }

    #[test]
    fn snapshot_carries_render_fields() {
        let settings = CrosshairSettings {
            color: Color::rgb(255, 0, 0),
            inverted: true,
            marker_shape: MarkerShape::Arrow,
            ..CrosshairSettings::default()
        };
        let snapshot = settings.snapshot();
        assert_eq!(snapshot.color, Color::rgb(255, 0, 0));
        assert!(snapshot.inverted);
        assert_eq!(snapshot.marker_shape, MarkerShape::Arrow);
        assert_eq!(RenderSettings::default().line_width, 4);
    }
}
