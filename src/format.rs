//! Text formatting applied to overlays
//!
//! The same format drives the live editing widget and the text that is
//! finally written into the PDF. PDF output uses the standard 14 fonts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    #[default]
    Arial,
    TimesNewRoman,
    CourierNew,
}

impl FontFamily {
    pub const ALL: [FontFamily; 3] = [
        FontFamily::Arial,
        FontFamily::TimesNewRoman,
        FontFamily::CourierNew,
    ];

    /// Name shown in font pickers
    pub fn display_name(self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
        }
    }

    /// Lenient lookup by display name, unknown names fall back to Arial
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("times") || lower == "serif" {
            FontFamily::TimesNewRoman
        } else if lower.contains("courier") || lower.contains("mono") {
            FontFamily::CourierNew
        } else {
            FontFamily::Arial
        }
    }

    /// Standard 14 font for the given style
    pub fn base_font(self, bold: bool, italic: bool) -> &'static str {
        match self {
            FontFamily::TimesNewRoman => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            FontFamily::Arial => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            FontFamily::CourierNew => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
        }
    }

    /// Average glyph advance as a fraction of the font size, used to wrap
    /// text without font metrics.
    pub fn average_advance(self) -> f64 {
        match self {
            FontFamily::Arial => 0.52,
            FontFamily::TimesNewRoman => 0.47,
            FontFamily::CourierNew => 0.6,
        }
    }
}

/// Current editor formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFormat {
    #[serde(default)]
    pub family: FontFamily,
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Shown in the editor only, not written to the PDF
    #[serde(default)]
    pub underline: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_size() -> f32 {
    12.0
}

fn default_color() -> String {
    "#000000".to_string()
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            family: FontFamily::default(),
            size: default_size(),
            bold: false,
            italic: false,
            underline: false,
            color: default_color(),
        }
    }
}

impl TextFormat {
    pub const SIZES: [f32; 10] = [8.0, 9.0, 10.0, 11.0, 12.0, 14.0, 16.0, 18.0, 20.0, 24.0];

    pub fn base_font(&self) -> &'static str {
        self.family.base_font(self.bold, self.italic)
    }

    pub fn rgb(&self) -> (f32, f32, f32) {
        hex_to_rgb01(&self.color)
    }
}

/// `#RRGGBB` to components in 0..=1. Anything malformed is black.
pub fn hex_to_rgb01(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => (
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        ),
        _ => (0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(hex_to_rgb01("#FF0000"), (1.0, 0.0, 0.0));
        assert_eq!(hex_to_rgb01("00ff00"), (0.0, 1.0, 0.0));
    }

    #[test]
    fn malformed_colors_are_black() {
        assert_eq!(hex_to_rgb01("#FFF"), (0.0, 0.0, 0.0));
        assert_eq!(hex_to_rgb01("#GG0000"), (0.0, 0.0, 0.0));
        assert_eq!(hex_to_rgb01(""), (0.0, 0.0, 0.0));
        assert_eq!(hex_to_rgb01("#ééé"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn families_map_to_standard_fonts() {
        assert_eq!(FontFamily::Arial.base_font(false, false), "Helvetica");
        assert_eq!(FontFamily::TimesNewRoman.base_font(true, false), "Times-Bold");
        assert_eq!(FontFamily::CourierNew.base_font(true, true), "Courier-BoldOblique");
    }

    #[test]
    fn family_lookup_by_name() {
        for family in FontFamily::ALL {
            assert_eq!(FontFamily::from_name(family.display_name()), family);
        }
        assert_eq!(FontFamily::from_name("Comic Sans"), FontFamily::Arial);
    }

    #[test]
    fn default_format_matches_editor_defaults() {
        let format = TextFormat::default();
        assert_eq!(format.size, 12.0);
        assert_eq!(format.base_font(), "Helvetica");
        assert_eq!(format.rgb(), (0.0, 0.0, 0.0));
    }
}
