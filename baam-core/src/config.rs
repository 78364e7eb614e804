//! Report configuration (TOML).
//!
//! Every field has a default, so a partial file only overrides what it names:
//!
//! ```toml
//! title = "Reporte anual"
//!
//! [page]
//! width = 612.0
//! height = 792.0
//!
//! [capture]
//! device_pixel_ratio = 2.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TITLE: &str = "Reporte de gráficas por plataforma BAA'AM";
pub const DEFAULT_FILENAME: &str = "Reporte_BAAM.pdf";

/// Page size and pagination constants, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub side_margin: f32,
    pub top_margin: f32,
    pub bottom_margin: f32,
    /// Gap below each image
    pub spacing: f32,
    pub title_font_size: f32,
    pub caption_font_size: f32,
    /// Advance after a caption
    pub line_height: f32,
    /// Offset of the first caption, below the report title
    pub first_offset: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait with the report margins
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            side_margin: 24.0,
            top_margin: 40.0,
            bottom_margin: 40.0,
            spacing: 24.0,
            title_font_size: 24.0,
            caption_font_size: 18.0,
            line_height: 24.0,
            first_offset: 80.0,
        }
    }

    /// Width available to images
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.side_margin
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Capture options for the fallback rasterizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Output pixels per region pixel
    pub device_pixel_ratio: f32,
    /// Background as `#rrggbb`
    pub background: String,
    /// Whether images from outside the stage may be drawn
    pub allow_external: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            background: "#ffffff".to_string(),
            allow_external: true,
        }
    }
}

/// Pixel size of rendered chart regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
    pub map_height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 700,
            height: 300,
            map_height: 500,
        }
    }
}

/// Everything that shapes one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub filename: String,
    pub page: PageGeometry,
    pub capture: CaptureOptions,
    pub chart: ChartSize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            filename: DEFAULT_FILENAME.to_string(),
            page: PageGeometry::default(),
            capture: CaptureOptions::default(),
            chart: ChartSize::default(),
        }
    }
}

impl ReportConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Reject geometry that cannot hold an image column
    pub fn validate(&self) -> crate::Result<()> {
        let p = &self.page;
        if !(p.width > 0.0 && p.height > 0.0) {
            return Err(crate::Error::Other(format!(
                "Invalid page size {}x{}",
                p.width, p.height
            )));
        }
        if p.content_width() <= 0.0 {
            return Err(crate::Error::Other(format!(
                "Side margin {} leaves no room on a {}pt page",
                p.side_margin, p.width
            )));
        }
        if !(self.capture.device_pixel_ratio > 0.0) {
            return Err(crate::Error::Other(format!(
                "Invalid device pixel ratio {}",
                self.capture.device_pixel_ratio
            )));
        }
        parse_hex_color(&self.capture.background)?;
        if self.filename.trim().is_empty() {
            return Err(crate::Error::Other("Empty output filename".to_string()));
        }
        Ok(())
    }
}

/// `#rgb` or `#rrggbb` to RGB
pub fn parse_hex_color(s: &str) -> crate::Result<[u8; 3]> {
    let invalid = || crate::Error::Other(format!("Invalid colour: {}", s));
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                rgb[i] = channel(&format!("{c}{c}"))?;
            }
            Ok(rgb)
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a4_report() {
        let cfg = ReportConfig::default();
        assert_eq!(cfg.filename, "Reporte_BAAM.pdf");
        assert_eq!(cfg.page.width, 595.28);
        assert_eq!(cfg.page.content_width(), 595.28 - 48.0);
        assert_eq!(cfg.chart.width, 700);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_single_fields() {
        let cfg = ReportConfig::from_toml_str(
            r#"
            title = "Reporte anual"
            [page]
            width = 428.0
            [capture]
            device_pixel_ratio = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.title, "Reporte anual");
        assert_eq!(cfg.page.width, 428.0);
        assert_eq!(cfg.page.height, 841.89);
        assert_eq!(cfg.page.top_margin, 40.0);
        assert_eq!(cfg.capture.device_pixel_ratio, 2.0);
        assert!(cfg.capture.allow_external);
    }

    #[test]
    fn rejects_unusable_geometry() {
        assert!(ReportConfig::from_toml_str("[page]\nside_margin = 400.0").is_err());
        assert!(ReportConfig::from_toml_str("[capture]\ndevice_pixel_ratio = 0.0").is_err());
        assert!(ReportConfig::from_toml_str("[capture]\nbackground = \"white\"").is_err());
        assert!(ReportConfig::from_toml_str("title = 3").is_err());
    }

    #[test]
    fn hex_colours() {
        assert_eq!(parse_hex_color("#ffffff").unwrap(), [255, 255, 255]);
        assert_eq!(parse_hex_color("#eee").unwrap(), [0xee, 0xee, 0xee]);
        assert!(parse_hex_color("eeeeee").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.toml");
        std::fs::write(&path, "filename = \"salida.pdf\"\n").unwrap();
        assert_eq!(ReportConfig::load(&path).unwrap().filename, "salida.pdf");
    }
}
