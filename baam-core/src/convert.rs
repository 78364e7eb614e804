//! Vector chart to PNG conversion.
//!
//! The markup goes through a `data:` URI the same way a browser image would
//! load it: namespaces are completed, the document is base64-encoded,
//! decoded and parsed, then drawn onto a transparent canvas the size of the
//! chart's bounding box.

use crate::stage::VectorChart;
use base64::{engine::general_purpose::STANDARD, Engine};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};
use std::io::Cursor;
use std::sync::{Arc, OnceLock};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const SVG_URI_PREFIX: &str = "data:image/svg+xml;base64,";
pub const PNG_URI_PREFIX: &str = "data:image/png;base64,";

static FONT_DB: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

fn system_font_db() -> Arc<fontdb::Database> {
    FONT_DB
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            log::debug!("loaded {} system font faces", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Why a vector chart could not be converted
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no drawing context for a {width}x{height} canvas")]
    NoContext { width: f32, height: f32 },

    #[error("failed to load chart image: {0}")]
    Load(String),

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("invalid PNG data: {0}")]
    Probe(#[from] image::ImageError),
}

/// A PNG image with its pixel size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RasterImage {
    /// Wrap PNG bytes, reading the size from the header
    pub fn from_png(data: Vec<u8>) -> Result<Self, ConvertError> {
        let (width, height) = image::ImageReader::with_format(Cursor::new(&data), image::ImageFormat::Png)
            .into_dimensions()?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Decode a `data:image/png;base64,` URI and probe its size
    pub fn from_data_uri(uri: &str) -> Result<Self, ConvertError> {
        let payload = uri
            .strip_prefix(PNG_URI_PREFIX)
            .ok_or_else(|| ConvertError::Load("not a PNG data URI".to_string()))?;
        let data = STANDARD
            .decode(payload)
            .map_err(|e| ConvertError::Load(e.to_string()))?;
        Self::from_png(data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("{}{}", PNG_URI_PREFIX, STANDARD.encode(&self.data))
    }

    /// Height over width
    pub fn aspect(&self) -> f32 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

/// Turns a vector chart into a raster image
pub trait VectorConverter {
    fn convert(&self, chart: &VectorChart) -> Result<RasterImage, ConvertError>;
}

/// Add the SVG and XLink namespace declarations to the root `<svg` tag when
/// they are missing. Markup without an `<svg` tag is returned unchanged.
pub fn ensure_namespaces(markup: &str) -> String {
    let Some(start) = find_svg_tag(markup) else {
        return markup.to_string();
    };
    let end = markup[start..]
        .find('>')
        .map(|i| start + i)
        .unwrap_or(markup.len());
    let tag = &markup[start..end];

    let mut attrs = String::new();
    if !tag.contains("xmlns=") {
        attrs.push_str(&format!(" xmlns=\"{}\"", SVG_NS));
    }
    if !tag.contains("xmlns:xlink=") {
        attrs.push_str(&format!(" xmlns:xlink=\"{}\"", XLINK_NS));
    }
    if attrs.is_empty() {
        return markup.to_string();
    }
    let insert_at = start + "<svg".len();
    let mut out = String::with_capacity(markup.len() + attrs.len());
    out.push_str(&markup[..insert_at]);
    out.push_str(&attrs);
    out.push_str(&markup[insert_at..]);
    out
}

fn find_svg_tag(markup: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = markup[from..].find("<svg") {
        let at = from + i;
        match markup[at + 4..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(at),
            None => return Some(at),
            _ => from = at + 4,
        }
    }
    None
}

pub fn svg_data_uri(markup: &str) -> String {
    format!("{}{}", SVG_URI_PREFIX, STANDARD.encode(markup.as_bytes()))
}

/// Decode a `data:image/svg+xml;base64,` URI back to document bytes
pub fn decode_svg_data_uri(uri: &str) -> Result<Vec<u8>, ConvertError> {
    let payload = uri
        .strip_prefix(SVG_URI_PREFIX)
        .ok_or_else(|| ConvertError::Load("not an SVG data URI".to_string()))?;
    STANDARD
        .decode(payload)
        .map_err(|e| ConvertError::Load(e.to_string()))
}

/// resvg-backed converter
#[derive(Debug, Clone)]
pub struct SvgConverter {
    system_fonts: bool,
}

impl Default for SvgConverter {
    fn default() -> Self {
        Self { system_fonts: true }
    }
}

impl SvgConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip system font discovery; text is then not drawn
    pub fn without_system_fonts() -> Self {
        Self {
            system_fonts: false,
        }
    }

    fn options(&self) -> Options<'static> {
        let mut opts = Options::default();
        if self.system_fonts {
            opts.fontdb = system_font_db();
        }
        opts
    }

    /// Convert to a `data:image/png;base64,` URI
    pub fn to_png_data_uri(&self, chart: &VectorChart) -> Result<String, ConvertError> {
        let uri = svg_data_uri(&ensure_namespaces(&chart.markup));
        let document = decode_svg_data_uri(&uri)?;
        let tree = Tree::from_data(&document, &self.options())
            .map_err(|e| ConvertError::Load(e.to_string()))?;

        let no_context = || ConvertError::NoContext {
            width: chart.width,
            height: chart.height,
        };
        if !(chart.width >= 1.0 && chart.height >= 1.0) {
            return Err(no_context());
        }
        let width = chart.width.ceil() as u32;
        let height = chart.height.ceil() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(no_context)?;

        let size = tree.size();
        let transform = Transform::from_scale(
            chart.width / size.width(),
            chart.height / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let png = pixmap
            .encode_png()
            .map_err(|e| ConvertError::Encode(e.to_string()))?;
        Ok(format!("{}{}", PNG_URI_PREFIX, STANDARD.encode(png)))
    }
}

impl VectorConverter for SvgConverter {
    fn convert(&self, chart: &VectorChart) -> Result<RasterImage, ConvertError> {
        RasterImage::from_data_uri(&self.to_png_data_uri(chart)?)
    }
}
