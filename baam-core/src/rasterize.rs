//! Fallback capture of regions that hold no vector chart.
//!
//! Layers are painted in region-local coordinates at the device pixel ratio
//! over an opaque background, so where a region sits on the page never
//! affects the capture.

use crate::config::{parse_hex_color, CaptureOptions};
use crate::convert::RasterImage;
use crate::stage::{Composite, ImageSource, Layer};
use image::{imageops, Rgba, RgbaImage};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("region has no area ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },

    #[error("invalid capture background: {0}")]
    Background(String),

    #[error("failed to decode inline image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Captures a composite region as a raster image
pub trait RegionRasterizer {
    fn rasterize(&self, composite: &Composite) -> Result<RasterImage, RasterizeError>;
}

/// `image`-backed rasterizer
#[derive(Debug, Clone, Default)]
pub struct CompositeRasterizer {
    options: CaptureOptions,
}

impl CompositeRasterizer {
    pub fn new(options: CaptureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    fn scale(&self) -> f32 {
        self.options.device_pixel_ratio
    }

    /// Pixel rectangle of a layer, clipped to the canvas
    fn pixel_rect(&self, x: f32, y: f32, w: f32, h: f32, canvas: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let s = self.scale();
        let x0 = (x * s).round().max(0.0) as u32;
        let y0 = (y * s).round().max(0.0) as u32;
        let x1 = (((x + w) * s).round().max(0.0) as u32).min(canvas.width());
        let y1 = (((y + h) * s).round().max(0.0) as u32).min(canvas.height());
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1 - x0, y1 - y0))
    }

    fn load_image(&self, source: &ImageSource) -> Result<Option<image::DynamicImage>, RasterizeError> {
        match source {
            ImageSource::Inline(bytes) => image::load_from_memory(bytes)
                .map(Some)
                .map_err(RasterizeError::Decode),
            ImageSource::External(path) => {
                if !self.options.allow_external {
                    log::debug!("external image {} not permitted", path.display());
                    return Ok(None);
                }
                match image::open(path) {
                    Ok(img) => Ok(Some(img)),
                    Err(e) => {
                        log::warn!("external image {} left blank: {}", path.display(), e);
                        Ok(None)
                    }
                }
            }
        }
    }
}

impl RegionRasterizer for CompositeRasterizer {
    fn rasterize(&self, composite: &Composite) -> Result<RasterImage, RasterizeError> {
        if composite.width == 0 || composite.height == 0 {
            return Err(RasterizeError::EmptyRegion {
                width: composite.width,
                height: composite.height,
            });
        }
        let [r, g, b] = parse_hex_color(&self.options.background)
            .map_err(|e| RasterizeError::Background(e.to_string()))?;
        let width = (composite.width as f32 * self.scale()).ceil().max(1.0) as u32;
        let height = (composite.height as f32 * self.scale()).ceil().max(1.0) as u32;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));

        for layer in &composite.layers {
            match layer {
                Layer::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let Some((px, py, pw, ph)) = self.pixel_rect(*x, *y, *width, *height, &canvas) else {
                        continue;
                    };
                    let [r, g, b] = *color;
                    for yy in py..py + ph {
                        for xx in px..px + pw {
                            canvas.put_pixel(xx, yy, Rgba([r, g, b, 255]));
                        }
                    }
                }
                Layer::Image {
                    x,
                    y,
                    width,
                    height,
                    source,
                } => {
                    let Some(img) = self.load_image(source)? else {
                        continue;
                    };
                    let s = self.scale();
                    let pw = (width * s).round() as u32;
                    let ph = (height * s).round() as u32;
                    if pw == 0 || ph == 0 {
                        continue;
                    }
                    let scaled = imageops::resize(&img.to_rgba8(), pw, ph, imageops::FilterType::Triangle);
                    imageops::overlay(
                        &mut canvas,
                        &scaled,
                        (x * s).round() as i64,
                        (y * s).round() as i64,
                    );
                }
            }
        }

        let mut data = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .map_err(RasterizeError::Encode)?;
        Ok(RasterImage {
            data,
            width,
            height,
        })
    }
}
