//! Report assembly: registry walk, per-region capture, layout and output.
//!
//! Regions are processed one at a time in registry order. A region that is
//! missing from the stage or fails to convert is logged and left out; the
//! export itself only fails on output errors.

use crate::config::ReportConfig;
use crate::convert::{RasterImage, SvgConverter, VectorConverter};
use crate::layout::{LayoutEngine, PagedLayout};
use crate::pdf::PdfWriter;
use crate::rasterize::{CompositeRasterizer, RegionRasterizer};
use crate::registry::{InclusionToggles, Registry};
use crate::stage::{Region, RegionContent, RegionLookup};
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which path produced a region's image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Vector,
    Rasterized,
}

/// A captioned image that made it into the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedEntry {
    pub region_id: String,
    pub caption: String,
    pub kind: CaptureKind,
    pub page: usize,
    pub width: f32,
    pub height: f32,
}

/// An enabled region that was left out, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRegion {
    pub region_id: String,
    pub reason: String,
}

/// What one export produced
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub generated_at: DateTime<Local>,
    pub output: Option<PathBuf>,
    pub pages: usize,
    pub entries: Vec<ExportedEntry>,
    pub skipped: Vec<SkippedRegion>,
}

impl ExportSummary {
    pub fn captions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.caption.as_str()).collect()
    }
}

/// Walks the registry and lays out every captured region
pub struct ReportExporter<C = SvgConverter, R = CompositeRasterizer> {
    config: ReportConfig,
    converter: C,
    rasterizer: R,
}

impl ReportExporter {
    pub fn new(config: ReportConfig) -> Self {
        let rasterizer = CompositeRasterizer::new(config.capture.clone());
        Self {
            config,
            converter: SvgConverter::new(),
            rasterizer,
        }
    }
}

impl<C: VectorConverter, R: RegionRasterizer> ReportExporter<C, R> {
    pub fn with_components(config: ReportConfig, converter: C, rasterizer: R) -> Self {
        Self {
            config,
            converter,
            rasterizer,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Exactly one of the converter and the rasterizer runs per region
    fn capture(&self, region: &Region) -> std::result::Result<(RasterImage, CaptureKind), String> {
        match &region.content {
            RegionContent::Vector(chart) => self
                .converter
                .convert(chart)
                .map(|image| (image, CaptureKind::Vector))
                .map_err(|e| format!("conversion failed: {}", e)),
            RegionContent::Composite(composite) => self
                .rasterizer
                .rasterize(composite)
                .map(|image| (image, CaptureKind::Rasterized))
                .map_err(|e| format!("rasterization failed: {}", e)),
        }
    }

    /// Capture and place every enabled region
    pub fn assemble(
        &self,
        registry: &Registry,
        toggles: &InclusionToggles,
        stage: &dyn RegionLookup,
    ) -> (PagedLayout, ExportSummary) {
        let mut engine = LayoutEngine::new(self.config.page);
        engine.place_report_title(&self.config.title);

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for descriptor in registry.descriptors(toggles) {
            if !descriptor.enabled {
                continue;
            }
            let Some(region) = stage.find(&descriptor.region_id) else {
                log::debug!("region {} not on stage, skipped", descriptor.region_id);
                skipped.push(SkippedRegion {
                    region_id: descriptor.region_id,
                    reason: "not found".to_string(),
                });
                continue;
            };
            match self.capture(region) {
                Ok((image, kind)) => {
                    engine.place_title(&descriptor.caption);
                    let placement = engine.place_image(image);
                    log::info!(
                        "placed {} on page {} ({:.0}x{:.0} pt)",
                        descriptor.region_id,
                        placement.page + 1,
                        placement.width,
                        placement.height
                    );
                    entries.push(ExportedEntry {
                        region_id: descriptor.region_id,
                        caption: descriptor.caption,
                        kind,
                        page: placement.page,
                        width: placement.width,
                        height: placement.height,
                    });
                }
                Err(reason) => {
                    log::error!("region {}: {}", descriptor.region_id, reason);
                    skipped.push(SkippedRegion {
                        region_id: descriptor.region_id,
                        reason,
                    });
                }
            }
        }

        let layout = engine.finish();
        let summary = ExportSummary {
            generated_at: Local::now(),
            output: None,
            pages: layout.page_count(),
            entries,
            skipped,
        };
        (layout, summary)
    }

    /// Assemble and return the PDF bytes
    pub fn export_bytes(
        &self,
        registry: &Registry,
        toggles: &InclusionToggles,
        stage: &dyn RegionLookup,
    ) -> Result<(Vec<u8>, ExportSummary)> {
        let (layout, summary) = self.assemble(registry, toggles, stage);
        let bytes = PdfWriter::new(&self.config.title)
            .created_at(summary.generated_at)
            .to_bytes(&layout)?;
        Ok((bytes, summary))
    }

    /// Assemble and write the PDF to `path`
    pub fn export_to_file(
        &self,
        registry: &Registry,
        toggles: &InclusionToggles,
        stage: &dyn RegionLookup,
        path: &Path,
    ) -> Result<ExportSummary> {
        let (layout, mut summary) = self.assemble(registry, toggles, stage);
        PdfWriter::new(&self.config.title)
            .created_at(summary.generated_at)
            .save(&layout, path)?;
        log::info!(
            "wrote {} ({} pages, {} charts, {} skipped)",
            path.display(),
            summary.pages,
            summary.entries.len(),
            summary.skipped.len()
        );
        summary.output = Some(path.to_path_buf());
        Ok(summary)
    }

    /// Write the report under the configured filename in `dir`
    pub fn export_to_dir(
        &self,
        registry: &Registry,
        toggles: &InclusionToggles,
        stage: &dyn RegionLookup,
        dir: &Path,
    ) -> Result<ExportSummary> {
        self.export_to_file(registry, toggles, stage, &dir.join(&self.config.filename))
    }
}
