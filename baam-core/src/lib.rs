//! # BAA'AM Core
//!
//! Statistics report generator for the BAA'AM fisheries and aquaculture
//! datasets. Turns the published JSON datasets into chart regions and
//! exports the enabled ones as a paginated PDF report.
//!
//! ## Architecture
//!
//! - [`dataset`] - Dataset files and record types
//! - [`filters`] - Production filter selection
//! - [`processors`] - Aggregated series behind each chart
//! - [`chart`] - SVG chart rendering
//! - [`registry`] - Exportable regions, captions and inclusion toggles
//! - [`stage`] - Rendered regions keyed by id
//! - [`convert`] - Vector chart to PNG conversion
//! - [`rasterize`] - Fallback capture of composite regions
//! - [`layout`] - Pagination layout
//! - [`pdf`] - PDF output
//! - [`export`] - Report assembly
//! - [`config`] - Report configuration

pub mod chart;
pub mod config;
pub mod convert;
pub mod dataset;
pub mod export;
pub mod filters;
pub mod layout;
pub mod numfmt;
pub mod pdf;
pub mod processors;
pub mod rasterize;
pub mod registry;
pub mod stage;

// Re-export main types for convenient access
pub use config::{CaptureOptions, ChartSize, PageGeometry, ReportConfig, DEFAULT_FILENAME, DEFAULT_TITLE};
pub use convert::{ConvertError, RasterImage, SvgConverter, VectorConverter};
pub use dataset::{CoastalCommunity, Datasets, FishingPopulation, MarketSample, ProductionRecord};
pub use export::{CaptureKind, ExportSummary, ExportedEntry, ReportExporter, SkippedRegion};
pub use filters::{FilterKey, FilterOptions, FilterSelection};
pub use layout::{LayoutCursor, LayoutEngine, PagedLayout, Placement};
pub use pdf::PdfWriter;
pub use processors::{ProcessedStats, QuickStats};
pub use rasterize::{CompositeRasterizer, RasterizeError, RegionRasterizer};
pub use registry::{ChartRegionDescriptor, InclusionToggles, MasterState, RegionId, Registry};
pub use stage::{Composite, ImageSource, Layer, Region, RegionContent, RegionLookup, Stage, VectorChart};

/// Common result type for report operations
pub type Result<T> = std::result::Result<T, Error>;

/// Library-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("{0}")]
    Other(String),
}
