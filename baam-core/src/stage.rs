//! The stage: named regions holding what each exportable chart looks like.
//!
//! A region is either a vector chart (SVG markup and its bounding box) or a
//! composite of raster layers, which only the fallback rasterizer can
//! capture. Only regions whose toggle is on are rendered, so a disabled
//! toggle leaves no region behind.

use crate::chart::{
    BarChart, BarSeries, PieChart, AMBER_500, BLUE_500, CYAN_500, EMERALD_500, PALETTE, PINK_500,
};
use crate::config::{ChartSize, ReportConfig};
use crate::dataset::Datasets;
use crate::filters::FilterSelection;
use crate::processors::ProcessedStats;
use crate::registry::{InclusionToggles, RegionId};
use crate::Result;
use plotters::style::RGBColor;
use std::path::{Path, PathBuf};

/// Items per chart page on the statistics page
const PRODUCTION_PAGE: usize = 5;
const PRICE_PAGE: usize = 7;

pub const MAP_UNITS_IMAGE: &str = "mapa_unidades.png";
pub const KEPLER_IMAGE: &str = "kepler_map.png";

const MAP_PANEL: [u8; 3] = [0xee, 0xee, 0xee];
const EMPTY_PANEL: [u8; 3] = [0xf3, 0xf4, 0xf6];
const EMPTY_BAR: [u8; 3] = [0xd1, 0xd5, 0xdb];

/// SVG markup with the bounding box it is drawn into
#[derive(Debug, Clone, PartialEq)]
pub struct VectorChart {
    pub markup: String,
    pub width: f32,
    pub height: f32,
}

/// Pixels of a composite image layer
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Encoded image bytes owned by the stage
    Inline(Vec<u8>),
    /// Image file outside the stage
    External(PathBuf),
}

/// One drawing step of a composite region, in region pixels
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [u8; 3],
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: ImageSource,
    },
}

/// Layers drawn in order over the capture background
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionContent {
    Vector(VectorChart),
    Composite(Composite),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub content: RegionContent,
}

impl Region {
    pub fn vector(id: impl Into<String>, chart: VectorChart) -> Self {
        Self {
            id: id.into(),
            content: RegionContent::Vector(chart),
        }
    }

    pub fn composite(id: impl Into<String>, composite: Composite) -> Self {
        Self {
            id: id.into(),
            content: RegionContent::Composite(composite),
        }
    }

    /// The vector chart inside this region, if it holds one
    pub fn vector_chart(&self) -> Option<&VectorChart> {
        match &self.content {
            RegionContent::Vector(chart) => Some(chart),
            RegionContent::Composite(_) => None,
        }
    }
}

/// Finds regions by id
pub trait RegionLookup {
    fn find(&self, id: &str) -> Option<&Region>;
}

/// Regions in insertion order
#[derive(Debug, Clone, Default)]
pub struct Stage {
    regions: Vec<Region>,
}

impl RegionLookup for Stage {
    fn find(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, replacing any region with the same id
    pub fn insert(&mut self, region: Region) {
        match self.regions.iter_mut().find(|r| r.id == region.id) {
            Some(existing) => *existing = region,
            None => self.regions.push(region),
        }
    }

    pub fn with(mut self, region: Region) -> Self {
        self.insert(region);
        self
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Render every enabled region of the statistics page.
    ///
    /// `assets_dir` is where map images are looked up; without it maps are
    /// plain panels.
    pub fn build(
        data: &Datasets,
        filters: &FilterSelection,
        toggles: &InclusionToggles,
        config: &ReportConfig,
        assets_dir: Option<&Path>,
    ) -> Result<Self> {
        let stats = ProcessedStats::compute(data, filters);
        let mut stage = Stage::new();
        for region in RegionId::ALL {
            if !toggles.is_enabled(region.dom_id()) {
                continue;
            }
            stage.insert(build_region(region, &stats, config.chart, assets_dir)?);
            log::debug!("rendered region {}", region.dom_id());
        }
        Ok(stage)
    }
}

/// Render one region from processed statistics
pub fn build_region(
    region: RegionId,
    stats: &ProcessedStats,
    size: ChartSize,
    assets_dir: Option<&Path>,
) -> Result<Region> {
    let id = region.dom_id();
    if region.is_map() {
        let file = match region {
            RegionId::MapUnid => MAP_UNITS_IMAGE,
            _ => KEPLER_IMAGE,
        };
        return Ok(Region::composite(
            id,
            map_panel(size, assets_dir.map(|d| d.join(file))),
        ));
    }
    match render_chart(region, stats, size)? {
        Some(markup) => Ok(Region::vector(
            id,
            VectorChart {
                markup,
                width: size.width as f32,
                height: size.height as f32,
            },
        )),
        None => Ok(Region::composite(id, empty_panel(size))),
    }
}

fn labels<T>(rows: &[T], f: impl Fn(&T) -> &str) -> Vec<String> {
    rows.iter().map(|r| f(r).to_string()).collect()
}

fn single_bars(categories: Vec<String>, name: &str, color: RGBColor, values: Vec<f64>) -> BarChart {
    BarChart::new(categories).series(BarSeries::new(name, color, values))
}

/// SVG for a chart region, or `None` when production data is missing
pub fn render_chart(region: RegionId, stats: &ProcessedStats, size: ChartSize) -> Result<Option<String>> {
    let (w, h) = (size.width, size.height);
    let chart = match region {
        RegionId::ProdAnual => {
            if stats.production_by_year.is_empty() {
                return Ok(None);
            }
            let rows = &stats.production_by_year[..stats.production_by_year.len().min(PRODUCTION_PAGE)];
            BarChart::new(labels(rows, |r| r.year.as_str()))
                .series(BarSeries::new("Captura", BLUE_500, rows.iter().map(|r| r.captura).collect()))
                .series(BarSeries::new(
                    "Acuacultura",
                    EMERALD_500,
                    rows.iter().map(|r| r.acuacultura).collect(),
                ))
                .with_legend()
        }
        RegionId::ProdEntidad => {
            if stats.production_by_entity.is_empty() {
                return Ok(None);
            }
            let rows = &stats.production_by_entity[..stats.production_by_entity.len().min(PRODUCTION_PAGE)];
            single_bars(
                labels(rows, |r| r.entidad.as_str()),
                "Peso (kg)",
                CYAN_500,
                rows.iter().map(|r| r.peso).collect(),
            )
            .rotated_labels()
        }
        RegionId::PreciosTipo => {
            let rows = &stats.price_by_establishment[..stats.price_by_establishment.len().min(PRICE_PAGE)];
            single_bars(
                labels(rows, |r| r.tipo.as_str()),
                "MXN/kg",
                EMERALD_500,
                rows.iter().map(|r| r.promedio).collect(),
            )
        }
        RegionId::DistribEstab => {
            let slices = stats
                .price_by_establishment
                .iter()
                .map(|r| (r.tipo.clone(), r.count as f64))
                .collect();
            return PieChart::new(slices).render_svg(w, h).map(Some);
        }
        RegionId::PrecioRest => {
            let rows = &stats.price_by_species_restaurants
                [..stats.price_by_species_restaurants.len().min(PRICE_PAGE)];
            single_bars(
                labels(rows, |r| r.especie.as_str()),
                "MXN/kg",
                AMBER_500,
                rows.iter().map(|r| r.promedio).collect(),
            )
            .rotated_labels()
        }
        RegionId::PrecioPescad => {
            let rows = &stats.price_by_species_fish_shops
                [..stats.price_by_species_fish_shops.len().min(PRICE_PAGE)];
            single_bars(
                labels(rows, |r| r.especie.as_str()),
                "MXN/kg",
                EMERALD_500,
                rows.iter().map(|r| r.promedio).collect(),
            )
            .rotated_labels()
        }
        RegionId::Tratamiento => {
            let rows = &stats.price_by_treatment[..stats.price_by_treatment.len().min(PRICE_PAGE)];
            // colours follow the order treatments first appear in the full series
            let mut treatments: Vec<&str> = Vec::new();
            for row in &stats.price_by_treatment {
                if !treatments.contains(&row.tratamiento.as_str()) {
                    treatments.push(&row.tratamiento);
                }
            }
            let color_of = |t: &str| {
                let idx = treatments.iter().position(|x| *x == t).unwrap_or(0);
                PALETTE[idx % PALETTE.len()]
            };
            let colors = rows.iter().map(|r| color_of(&r.tratamiento)).collect();
            let mut legend: Vec<(String, RGBColor)> = Vec::new();
            for row in rows {
                if !legend.iter().any(|(name, _)| *name == row.tratamiento) {
                    legend.push((row.tratamiento.clone(), color_of(&row.tratamiento)));
                }
            }
            single_bars(
                labels(rows, |r| r.especie.as_str()),
                "MXN/kg",
                PALETTE[0],
                rows.iter().map(|r| r.promedio).collect(),
            )
            .colored_bars(colors, legend)
            .rotated_labels()
        }
        RegionId::NumEspecies => {
            let rows = &stats.species_per_state[..stats.species_per_state.len().min(PRICE_PAGE)];
            single_bars(
                labels(rows, |r| r.estado.as_str()),
                "Número de especies",
                AMBER_500,
                rows.iter().map(|r| r.count as f64).collect(),
            )
            .rotated_labels()
        }
        RegionId::PobCostera => BarChart::new(labels(&stats.demographics, |r| r.estado.as_str()))
            .series(BarSeries::new(
                "Hombres",
                BLUE_500,
                stats.demographics.iter().map(|r| r.hombres as f64).collect(),
            ))
            .series(BarSeries::new(
                "Mujeres",
                PINK_500,
                stats.demographics.iter().map(|r| r.mujeres as f64).collect(),
            ))
            .stacked()
            .rotated_labels()
            .with_legend(),
        RegionId::Pescadores => single_bars(
            labels(&stats.fishers, |r| r.entidad.as_str()),
            "Pescadores",
            AMBER_500,
            stats.fishers.iter().map(|r| r.pescadores as f64).collect(),
        )
        .rotated_labels(),
        RegionId::Genero => {
            let gender = stats.gender.unwrap_or_default();
            return PieChart::new(vec![
                ("Hombres".to_string(), gender.hombres as f64),
                ("Mujeres".to_string(), gender.mujeres as f64),
            ])
            .colors(vec![BLUE_500, PINK_500])
            .render_svg(w, h)
            .map(Some);
        }
        RegionId::MapUnid | RegionId::KeplerMap => return Ok(None),
    };
    chart.render_svg(w, h).map(Some)
}

/// Grey "no data" panel standing in for an empty production chart
fn empty_panel(size: ChartSize) -> Composite {
    let (w, h) = (size.width as f32, size.height as f32);
    Composite {
        width: size.width,
        height: size.height,
        layers: vec![
            Layer::Fill {
                x: 0.0,
                y: 0.0,
                width: w,
                height: h,
                color: EMPTY_PANEL,
            },
            Layer::Fill {
                x: w * 0.1,
                y: h / 2.0 - 1.0,
                width: w * 0.8,
                height: 2.0,
                color: EMPTY_BAR,
            },
        ],
    }
}

fn map_panel(size: ChartSize, image: Option<PathBuf>) -> Composite {
    let (w, h) = (size.width as f32, size.map_height as f32);
    let mut layers = vec![Layer::Fill {
        x: 0.0,
        y: 0.0,
        width: w,
        height: h,
        color: MAP_PANEL,
    }];
    match image {
        Some(path) if path.is_file() => layers.push(Layer::Image {
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
            source: ImageSource::External(path),
        }),
        Some(path) => log::debug!("map image {} not found", path.display()),
        None => {}
    }
    Composite {
        width: size.width,
        height: size.map_height,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MarketSample, ProductionRecord};

    fn datasets() -> Datasets {
        Datasets {
            production: vec![ProductionRecord {
                entidad: "SONORA".into(),
                especie: "CAMARON".into(),
                ano: 2020,
                origen: "CAPTURA".into(),
                peso_kg: 1200.0,
                valor_mxn: 50000.0,
            }],
            market: vec![MarketSample {
                lugar_colecta: Some("Yucatán".into()),
                nombre_comun: "Mero".into(),
                nombre_cientifico: String::new(),
                precio: "250".into(),
                tipo_establecimiento: "Restaurante".into(),
                tratamiento: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn build_renders_only_enabled_regions() {
        let toggles = InclusionToggles::none()
            .with(RegionId::ProdAnual.dom_id(), true)
            .with(RegionId::Genero.dom_id(), true);
        let stage = Stage::build(
            &datasets(),
            &FilterSelection::default(),
            &toggles,
            &ReportConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(stage.len(), 2);
        let prod = stage.find("offscreen_chartProdAnual").unwrap();
        let chart = prod.vector_chart().unwrap();
        assert!(chart.markup.contains("<svg"));
        assert_eq!((chart.width, chart.height), (700.0, 300.0));
        assert!(stage.find("offscreen_chartPescadores").is_none());
    }

    #[test]
    fn empty_production_renders_placeholder() {
        let data = Datasets::default();
        let region = build_region(
            RegionId::ProdEntidad,
            &ProcessedStats::compute(&data, &FilterSelection::default()),
            ChartSize::default(),
            None,
        )
        .unwrap();
        assert!(region.vector_chart().is_none());
        match region.content {
            RegionContent::Composite(c) => assert_eq!(c.layers.len(), 2),
            RegionContent::Vector(_) => panic!("expected placeholder"),
        }
    }

    #[test]
    fn map_region_picks_up_external_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MAP_UNITS_IMAGE), b"png").unwrap();
        let stats = ProcessedStats::default();
        let with_image =
            build_region(RegionId::MapUnid, &stats, ChartSize::default(), Some(dir.path())).unwrap();
        let without =
            build_region(RegionId::KeplerMap, &stats, ChartSize::default(), Some(dir.path())).unwrap();
        match (with_image.content, without.content) {
            (RegionContent::Composite(a), RegionContent::Composite(b)) => {
                assert_eq!(a.height, 500);
                assert!(matches!(
                    a.layers.last(),
                    Some(Layer::Image { source: ImageSource::External(_), .. })
                ));
                assert_eq!(b.layers.len(), 1);
            }
            _ => panic!("maps are composites"),
        }
    }

    #[test]
    fn insert_replaces_same_id() {
        let chart = VectorChart {
            markup: "<svg/>".into(),
            width: 10.0,
            height: 10.0,
        };
        let stage = Stage::new()
            .with(Region::vector("a", chart.clone()))
            .with(Region::vector("b", chart.clone()))
            .with(Region::composite(
                "a",
                Composite {
                    width: 1,
                    height: 1,
                    layers: Vec::new(),
                },
            ));
        assert_eq!(stage.len(), 2);
        assert!(stage.find("a").unwrap().vector_chart().is_none());
        assert_eq!(stage.iter().next().map(|r| r.id.as_str()), Some("a"));
    }
}
