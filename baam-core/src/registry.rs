//! Chart region registry and inclusion toggles.
//!
//! The registry is a fixed, ordered list of exportable regions. Each export
//! builds its descriptors fresh from an [`InclusionToggles`] snapshot, so the
//! order of the registry is the order of the report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exportable regions of the statistics page, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionId {
    ProdAnual,
    ProdEntidad,
    PreciosTipo,
    DistribEstab,
    PrecioRest,
    PrecioPescad,
    Tratamiento,
    NumEspecies,
    PobCostera,
    Pescadores,
    Genero,
    MapUnid,
    KeplerMap,
}

impl RegionId {
    pub const ALL: [RegionId; 13] = [
        RegionId::ProdAnual,
        RegionId::ProdEntidad,
        RegionId::PreciosTipo,
        RegionId::DistribEstab,
        RegionId::PrecioRest,
        RegionId::PrecioPescad,
        RegionId::Tratamiento,
        RegionId::NumEspecies,
        RegionId::PobCostera,
        RegionId::Pescadores,
        RegionId::Genero,
        RegionId::MapUnid,
        RegionId::KeplerMap,
    ];

    /// Stage id of the region container
    pub fn dom_id(self) -> &'static str {
        match self {
            RegionId::ProdAnual => "offscreen_chartProdAnual",
            RegionId::ProdEntidad => "offscreen_chartProdEntidad",
            RegionId::PreciosTipo => "offscreen_chartPreciosTipo",
            RegionId::DistribEstab => "offscreen_chartDistribEstab",
            RegionId::PrecioRest => "offscreen_chartPrecioRest",
            RegionId::PrecioPescad => "offscreen_chartPrecioPescad",
            RegionId::Tratamiento => "offscreen_chartTratamiento",
            RegionId::NumEspecies => "offscreen_chartNumEspecies",
            RegionId::PobCostera => "offscreen_chartPobCostera",
            RegionId::Pescadores => "offscreen_chartPescadores",
            RegionId::Genero => "offscreen_chartGenero",
            RegionId::MapUnid => "offscreen_mapUnid",
            RegionId::KeplerMap => "offscreen_keplerMap",
        }
    }

    /// Short name used on the command line
    pub fn slug(self) -> &'static str {
        match self {
            RegionId::ProdAnual => "prod-anual",
            RegionId::ProdEntidad => "prod-entidad",
            RegionId::PreciosTipo => "precios-tipo",
            RegionId::DistribEstab => "distrib-estab",
            RegionId::PrecioRest => "precio-rest",
            RegionId::PrecioPescad => "precio-pescad",
            RegionId::Tratamiento => "tratamiento",
            RegionId::NumEspecies => "num-especies",
            RegionId::PobCostera => "pob-costera",
            RegionId::Pescadores => "pescadores",
            RegionId::Genero => "genero",
            RegionId::MapUnid => "map-unid",
            RegionId::KeplerMap => "kepler-map",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            RegionId::ProdAnual => "Producción por Año",
            RegionId::ProdEntidad => "Producción por Entidad",
            RegionId::PreciosTipo => "Precio promedio por Tipo de establecimiento",
            RegionId::DistribEstab => "Distribución de muestras",
            RegionId::PrecioRest => "Precio por especie – Restaurantes",
            RegionId::PrecioPescad => "Precio por especie – Pescaderías",
            RegionId::Tratamiento => "Precio por tratamiento y especie",
            RegionId::NumEspecies => "Número de especies por estado",
            RegionId::PobCostera => "Población costera – Top 10 estados",
            RegionId::Pescadores => "Pescadores registrados – Top 10",
            RegionId::Genero => "Proporción total Hombres/Mujeres",
            RegionId::MapUnid => "Unidades de producción",
            RegionId::KeplerMap => "Cobertura geoespacial",
        }
    }

    /// Map regions are excluded from the default selection and from "select all"
    pub fn is_map(self) -> bool {
        matches!(self, RegionId::MapUnid | RegionId::KeplerMap)
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.slug() == slug)
    }

    pub fn from_dom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.dom_id() == id)
    }

    /// The eleven chart regions
    pub fn charts() -> impl Iterator<Item = RegionId> {
        Self::ALL.into_iter().filter(|r| !r.is_map())
    }
}

/// State of the "select all" master checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterState {
    All,
    None,
    Indeterminate,
}

/// Snapshot of which regions are included, keyed by stage id.
///
/// Ids missing from the snapshot count as disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionToggles {
    toggles: BTreeMap<String, bool>,
}

impl Default for InclusionToggles {
    fn default() -> Self {
        let toggles = RegionId::ALL
            .into_iter()
            .map(|r| (r.dom_id().to_string(), !r.is_map()))
            .collect();
        Self { toggles }
    }
}

impl InclusionToggles {
    /// Snapshot with every id disabled
    pub fn none() -> Self {
        Self {
            toggles: BTreeMap::new(),
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.toggles.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: impl Into<String>, enabled: bool) {
        self.toggles.insert(id.into(), enabled);
    }

    pub fn with(mut self, id: impl Into<String>, enabled: bool) -> Self {
        self.set(id, enabled);
        self
    }

    pub fn set_region(&mut self, region: RegionId, enabled: bool) {
        self.set(region.dom_id(), enabled);
    }

    /// Set every chart toggle at once; map toggles are left alone
    pub fn select_all(&mut self, enabled: bool) {
        for region in RegionId::charts() {
            self.set_region(region, enabled);
        }
    }

    pub fn master_state(&self) -> MasterState {
        let selected = RegionId::charts()
            .filter(|r| self.is_enabled(r.dom_id()))
            .count();
        match selected {
            0 => MasterState::None,
            n if n == RegionId::charts().count() => MasterState::All,
            _ => MasterState::Indeterminate,
        }
    }

    pub fn enabled_ids(&self) -> impl Iterator<Item = &str> {
        self.toggles
            .iter()
            .filter(|(_, on)| **on)
            .map(|(id, _)| id.as_str())
    }
}

/// One registry entry resolved against a toggle snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRegionDescriptor {
    pub enabled: bool,
    pub region_id: String,
    pub caption: String,
}

/// Ordered list of exportable regions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<(String, String)>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// The thirteen regions of the statistics page
    pub fn standard() -> Self {
        Self {
            entries: RegionId::ALL
                .into_iter()
                .map(|r| (r.dom_id().to_string(), r.caption().to_string()))
                .collect(),
        }
    }

    /// Registry over arbitrary `(region id, caption)` pairs, in the given order
    pub fn from_entries<I, A, B>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(id, caption)| (id.into(), caption.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors for this export, in registry order
    pub fn descriptors(&self, toggles: &InclusionToggles) -> Vec<ChartRegionDescriptor> {
        self.entries
            .iter()
            .map(|(id, caption)| ChartRegionDescriptor {
                enabled: toggles.is_enabled(id),
                region_id: id.clone(),
                caption: caption.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_keeps_page_order() {
        let descriptors = Registry::standard().descriptors(&InclusionToggles::default());
        assert_eq!(descriptors.len(), 13);
        assert_eq!(descriptors[0].region_id, "offscreen_chartProdAnual");
        assert_eq!(descriptors[0].caption, "Producción por Año");
        assert_eq!(descriptors[10].region_id, "offscreen_chartGenero");
        assert_eq!(descriptors[12].region_id, "offscreen_keplerMap");
    }

    #[test]
    fn default_toggles_enable_charts_only() {
        let toggles = InclusionToggles::default();
        assert!(toggles.is_enabled("offscreen_chartPescadores"));
        assert!(!toggles.is_enabled("offscreen_mapUnid"));
        assert!(!toggles.is_enabled("offscreen_keplerMap"));
        assert_eq!(toggles.master_state(), MasterState::All);
    }

    #[test]
    fn unknown_ids_are_disabled() {
        let toggles = InclusionToggles::default();
        let registry = Registry::from_entries([("nope", "Nada")]);
        assert!(!registry.descriptors(&toggles)[0].enabled);
    }

    #[test]
    fn master_state_tracks_chart_toggles() {
        let mut toggles = InclusionToggles::default();
        toggles.set_region(RegionId::Genero, false);
        assert_eq!(toggles.master_state(), MasterState::Indeterminate);
        toggles.select_all(false);
        assert_eq!(toggles.master_state(), MasterState::None);
        toggles.set_region(RegionId::MapUnid, true);
        assert_eq!(toggles.master_state(), MasterState::None);
        toggles.select_all(true);
        assert_eq!(toggles.master_state(), MasterState::All);
        assert!(toggles.is_enabled("offscreen_mapUnid"));
    }

    #[test]
    fn slugs_resolve_both_ways() {
        for region in RegionId::ALL {
            assert_eq!(RegionId::from_slug(region.slug()), Some(region));
            assert_eq!(RegionId::from_dom_id(region.dom_id()), Some(region));
        }
        assert_eq!(RegionId::from_slug("bogus"), None);
    }

    #[test]
    fn snapshot_is_independent_of_later_changes() {
        let mut toggles = InclusionToggles::default();
        let descriptors = Registry::standard().descriptors(&toggles);
        toggles.select_all(false);
        assert!(descriptors.iter().take(11).all(|d| d.enabled));
    }
}
