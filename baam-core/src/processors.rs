//! Statistic series computed from the raw datasets.
//!
//! Each function returns the rows one chart plots. Groupings keep
//! first-seen order before any sort, so ties sort deterministically.

use crate::dataset::{
    parse_leading_float, parse_leading_int, CoastalCommunity, Datasets, FishingPopulation,
    MarketSample, ProductionRecord,
};
use crate::filters::{FilterKey, FilterSelection};
use crate::numfmt::group_thousands;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Top-N cut used for state rankings
pub const TOP_STATES: usize = 10;
/// Top-N cut used for species rankings
pub const TOP_SPECIES: usize = 15;

/// Landed weight per year, split by origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionByYear {
    pub year: String,
    pub captura: f64,
    pub acuacultura: f64,
}

/// Landed weight and value per entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionByEntity {
    pub entidad: String,
    pub peso: f64,
    pub valor: f64,
}

/// Coastal population per state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDemographics {
    pub estado: String,
    pub hombres: i64,
    pub mujeres: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FishersByEntity {
    pub entidad: String,
    pub pescadores: i64,
}

/// Average price per establishment type, with its sample count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstablishmentPrice {
    pub tipo: String,
    pub total: f64,
    pub count: usize,
    pub promedio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesPrice {
    pub especie: String,
    pub promedio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentSpeciesPrice {
    pub tratamiento: String,
    pub especie: String,
    pub promedio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesPerState {
    pub estado: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenderTotals {
    pub hombres: i64,
    pub mujeres: i64,
}

/// Headline figures shown above the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickStats {
    pub produccion: String,
    pub valor: String,
    pub pescadores: String,
    pub especies: String,
}

/// Accumulator keyed by string that remembers first-seen order
struct Grouped<V> {
    index: HashMap<String, usize>,
    rows: Vec<V>,
}

impl<V> Grouped<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.rows.push(init());
                self.index.insert(key.to_string(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        &mut self.rows[idx]
    }

    fn into_rows(self) -> Vec<V> {
        self.rows
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn is_capture(origen: &str) -> bool {
    normalize(origen) == "captura"
}

fn normalized_origin(origen: &str) -> &'static str {
    if is_capture(origen) {
        "Captura"
    } else {
        "Acuacultura"
    }
}

fn keep(record: &ProductionRecord, filters: &FilterSelection, keys: &[FilterKey]) -> bool {
    keys.iter().all(|&key| {
        if filters.is_all(key) {
            return true;
        }
        let selected = filters.values(key);
        match key {
            FilterKey::Entidades => selected.iter().any(|v| *v == record.entidad),
            FilterKey::Especies => selected.iter().any(|v| *v == record.especie),
            FilterKey::Anos => {
                let year = record.ano.to_string();
                selected.iter().any(|v| *v == year)
            }
            FilterKey::Origenes => {
                let origin = normalize(normalized_origin(&record.origen));
                selected.iter().any(|v| normalize(v) == origin)
            }
        }
    })
}

/// Capture and aquaculture weight per year, ascending by year.
pub fn production_by_year(
    records: &[ProductionRecord],
    filters: &FilterSelection,
) -> Vec<ProductionByYear> {
    let keys = [
        FilterKey::Entidades,
        FilterKey::Especies,
        FilterKey::Anos,
        FilterKey::Origenes,
    ];
    let mut by_year = Grouped::new();
    for r in records.iter().filter(|r| keep(r, filters, &keys)) {
        let year = r.ano.to_string();
        let row = by_year.entry(&year, || ProductionByYear {
            year: year.clone(),
            captura: 0.0,
            acuacultura: 0.0,
        });
        if is_capture(&r.origen) {
            row.captura += r.peso_kg;
        } else {
            row.acuacultura += r.peso_kg;
        }
    }
    let mut rows = by_year.into_rows();
    rows.sort_by_key(|r| r.year.parse::<i64>().unwrap_or(0));
    rows
}

/// Top entities by landed weight. The entity filter does not apply here.
pub fn production_by_entity(
    records: &[ProductionRecord],
    filters: &FilterSelection,
) -> Vec<ProductionByEntity> {
    let keys = [FilterKey::Especies, FilterKey::Anos, FilterKey::Origenes];
    let mut by_entity = Grouped::new();
    for r in records.iter().filter(|r| keep(r, filters, &keys)) {
        let row = by_entity.entry(&r.entidad, || ProductionByEntity {
            entidad: r.entidad.clone(),
            peso: 0.0,
            valor: 0.0,
        });
        row.peso += r.peso_kg;
        row.valor += r.valor_mxn;
    }
    let mut rows = by_entity.into_rows();
    rows.sort_by(|a, b| b.peso.total_cmp(&a.peso));
    rows.truncate(TOP_STATES);
    rows
}

/// Top states by coastal population
pub fn demographics(communities: &[CoastalCommunity]) -> Vec<StateDemographics> {
    let mut by_state = Grouped::new();
    for c in communities {
        let row = by_state.entry(&c.entidad, || StateDemographics {
            estado: c.entidad.clone(),
            hombres: 0,
            mujeres: 0,
            total: 0,
        });
        row.hombres += parse_leading_int(&c.hombres);
        row.mujeres += parse_leading_int(&c.mujeres);
        row.total = row.hombres + row.mujeres;
    }
    let mut rows = by_state.into_rows();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows.truncate(TOP_STATES);
    rows
}

/// Men and women summed over the demographic ranking
pub fn gender_totals(demographics: &[StateDemographics]) -> GenderTotals {
    GenderTotals {
        hombres: demographics.iter().map(|d| d.hombres).sum(),
        mujeres: demographics.iter().map(|d| d.mujeres).sum(),
    }
}

fn fishers_count(row: &FishingPopulation) -> i64 {
    parse_leading_int(&row.total_pescadores.replace(',', ""))
}

/// Top entities by registered fishers
pub fn fishers_by_entity(rows: &[FishingPopulation]) -> Vec<FishersByEntity> {
    let mut out: Vec<FishersByEntity> = rows
        .iter()
        .map(|r| FishersByEntity {
            entidad: r.entidad.clone(),
            pescadores: fishers_count(r),
        })
        .collect();
    out.sort_by(|a, b| b.pescadores.cmp(&a.pescadores));
    out.truncate(TOP_STATES);
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn price(sample: &MarketSample) -> f64 {
    parse_leading_float(&sample.precio)
}

/// Average price per establishment type. Types are trimmed, lower-cased and
/// capitalised so spelling variants merge; rows without a type are skipped.
pub fn price_by_establishment(samples: &[MarketSample]) -> Vec<EstablishmentPrice> {
    let mut by_type = Grouped::new();
    for s in samples {
        let tipo = normalize(&s.tipo_establecimiento);
        if tipo.is_empty() {
            continue;
        }
        let tipo = capitalize(&tipo);
        let row = by_type.entry(&tipo, || EstablishmentPrice {
            tipo: tipo.clone(),
            total: 0.0,
            count: 0,
            promedio: 0.0,
        });
        row.total += price(s);
        row.count += 1;
        row.promedio = row.total / row.count as f64;
    }
    by_type.into_rows()
}

fn price_by_species_where(samples: &[MarketSample], pattern: &str) -> Vec<SpeciesPrice> {
    let mut by_species: Grouped<(String, f64, usize)> = Grouped::new();
    for s in samples
        .iter()
        .filter(|s| s.tipo_establecimiento.to_lowercase().contains(pattern))
    {
        let row = by_species.entry(&s.nombre_comun, || (s.nombre_comun.clone(), 0.0, 0));
        row.1 += price(s);
        row.2 += 1;
    }
    let mut rows: Vec<SpeciesPrice> = by_species
        .into_rows()
        .into_iter()
        .map(|(especie, total, count)| SpeciesPrice {
            especie,
            promedio: total / count as f64,
        })
        .collect();
    rows.sort_by(|a, b| b.promedio.total_cmp(&a.promedio));
    rows.truncate(TOP_SPECIES);
    rows
}

/// Most expensive species sold in restaurants
pub fn price_by_species_restaurants(samples: &[MarketSample]) -> Vec<SpeciesPrice> {
    price_by_species_where(samples, "restaurante")
}

/// Most expensive species sold in fish shops
pub fn price_by_species_fish_shops(samples: &[MarketSample]) -> Vec<SpeciesPrice> {
    price_by_species_where(samples, "pescader")
}

/// Average price per (treatment, species) pair
pub fn price_by_treatment_and_species(samples: &[MarketSample]) -> Vec<TreatmentSpeciesPrice> {
    let mut by_pair: Grouped<(TreatmentSpeciesPrice, f64, usize)> = Grouped::new();
    for s in samples {
        let tratamiento = s
            .tratamiento
            .as_deref()
            .map(str::trim)
            .unwrap_or("Sin Info")
            .to_string();
        let key = format!("{}|{}", tratamiento, s.nombre_comun);
        let row = by_pair.entry(&key, || {
            (
                TreatmentSpeciesPrice {
                    tratamiento: tratamiento.clone(),
                    especie: s.nombre_comun.clone(),
                    promedio: 0.0,
                },
                0.0,
                0,
            )
        });
        row.1 += price(s);
        row.2 += 1;
    }
    by_pair
        .into_rows()
        .into_iter()
        .map(|(mut row, total, count)| {
            row.promedio = total / count as f64;
            row
        })
        .collect()
}

/// Distinct species per collection place
pub fn species_per_state(samples: &[MarketSample]) -> Vec<SpeciesPerState> {
    let mut by_place: Grouped<(String, BTreeSet<String>)> = Grouped::new();
    for s in samples {
        let place = s
            .lugar_colecta
            .as_deref()
            .map(str::trim)
            .unwrap_or("Desconocido")
            .to_string();
        let row = by_place.entry(&place, || (place.clone(), BTreeSet::new()));
        row.1.insert(s.nombre_comun.clone());
    }
    let mut rows: Vec<SpeciesPerState> = by_place
        .into_rows()
        .into_iter()
        .map(|(estado, species)| SpeciesPerState {
            estado,
            count: species.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(TOP_SPECIES);
    rows
}

/// Headline figures over the unfiltered datasets
pub fn quick_stats(data: &Datasets) -> QuickStats {
    if data.production.is_empty() {
        return QuickStats {
            produccion: "--".into(),
            valor: "--".into(),
            pescadores: "--".into(),
            especies: "--".into(),
        };
    }
    let total_kg: f64 = data.production.iter().map(|r| r.peso_kg).sum();
    let total_mxn: f64 = data.production.iter().map(|r| r.valor_mxn).sum();
    let fishers: i64 = data.fishers.iter().map(fishers_count).sum();
    let species: BTreeSet<&str> = data.production.iter().map(|r| r.especie.as_str()).collect();
    QuickStats {
        produccion: format!("{:.1} M kg", total_kg / 1_000_000.0),
        valor: format!("${:.1} mil millones MXN", total_mxn / 1_000_000_000.0),
        pescadores: group_thousands(fishers),
        especies: species.len().to_string(),
    }
}

/// Every series the statistics charts draw from
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessedStats {
    pub production_by_year: Vec<ProductionByYear>,
    pub production_by_entity: Vec<ProductionByEntity>,
    pub price_by_establishment: Vec<EstablishmentPrice>,
    pub price_by_species_restaurants: Vec<SpeciesPrice>,
    pub price_by_species_fish_shops: Vec<SpeciesPrice>,
    pub price_by_treatment: Vec<TreatmentSpeciesPrice>,
    pub species_per_state: Vec<SpeciesPerState>,
    pub demographics: Vec<StateDemographics>,
    pub fishers: Vec<FishersByEntity>,
    pub gender: Option<GenderTotals>,
}

impl ProcessedStats {
    pub fn compute(data: &Datasets, filters: &FilterSelection) -> Self {
        let demographics = demographics(&data.coastal);
        let gender = if demographics.is_empty() {
            None
        } else {
            Some(gender_totals(&demographics))
        };
        Self {
            production_by_year: production_by_year(&data.production, filters),
            production_by_entity: production_by_entity(&data.production, filters),
            price_by_establishment: price_by_establishment(&data.market),
            price_by_species_restaurants: price_by_species_restaurants(&data.market),
            price_by_species_fish_shops: price_by_species_fish_shops(&data.market),
            price_by_treatment: price_by_treatment_and_species(&data.market),
            species_per_state: species_per_state(&data.market),
            demographics,
            fishers: fishers_by_entity(&data.fishers),
            gender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prod(entidad: &str, especie: &str, ano: i32, origen: &str, peso: f64) -> ProductionRecord {
        ProductionRecord {
            entidad: entidad.into(),
            especie: especie.into(),
            ano,
            origen: origen.into(),
            peso_kg: peso,
            valor_mxn: peso * 10.0,
        }
    }

    fn sample(lugar: Option<&str>, especie: &str, precio: &str, tipo: &str, trat: Option<&str>) -> MarketSample {
        MarketSample {
            lugar_colecta: lugar.map(Into::into),
            nombre_comun: especie.into(),
            nombre_cientifico: String::new(),
            precio: precio.into(),
            tipo_establecimiento: tipo.into(),
            tratamiento: trat.map(Into::into),
        }
    }

    #[test]
    fn production_by_year_splits_origins_and_sorts() {
        let records = vec![
            prod("SONORA", "CAMARON", 2021, "CAPTURA", 100.0),
            prod("SONORA", "CAMARON", 2019, " captura ", 50.0),
            prod("SINALOA", "TILAPIA", 2021, "ACUACULTURA", 30.0),
            prod("SINALOA", "TILAPIA", 2021, "cultivo", 5.0),
        ];
        let rows = production_by_year(&records, &FilterSelection::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, "2019");
        assert_eq!(rows[0].captura, 50.0);
        assert_eq!(rows[1].year, "2021");
        assert_eq!(rows[1].captura, 100.0);
        assert_eq!(rows[1].acuacultura, 35.0);
    }

    #[test]
    fn production_by_year_applies_filters() {
        let records = vec![
            prod("SONORA", "CAMARON", 2021, "CAPTURA", 100.0),
            prod("SINALOA", "CAMARON", 2021, "CAPTURA", 40.0),
            prod("SONORA", "CAMARON", 2021, "ACUACULTURA", 7.0),
        ];
        let filters = FilterSelection::default()
            .with(FilterKey::Entidades, "SONORA")
            .with(FilterKey::Origenes, "CAPTURA");
        let rows = production_by_year(&records, &filters);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].captura, 100.0);
        assert_eq!(rows[0].acuacultura, 0.0);
    }

    #[test]
    fn production_by_entity_ignores_entity_filter_and_ranks() {
        let mut records = Vec::new();
        for i in 0..12 {
            records.push(prod(&format!("E{:02}", i), "ATUN", 2020, "CAPTURA", i as f64));
        }
        let filters = FilterSelection::default().with(FilterKey::Entidades, "E00");
        let rows = production_by_entity(&records, &filters);
        assert_eq!(rows.len(), TOP_STATES);
        assert_eq!(rows[0].entidad, "E11");
        assert_eq!(rows[0].valor, 110.0);
        assert_eq!(rows[9].entidad, "E02");
    }

    #[test]
    fn demographics_sums_text_counts() {
        let rows = vec![
            CoastalCommunity {
                localidad: "A".into(),
                entidad: "VERACRUZ".into(),
                hombres: "100".into(),
                mujeres: "120".into(),
            },
            CoastalCommunity {
                localidad: "B".into(),
                entidad: "VERACRUZ".into(),
                hombres: "N/D".into(),
                mujeres: "5".into(),
            },
            CoastalCommunity {
                localidad: "C".into(),
                entidad: "COLIMA".into(),
                hombres: "300".into(),
                mujeres: "10".into(),
            },
        ];
        let demo = demographics(&rows);
        assert_eq!(demo[0].estado, "COLIMA");
        assert_eq!(demo[0].total, 310);
        assert_eq!(demo[1].hombres, 100);
        assert_eq!(demo[1].mujeres, 125);
        let totals = gender_totals(&demo);
        assert_eq!(totals, GenderTotals { hombres: 400, mujeres: 135 });
    }

    #[test]
    fn fishers_strip_thousands_separators() {
        let rows = vec![
            FishingPopulation {
                entidad: "SINALOA".into(),
                total_pescadores: "45,210".into(),
            },
            FishingPopulation {
                entidad: "TABASCO".into(),
                total_pescadores: "".into(),
            },
        ];
        let out = fishers_by_entity(&rows);
        assert_eq!(out[0].pescadores, 45210);
        assert_eq!(out[1].pescadores, 0);
    }

    #[test]
    fn establishment_types_merge_spelling_variants() {
        let samples = vec![
            sample(None, "Mero", "100", " RESTAURANTE ", None),
            sample(None, "Mero", "200", "restaurante", None),
            sample(None, "Pargo", "abc", "Pescadería", None),
            sample(None, "Pargo", "50", "  ", None),
        ];
        let rows = price_by_establishment(&samples);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tipo, "Restaurante");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].promedio, 150.0);
        assert_eq!(rows[1].tipo, "Pescadería");
        assert_eq!(rows[1].promedio, 0.0);
    }

    #[test]
    fn species_prices_split_by_establishment() {
        let samples = vec![
            sample(None, "Mero", "300", "Restaurante", None),
            sample(None, "Mero", "100", "Restaurante", None),
            sample(None, "Pulpo", "250", "RESTAURANTE", None),
            sample(None, "Mojarra", "80", "Pescadería", None),
        ];
        let rest = price_by_species_restaurants(&samples);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].especie, "Pulpo");
        assert_eq!(rest[1].promedio, 200.0);
        let shops = price_by_species_fish_shops(&samples);
        assert_eq!(shops, vec![SpeciesPrice { especie: "Mojarra".into(), promedio: 80.0 }]);
    }

    #[test]
    fn treatment_defaults_to_sin_info() {
        let samples = vec![
            sample(None, "Mero", "100", "Restaurante", Some(" Fresco ")),
            sample(None, "Mero", "300", "Restaurante", Some("Fresco")),
            sample(None, "Mero", "90", "Restaurante", None),
        ];
        let rows = price_by_treatment_and_species(&samples);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tratamiento, "Fresco");
        assert_eq!(rows[0].promedio, 200.0);
        assert_eq!(rows[1].tratamiento, "Sin Info");
    }

    #[test]
    fn species_per_state_counts_distinct_names() {
        let samples = vec![
            sample(Some("Yucatán"), "Mero", "1", "Restaurante", None),
            sample(Some("Yucatán "), "Mero", "1", "Restaurante", None),
            sample(Some("Yucatán"), "Pulpo", "1", "Restaurante", None),
            sample(None, "Pargo", "1", "Restaurante", None),
        ];
        let rows = species_per_state(&samples);
        assert_eq!(rows[0], SpeciesPerState { estado: "Yucatán".into(), count: 2 });
        assert_eq!(rows[1], SpeciesPerState { estado: "Desconocido".into(), count: 1 });
    }

    #[test]
    fn quick_stats_format_headline_figures() {
        let data = Datasets {
            production: vec![
                prod("SONORA", "CAMARON", 2020, "CAPTURA", 1_500_000.0),
                prod("SONORA", "ATUN", 2020, "CAPTURA", 1_000_000.0),
            ],
            fishers: vec![FishingPopulation {
                entidad: "SONORA".into(),
                total_pescadores: "12,500".into(),
            }],
            ..Datasets::default()
        };
        let stats = quick_stats(&data);
        assert_eq!(stats.produccion, "2.5 M kg");
        assert_eq!(stats.valor, "$0.0 mil millones MXN");
        assert_eq!(stats.pescadores, "12,500");
        assert_eq!(stats.especies, "2");
        assert_eq!(quick_stats(&Datasets::default()).produccion, "--");
    }
}
