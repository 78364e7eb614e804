//! Statistics datasets.
//!
//! Four JSON arrays published with the statistics page: landed production
//! (`data.json`), INEGI coastal communities, GenBank market samples and the
//! 2023 fishing population census. Field names follow the published files.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PRODUCTION_FILE: &str = "data.json";
pub const COASTAL_FILE: &str = "Comunidades_Costeras_INEGI.json";
pub const GENBANK_FILE: &str = "GenBank_Restaurante_Pescaderia.json";
pub const FISHERS_FILE: &str = "Poblacion_pesquera_2023.json";

/// One landed-production row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    #[serde(rename = "ENTIDAD")]
    pub entidad: String,
    #[serde(rename = "NOMBRE_PRINCIPAL_ESPECIE")]
    pub especie: String,
    #[serde(rename = "ANO")]
    pub ano: i32,
    #[serde(rename = "ORIGEN")]
    pub origen: String,
    #[serde(rename = "PESO_DESEMBARCADO_KG", default)]
    pub peso_kg: f64,
    #[serde(rename = "VALOR_MEXICAN_PESOS", default)]
    pub valor_mxn: f64,
}

/// Coastal locality population (INEGI). Counts are published as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoastalCommunity {
    #[serde(rename = "NOM_LOC", default)]
    pub localidad: String,
    #[serde(rename = "NOM_ENT")]
    pub entidad: String,
    #[serde(rename = "POBMAS", default)]
    pub hombres: String,
    #[serde(rename = "POBFEM", default)]
    pub mujeres: String,
}

/// GenBank market sample (restaurants and fish shops)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    #[serde(rename = "Lugar de Colecta", default)]
    pub lugar_colecta: Option<String>,
    #[serde(rename = "Nombre común español", default)]
    pub nombre_comun: String,
    #[serde(rename = "Nombre científico - GENBANK", default)]
    pub nombre_cientifico: String,
    #[serde(rename = "Precio por kg o porcion (MXN)", default)]
    pub precio: String,
    #[serde(rename = "Tipo de establecimiento", default)]
    pub tipo_establecimiento: String,
    #[serde(rename = "Tratamiento que recibio la muestra", default)]
    pub tratamiento: Option<String>,
}

/// Registered fishers per entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishingPopulation {
    #[serde(rename = "ENTIDAD")]
    pub entidad: String,
    #[serde(rename = "TOTAL DE PESCADORES", default)]
    pub total_pescadores: String,
}

/// All datasets the statistics page works from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Datasets {
    pub production: Vec<ProductionRecord>,
    pub coastal: Vec<CoastalCommunity>,
    pub market: Vec<MarketSample>,
    pub fishers: Vec<FishingPopulation>,
}

impl Datasets {
    /// Load the four dataset files from `dir`.
    ///
    /// A missing file yields an empty dataset and a warning; a file that
    /// exists but is not valid JSON is an error.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(crate::Error::Other(format!(
                "Data directory not found: {}",
                dir.display()
            )));
        }
        let datasets = Self {
            production: load_array(&dir.join(PRODUCTION_FILE))?,
            coastal: load_array(&dir.join(COASTAL_FILE))?,
            market: load_array(&dir.join(GENBANK_FILE))?,
            fishers: load_array(&dir.join(FISHERS_FILE))?,
        };
        log::info!(
            "loaded datasets from {}: {} production, {} coastal, {} market, {} fishers rows",
            dir.display(),
            datasets.production.len(),
            datasets.coastal.len(),
            datasets.market.len(),
            datasets.fishers.len()
        );
        Ok(datasets)
    }

    pub fn is_empty(&self) -> bool {
        self.production.is_empty()
            && self.coastal.is_empty()
            && self.market.is_empty()
            && self.fishers.is_empty()
    }
}

fn load_array<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        log::warn!("dataset {} not found, using empty data", path.display());
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        crate::Error::Other(format!("Invalid dataset {}: {}", path.display(), e))
    })
}

/// Integer prefix of `s`, the way the published counts are read: leading
/// whitespace and an optional sign, then digits up to the first non-digit.
/// Anything without a leading digit reads as 0.
pub fn parse_leading_int(s: &str) -> i64 {
    let t = s.trim_start();
    let (sign, digits) = match t.as_bytes().first() {
        Some(b'-') => (-1, &t[1..]),
        Some(b'+') => (1, &t[1..]),
        _ => (1, t),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|v| sign * v).unwrap_or(0)
}

/// Float prefix of `s` (e.g. `"120.5 MXN"` → 120.5). Non-numeric reads as 0.
pub fn parse_leading_float(s: &str) -> f64 {
    let t = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = t.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let mut candidate = &t[..end];
    // trailing exponent marker without digits ("12e") is not part of the number
    while !candidate.is_empty() && candidate.parse::<f64>().is_err() {
        candidate = &candidate[..candidate.len() - 1];
    }
    candidate.parse::<f64>().unwrap_or(0.0)
}
