//! Production filter selection.
//!
//! Each key holds either the wildcard [`ALL`] or an explicit list of values.

use crate::dataset::ProductionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wildcard value meaning "no filter on this key"
pub const ALL: &str = "todas";

/// Filterable keys of the production dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Entidades,
    Especies,
    Anos,
    Origenes,
}

/// Current filter selection (one list per key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub entidades: Vec<String>,
    pub especies: Vec<String>,
    pub anos: Vec<String>,
    pub origenes: Vec<String>,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            entidades: vec![ALL.to_string()],
            especies: vec![ALL.to_string()],
            anos: vec![ALL.to_string()],
            origenes: vec![ALL.to_string()],
        }
    }
}

impl FilterSelection {
    pub fn values(&self, key: FilterKey) -> &[String] {
        match key {
            FilterKey::Entidades => &self.entidades,
            FilterKey::Especies => &self.especies,
            FilterKey::Anos => &self.anos,
            FilterKey::Origenes => &self.origenes,
        }
    }

    fn values_mut(&mut self, key: FilterKey) -> &mut Vec<String> {
        match key {
            FilterKey::Entidades => &mut self.entidades,
            FilterKey::Especies => &mut self.especies,
            FilterKey::Anos => &mut self.anos,
            FilterKey::Origenes => &mut self.origenes,
        }
    }

    /// Whether `key` is unrestricted
    pub fn is_all(&self, key: FilterKey) -> bool {
        self.values(key).iter().any(|v| v == ALL)
    }

    /// Apply a checkbox change.
    ///
    /// Checking the wildcard selects only the wildcard, unchecking it clears
    /// the key. Checking a value drops the wildcard; a key left empty falls
    /// back to the wildcard.
    pub fn toggle(&mut self, key: FilterKey, value: &str, checked: bool) {
        let values = self.values_mut(key);
        if value == ALL {
            *values = if checked { vec![ALL.to_string()] } else { Vec::new() };
            return;
        }
        if checked {
            values.retain(|v| v != ALL);
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        } else {
            values.retain(|v| v != value);
        }
        if values.is_empty() {
            values.push(ALL.to_string());
        }
    }

    /// Builder form of [`toggle`](Self::toggle) with `checked = true`
    pub fn with(mut self, key: FilterKey, value: impl AsRef<str>) -> Self {
        self.toggle(key, value.as_ref(), true);
        self
    }
}

/// Values available for each filter key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub entidades: Vec<String>,
    pub especies: Vec<String>,
    pub anos: Vec<String>,
    pub origenes: Vec<String>,
}

impl FilterOptions {
    /// Sorted distinct values found in the production dataset
    pub fn from_records(records: &[ProductionRecord]) -> Self {
        let mut entidades = BTreeSet::new();
        let mut especies = BTreeSet::new();
        let mut anos = BTreeSet::new();
        let mut origenes = BTreeSet::new();
        for r in records {
            entidades.insert(r.entidad.clone());
            especies.insert(r.especie.clone());
            anos.insert(r.ano.to_string());
            origenes.insert(r.origen.clone());
        }
        Self {
            entidades: entidades.into_iter().collect(),
            especies: especies.into_iter().collect(),
            anos: anos.into_iter().collect(),
            origenes: origenes.into_iter().collect(),
        }
    }
}
