//! Read-only game catalog: ions, curated compound pairings, levels.
//!
//! The raw record types mirror the shipped JSON files. [`Catalog`] assembles
//! them into the species library and answers the lookups the rest of the
//! game needs (focus compounds, next level, pairings by key).

use crate::chemistry::{charge_from_symbol, ChargedIon, IonKind};
use crate::species::{CompoundKey, Species};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of `ions.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IonRecord {
    /// Root formula without charge.
    pub formula: String,
    /// Signed charge, or a bare magnitude for ions only named by pairings.
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub html: Option<String>,
    /// Explicit species name. Ions that appear in no pairing need one to
    /// become a species.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mistakes: IonMistakes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IonMistakes {
    #[serde(default)]
    pub formula: BTreeMap<String, String>,
    #[serde(default)]
    pub name: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairingAnswer {
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MistakeLists {
    #[serde(default)]
    pub formula: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
}

/// Feedback shown when a specific wrong option is picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub option: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub feedback_html: Option<String>,
    #[serde(default)]
    pub option_html: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackLists {
    #[serde(default)]
    pub formula: Vec<FeedbackEntry>,
    #[serde(default)]
    pub name: Vec<FeedbackEntry>,
}

/// A curated cation/anion pairing with its answer and distractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundPairing {
    pub cation: String,
    pub anion: String,
    #[serde(default)]
    pub correct: PairingAnswer,
    #[serde(default)]
    pub mistakes: MistakeLists,
    #[serde(default)]
    pub feedback: FeedbackLists,
}

impl CompoundPairing {
    pub fn key(&self) -> CompoundKey {
        CompoundKey::new(self.cation.clone(), self.anion.clone())
    }
}

/// One entry of `levels.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    #[serde(rename = "Level")]
    pub level: u32,
    #[serde(rename = "Cations", default)]
    pub cations: Vec<String>,
    #[serde(rename = "Anions", default)]
    pub anions: Vec<String>,
    #[serde(rename = "Rationale", default)]
    pub rationale: String,
}

/// Expected compound for the per-level checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpeciesEntry {
    pub key: String,
    pub formula: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSpecies {
    #[serde(default)]
    pub compounds: Vec<LevelSpeciesEntry>,
}

/// A pairing that is in play for a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusCompound {
    pub key: CompoundKey,
    pub formula: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no ion species could be built from the ion and pairing data")]
    NoSpecies,
    #[error("the level catalog is empty")]
    NoLevels,
}

/// The assembled, immutable catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    ions: BTreeMap<String, IonRecord>,
    species: BTreeMap<String, Species>,
    pairings: BTreeMap<CompoundKey, CompoundPairing>,
    levels: Vec<LevelDefinition>,
    level_species: BTreeMap<u32, LevelSpecies>,
    warnings: Vec<String>,
}

impl Catalog {
    /// Build the catalog and its species library.
    ///
    /// Species come from pairings first: the cation is named by the first
    /// word of the pairing's name and the anion by the last word. Named ions
    /// that no pairing mentions are added afterwards. Pairings that reference
    /// an ion missing from `ions` are kept but produce a warning.
    pub fn from_parts(
        ions: BTreeMap<String, IonRecord>,
        pairings: Vec<CompoundPairing>,
        mut levels: Vec<LevelDefinition>,
        level_species: BTreeMap<u32, LevelSpecies>,
    ) -> Result<Self, CatalogError> {
        let mut warnings = Vec::new();
        let mut species: BTreeMap<String, Species> = BTreeMap::new();

        for pairing in &pairings {
            let words: Vec<&str> = pairing
                .correct
                .name
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .collect();
            let sides = [
                (&pairing.cation, IonKind::Cation, words.first()),
                (&pairing.anion, IonKind::Anion, words.last()),
            ];
            for (symbol, kind, word) in sides {
                if species.contains_key(symbol) {
                    continue;
                }
                let Some(record) = ions.get(symbol) else {
                    warnings.push(format!(
                        "pairing {} references unknown ion {}",
                        pairing.key(),
                        symbol
                    ));
                    continue;
                };
                let name = record
                    .name
                    .clone()
                    .or_else(|| word.map(|w| w.to_string()))
                    .unwrap_or_else(|| symbol.clone());
                species.insert(symbol.clone(), make_species(symbol, record, kind, name));
            }
        }

        for (symbol, record) in &ions {
            if species.contains_key(symbol) {
                continue;
            }
            if let Some(name) = &record.name {
                let charge = record_charge(symbol, record);
                let kind = IonKind::from_charge(charge);
                species.insert(
                    symbol.clone(),
                    make_species(symbol, record, kind, name.clone()),
                );
            }
        }

        if species.is_empty() {
            return Err(CatalogError::NoSpecies);
        }

        levels.sort_by_key(|l| l.level);
        let before = levels.len();
        levels.dedup_by_key(|l| l.level);
        if levels.len() != before {
            warnings.push(format!(
                "{} duplicate level entries ignored",
                before - levels.len()
            ));
        }
        if levels.is_empty() {
            return Err(CatalogError::NoLevels);
        }

        let pairings = pairings.into_iter().map(|p| (p.key(), p)).collect();

        Ok(Self {
            ions,
            species,
            pairings,
            levels,
            level_species,
            warnings,
        })
    }

    /// Override species HTML with richer hints.
    ///
    /// Existing hints that already carry `<sub` or `<sup` markup are kept.
    pub fn merge_html_hints(&mut self, hints: &BTreeMap<String, String>) -> usize {
        let mut merged = 0;
        for (symbol, html) in hints {
            if let Some(species) = self.species.get_mut(symbol) {
                let rich = species
                    .html
                    .as_deref()
                    .is_some_and(|h| h.contains("<sub") || h.contains("<sup"));
                if !rich {
                    species.html = Some(html.clone());
                    merged += 1;
                }
            }
        }
        merged
    }

    /// Non-fatal problems found while assembling the catalog.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn species(&self, symbol: &str) -> Option<&Species> {
        self.species.get(symbol)
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn ion_record(&self, symbol: &str) -> Option<&IonRecord> {
        self.ions.get(symbol)
    }

    /// Signed charge of an ion: from its species, else parsed from the symbol.
    pub fn ion_charge(&self, symbol: &str) -> i32 {
        match self.species.get(symbol) {
            Some(s) => s.charge(),
            None => charge_from_symbol(symbol),
        }
    }

    pub fn pairing(&self, key: &CompoundKey) -> Option<&CompoundPairing> {
        self.pairings.get(key)
    }

    pub fn pairings(&self) -> impl Iterator<Item = &CompoundPairing> {
        self.pairings.values()
    }

    pub fn pairing_count(&self) -> usize {
        self.pairings.len()
    }

    /// Levels in ascending order.
    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn level(&self, number: u32) -> Option<&LevelDefinition> {
        self.levels.iter().find(|l| l.level == number)
    }

    pub fn first_level(&self) -> Option<u32> {
        self.levels.first().map(|l| l.level)
    }

    /// Smallest level number strictly greater than `current`.
    pub fn next_level(&self, current: u32) -> Option<u32> {
        self.levels
            .iter()
            .map(|l| l.level)
            .find(|&n| n > current)
    }

    /// Cation × anion pairs of the level that have a curated pairing.
    pub fn focus_compounds(&self, level: u32) -> Vec<FocusCompound> {
        let Some(def) = self.level(level) else {
            return Vec::new();
        };
        let mut focus = Vec::new();
        for cation in def.cations.iter().filter(|s| self.species.contains_key(*s)) {
            for anion in def.anions.iter().filter(|s| self.species.contains_key(*s)) {
                let key = CompoundKey::new(cation.clone(), anion.clone());
                if let Some(pairing) = self.pairings.get(&key) {
                    focus.push(FocusCompound {
                        formula: pairing.correct.formula.clone().unwrap_or_default(),
                        name: pairing.correct.name.clone().unwrap_or_default(),
                        key,
                    });
                }
            }
        }
        focus
    }

    /// Level cations that have species, in catalog order.
    pub fn level_cations(&self, level: u32) -> Vec<String> {
        self.level(level)
            .map(|d| self.known(&d.cations))
            .unwrap_or_default()
    }

    pub fn level_anions(&self, level: u32) -> Vec<String> {
        self.level(level)
            .map(|d| self.known(&d.anions))
            .unwrap_or_default()
    }

    /// Every ion of the level with its charge, cations first.
    pub fn level_pool(&self, level: u32) -> Vec<ChargedIon> {
        self.level_cations(level)
            .into_iter()
            .chain(self.level_anions(level))
            .map(|s| {
                let charge = self.ion_charge(&s);
                ChargedIon::new(s, charge)
            })
            .collect()
    }

    /// Expected compounds for the level checklist.
    pub fn level_checklist(&self, level: u32) -> &[LevelSpeciesEntry] {
        self.level_species
            .get(&level)
            .map(|l| l.compounds.as_slice())
            .unwrap_or(&[])
    }

    fn known(&self, symbols: &[String]) -> Vec<String> {
        symbols
            .iter()
            .filter(|s| self.species.contains_key(*s))
            .cloned()
            .collect()
    }
}

fn record_charge(symbol: &str, record: &IonRecord) -> i32 {
    if record.charge != 0 {
        record.charge
    } else {
        charge_from_symbol(symbol)
    }
}

fn make_species(symbol: &str, record: &IonRecord, kind: IonKind, name: String) -> Species {
    Species {
        symbol: symbol.to_string(),
        kind,
        name,
        formula: record.formula.clone(),
        charge_magnitude: record_charge(symbol, record).unsigned_abs(),
        html: record.html.clone(),
        formula_mistakes: record.mistakes.formula.clone(),
        name_mistakes: record.mistakes.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ion(formula: &str, charge: i32) -> IonRecord {
        IonRecord {
            formula: formula.into(),
            charge,
            html: None,
            name: None,
            mistakes: IonMistakes::default(),
        }
    }

    fn pairing(cation: &str, anion: &str, formula: &str, name: &str) -> CompoundPairing {
        CompoundPairing {
            cation: cation.into(),
            anion: anion.into(),
            correct: PairingAnswer {
                formula: Some(formula.into()),
                name: Some(name.into()),
            },
            mistakes: MistakeLists::default(),
            feedback: FeedbackLists::default(),
        }
    }

    fn level(n: u32, cations: &[&str], anions: &[&str]) -> LevelDefinition {
        LevelDefinition {
            level: n,
            cations: cations.iter().map(|s| s.to_string()).collect(),
            anions: anions.iter().map(|s| s.to_string()).collect(),
            rationale: String::new(),
        }
    }

    fn sample() -> Catalog {
        let mut ions = BTreeMap::new();
        ions.insert("Na+".to_string(), ion("Na", 1));
        ions.insert("Ca2+".to_string(), ion("Ca", 2));
        ions.insert("Cl-".to_string(), ion("Cl", -1));
        ions.insert("O2-".to_string(), ion("O", -2));
        let pairings = vec![
            pairing("Na+", "Cl-", "NaCl", "sodium chloride"),
            pairing("Ca2+", "Cl-", "CaCl2", "calcium chloride"),
            pairing("Ca2+", "O2-", "CaO", "calcium oxide"),
        ];
        let levels = vec![
            level(4, &["Ca2+"], &["O2-"]),
            level(1, &["Na+", "Ca2+"], &["Cl-", "O2-"]),
        ];
        Catalog::from_parts(ions, pairings, levels, BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_species_named_from_pairings() {
        let cat = sample();
        let na = cat.species("Na+").unwrap();
        assert_eq!(na.name, "sodium");
        assert_eq!(na.kind, IonKind::Cation);
        let o = cat.species("O2-").unwrap();
        assert_eq!(o.name, "oxide");
        assert_eq!(o.charge(), -2);
    }

    #[test]
    fn test_focus_compounds_skip_missing_pairings() {
        let cat = sample();
        let focus = cat.focus_compounds(1);
        let keys: Vec<String> = focus.iter().map(|f| f.key.to_string()).collect();
        // Na+|O2- has no pairing.
        assert_eq!(keys, vec!["Na+|Cl-", "Ca2+|Cl-", "Ca2+|O2-"]);
        assert_eq!(focus[1].formula, "CaCl2");
    }

    #[test]
    fn test_levels_sorted_and_next_level() {
        let cat = sample();
        assert_eq!(cat.first_level(), Some(1));
        assert_eq!(cat.next_level(1), Some(4));
        assert_eq!(cat.next_level(4), None);
        assert!(cat.level(2).is_none());
    }

    #[test]
    fn test_unknown_pairing_ion_warns() {
        let mut ions = BTreeMap::new();
        ions.insert("Na+".to_string(), ion("Na", 1));
        let pairings = vec![pairing("Na+", "Xx-", "NaXx", "sodium xide")];
        let cat = Catalog::from_parts(ions, pairings, vec![level(1, &["Na+"], &[])], BTreeMap::new())
            .unwrap();
        assert_eq!(cat.warnings().len(), 1);
        assert!(cat.species("Xx-").is_none());
    }

    #[test]
    fn test_named_unpaired_ion_becomes_species() {
        let mut ions = BTreeMap::new();
        let mut iodide = ion("I", -1);
        iodide.name = Some("iodide".into());
        ions.insert("I-".to_string(), iodide);
        let cat = Catalog::from_parts(ions, vec![], vec![level(1, &[], &["I-"])], BTreeMap::new())
            .unwrap();
        let species = cat.species("I-").unwrap();
        assert_eq!(species.kind, IonKind::Anion);
        assert_eq!(species.charge_magnitude, 1);
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let err = Catalog::from_parts(BTreeMap::new(), vec![], vec![], BTreeMap::new()).unwrap_err();
        assert_eq!(err, CatalogError::NoSpecies);
    }

    #[test]
    fn test_merge_html_keeps_rich_hints() {
        let mut cat = sample();
        let mut hints = BTreeMap::new();
        hints.insert("Na+".to_string(), "Na<sup>+</sup>".to_string());
        assert_eq!(cat.merge_html_hints(&hints), 1);
        hints.insert("Na+".to_string(), "plain".to_string());
        assert_eq!(cat.merge_html_hints(&hints), 0);
        assert_eq!(cat.species("Na+").unwrap().html.as_deref(), Some("Na<sup>+</sup>"));
    }

    #[test]
    fn test_level_pool_charges() {
        let cat = sample();
        let pool = cat.level_pool(1);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0].symbol, "Na+");
        assert_eq!(pool[3].charge, -2);
    }
}
