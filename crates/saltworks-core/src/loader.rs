//! Catalog loading from the JSON data files.
//!
//! Ions and levels are required. Pairings, level species, and species HTML
//! hints are supplementary: a failure there is logged and loading continues
//! with that part empty. The catalog itself still fails if nothing usable is
//! left (no species or no levels).

use saltworks_logic::catalog::{
    Catalog, CatalogError, CompoundPairing, IonRecord, LevelDefinition, LevelSpecies,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// The catalog files, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFile {
    Ions,
    Pairings,
    Levels,
    LevelSpecies,
    SpeciesHtml,
}

impl DataFile {
    pub fn file_name(self) -> &'static str {
        match self {
            DataFile::Ions => "ions.json",
            DataFile::Pairings => "compound_pairings.json",
            DataFile::Levels => "levels.json",
            DataFile::LevelSpecies => "level_species.json",
            DataFile::SpeciesHtml => "species_html.json",
        }
    }

    /// Without this file the game cannot start.
    pub fn is_required(self) -> bool {
        matches!(self, DataFile::Ions | DataFile::Levels)
    }
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: DataFile,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: DataFile,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog is unusable: {0}")]
    Catalog(#[from] CatalogError),
}

impl LoadError {
    /// Fatal errors block initialization; the rest are reported and skipped.
    pub fn is_fatal(&self) -> bool {
        match self {
            LoadError::Io { file, .. } | LoadError::Parse { file, .. } => file.is_required(),
            LoadError::Catalog(_) => true,
        }
    }
}

/// `levels.json` either wraps the list or is the bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelFile {
    Wrapped {
        #[serde(rename = "GameDifficultyLevels")]
        levels: Vec<LevelDefinition>,
    },
    Bare(Vec<LevelDefinition>),
}

/// Raw text of each catalog file.
#[derive(Debug, Clone, Default)]
pub struct DataSources {
    pub ions: String,
    pub pairings: Option<String>,
    pub levels: String,
    pub level_species: Option<String>,
    pub species_html: Option<String>,
}

/// A loaded catalog plus the non-fatal problems met on the way.
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: Catalog,
    pub skipped: Vec<LoadError>,
}

impl DataSources {
    /// Read every file from `dir`. Missing required files are errors;
    /// missing optional files are logged and left out.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let read = |file: DataFile| {
            fs::read_to_string(dir.join(file.file_name())).map_err(|source| LoadError::Io { file, source })
        };
        let optional = |file: DataFile| match read(file) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        Ok(Self {
            ions: read(DataFile::Ions)?,
            levels: read(DataFile::Levels)?,
            pairings: optional(DataFile::Pairings),
            level_species: optional(DataFile::LevelSpecies),
            species_html: optional(DataFile::SpeciesHtml),
        })
    }

    /// Parse everything and assemble the catalog.
    pub fn load(&self) -> Result<LoadReport, LoadError> {
        let mut skipped = Vec::new();

        let ions: BTreeMap<String, IonRecord> = parse(DataFile::Ions, &self.ions)?;
        log::info!("loaded {} ion records", ions.len());

        let pairings: Vec<CompoundPairing> =
            parse_optional(DataFile::Pairings, self.pairings.as_deref(), &mut skipped);
        log::info!("loaded {} compound pairings", pairings.len());

        let levels = match parse::<LevelFile>(DataFile::Levels, &self.levels)? {
            LevelFile::Wrapped { levels } | LevelFile::Bare(levels) => levels,
        };
        log::info!(
            "loaded {} levels: {:?}",
            levels.len(),
            levels.iter().map(|l| l.level).collect::<Vec<_>>()
        );

        let level_species: BTreeMap<u32, LevelSpecies> =
            parse_optional(DataFile::LevelSpecies, self.level_species.as_deref(), &mut skipped);
        log::info!("loaded species checklists for {} levels", level_species.len());

        let hints: BTreeMap<String, String> =
            parse_optional(DataFile::SpeciesHtml, self.species_html.as_deref(), &mut skipped);

        let mut catalog = Catalog::from_parts(ions, pairings, levels, level_species)?;
        let merged = catalog.merge_html_hints(&hints);
        log::info!(
            "built species library: {} ions, {} html hints merged",
            catalog.species_count(),
            merged
        );
        for warning in catalog.warnings() {
            log::warn!("catalog: {}", warning);
        }

        Ok(LoadReport { catalog, skipped })
    }
}

fn parse<T: serde::de::DeserializeOwned>(file: DataFile, text: &str) -> Result<T, LoadError> {
    serde_json::from_str(text).map_err(|source| LoadError::Parse { file, source })
}

fn parse_optional<T: serde::de::DeserializeOwned + Default>(
    file: DataFile,
    text: Option<&str>,
    skipped: &mut Vec<LoadError>,
) -> T {
    let Some(text) = text else {
        return T::default();
    };
    match parse(file, text) {
        Ok(value) => value,
        Err(e) => {
            log::error!("{}", e);
            skipped.push(e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IONS: &str = r#"{
        "Na+": {"formula": "Na", "charge": 1},
        "Cl-": {"formula": "Cl", "charge": -1}
    }"#;
    const PAIRINGS: &str = r#"[{
        "cation": "Na+", "anion": "Cl-",
        "correct": {"formula": "NaCl", "name": "sodium chloride"},
        "mistakes": {"formula": ["NaCl2"], "name": ["sodium chlorine"]}
    }]"#;
    const LEVELS: &str =
        r#"{"GameDifficultyLevels": [{"Level": 1, "Cations": ["Na+"], "Anions": ["Cl-"], "Rationale": "start"}]}"#;

    fn sources() -> DataSources {
        DataSources {
            ions: IONS.into(),
            pairings: Some(PAIRINGS.into()),
            levels: LEVELS.into(),
            level_species: None,
            species_html: None,
        }
    }

    #[test]
    fn test_load_minimal_catalog() {
        let report = sources().load().unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.catalog.species_count(), 2);
        assert_eq!(report.catalog.first_level(), Some(1));
        assert_eq!(report.catalog.species("Na+").unwrap().name, "sodium");
    }

    #[test]
    fn test_bare_level_list_accepted() {
        let mut s = sources();
        s.levels = r#"[{"Level": 3, "Cations": ["Na+"], "Anions": ["Cl-"]}]"#.into();
        let report = s.load().unwrap();
        assert_eq!(report.catalog.first_level(), Some(3));
    }

    #[test]
    fn test_bad_ions_is_fatal() {
        let mut s = sources();
        s.ions = "{".into();
        let err = s.load().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ions.json"));
    }

    #[test]
    fn test_bad_supplementary_file_is_skipped() {
        let mut s = sources();
        s.level_species = Some("not json".into());
        s.species_html = Some("[]".into());
        let report = s.load().unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|e| !e.is_fatal()));
        assert!(report.catalog.level_checklist(1).is_empty());
    }

    #[test]
    fn test_no_pairings_leaves_no_species() {
        let mut s = sources();
        s.pairings = Some("oops".into());
        let err = s.load().unwrap_err();
        assert!(matches!(err, LoadError::Catalog(CatalogError::NoSpecies)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_dir_reports_required_file() {
        let err = DataSources::from_dir("/nonexistent/saltworks").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ions.json"));
    }
}
