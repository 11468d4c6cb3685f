//! Ion species and compound keys.

use crate::chemistry::IonKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named ion the player can place on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Catalog symbol with charge suffix, e.g. `Ca2+`.
    pub symbol: String,
    pub kind: IonKind,
    /// Name used in compound names, e.g. `calcium`, `chloride`.
    pub name: String,
    /// Root formula without charge, e.g. `Ca`, `PO4`.
    pub formula: String,
    pub charge_magnitude: u32,
    pub html: Option<String>,
    /// Labeled wrong formulas ("Mistake #1" → "CaO2").
    #[serde(default)]
    pub formula_mistakes: BTreeMap<String, String>,
    #[serde(default)]
    pub name_mistakes: BTreeMap<String, String>,
}

impl Species {
    /// Signed charge, positive for cations.
    pub fn charge(&self) -> i32 {
        self.kind.sign() * self.charge_magnitude as i32
    }

    /// Display form of the charge, `2+`, `1-`.
    pub fn charge_label(&self) -> String {
        format!("{}{}", self.charge_magnitude, self.kind.sign_char())
    }
}

/// Identity of a compound: `cation|anion`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompoundKey {
    pub cation: String,
    pub anion: String,
}

impl CompoundKey {
    pub fn new(cation: impl Into<String>, anion: impl Into<String>) -> Self {
        Self {
            cation: cation.into(),
            anion: anion.into(),
        }
    }

    /// Parse `Na+|Cl-`. Returns `None` without exactly one separator.
    pub fn parse(key: &str) -> Option<Self> {
        let (cation, anion) = key.split_once('|')?;
        if cation.is_empty() || anion.is_empty() || anion.contains('|') {
            return None;
        }
        Some(Self::new(cation, anion))
    }

    /// True if either side is `symbol`.
    pub fn touches(&self, symbol: &str) -> bool {
        self.cation == symbol || self.anion == symbol
    }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.cation, self.anion)
    }
}
