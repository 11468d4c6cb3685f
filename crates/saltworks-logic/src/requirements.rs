//! Pedagogical level requirements and level-up gating.
//!
//! One table drives both the boolean checks and the progress text shown to
//! the player.

use crate::species::CompoundKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Highest level; never eligible for level-up.
pub const MAX_LEVEL: u32 = 20;

/// Compounds to solve on a level before leveling up.
pub const LEVEL_UP_THRESHOLD: usize = 3;

/// Chemistry-teaching group of an ion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IonGroup {
    I,
    II,
    III,
    Ammonium,
    TmI,
    TmII,
    TmIII,
    TmIV,
    UncommonTmII,
    UncommonTmIII,
    UncommonTmIV,
    V,
    VI,
    VII,
    CpI,
    CpII,
    CpIII,
    UncommonCpI,
    UncommonCpII,
    Unknown,
}

impl IonGroup {
    pub fn tag(self) -> &'static str {
        match self {
            IonGroup::I => "I",
            IonGroup::II => "II",
            IonGroup::III => "III",
            IonGroup::Ammonium => "NH4+",
            IonGroup::TmI => "TM(I)",
            IonGroup::TmII => "TM(II)",
            IonGroup::TmIII => "TM(III)",
            IonGroup::TmIV => "TM(IV)",
            IonGroup::UncommonTmII => "TM*(II)",
            IonGroup::UncommonTmIII => "TM*(III)",
            IonGroup::UncommonTmIV => "TM*(IV)",
            IonGroup::V => "V",
            IonGroup::VI => "VI",
            IonGroup::VII => "VII",
            IonGroup::CpI => "CP(I)",
            IonGroup::CpII => "CP(II)",
            IonGroup::CpIII => "CP(III)",
            IonGroup::UncommonCpI => "CP*(I)",
            IonGroup::UncommonCpII => "CP*(II)",
            IonGroup::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for IonGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classify an ion symbol.
pub fn ion_group(symbol: &str) -> IonGroup {
    match symbol {
        "Li+" | "Na+" | "K+" | "Ag+" => IonGroup::I,
        "Be2+" | "Mg2+" | "Ca2+" | "Sr2+" | "Ba2+" | "Zn2+" => IonGroup::II,
        "Al3+" => IonGroup::III,
        "NH4+" => IonGroup::Ammonium,
        "Cu+" => IonGroup::TmI,
        "Cu2+" | "Fe2+" | "Ni2+" | "Pb2+" => IonGroup::TmII,
        "Fe3+" => IonGroup::TmIII,
        "Ti4+" | "Pb4+" => IonGroup::TmIV,
        "Mn2+" | "Co2+" | "Pt2+" | "Hg2+" | "Sn2+" => IonGroup::UncommonTmII,
        "V3+" | "Cr3+" | "Co3+" => IonGroup::UncommonTmIII,
        "Mn4+" | "Pt4+" | "Sn4+" => IonGroup::UncommonTmIV,
        "F-" | "Cl-" | "Br-" | "I-" => IonGroup::VII,
        "O2-" | "S2-" => IonGroup::VI,
        "N3-" | "P3-" => IonGroup::V,
        "OH-" | "NO3-" => IonGroup::CpI,
        "CO32-" | "SO42-" => IonGroup::CpII,
        "PO43-" => IonGroup::CpIII,
        "CN-" | "SCN-" | "NO2-" | "BrO3-" | "ClO3-" | "IO3-" => IonGroup::UncommonCpI,
        "CrO42-" | "Cr2O72-" | "SO32-" | "S2O32-" => IonGroup::UncommonCpII,
        _ => IonGroup::Unknown,
    }
}

/// "At least one compound solved this level that ..."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    /// ... has a cation in `cation` and an anion in `anion` (`None` = any).
    Match {
        cation: Option<IonGroup>,
        anion: Option<IonGroup>,
    },
    /// ... contains this exact ion.
    Specific(&'static str),
}

impl Requirement {
    pub fn matches(&self, key: &CompoundKey) -> bool {
        match self {
            Requirement::Match { cation, anion } => {
                let cation_ok = cation.map_or(true, |g| ion_group(&key.cation) == g);
                let anion_ok = anion.map_or(true, |g| ion_group(&key.anion) == g);
                cation_ok && anion_ok
            }
            Requirement::Specific(symbol) => key.touches(symbol),
        }
    }

    /// Solved compounds satisfying this requirement.
    pub fn count(&self, solved: &BTreeSet<CompoundKey>) -> usize {
        solved.iter().filter(|k| self.matches(k)).count()
    }

    pub fn label(&self) -> String {
        match self {
            Requirement::Match {
                cation: Some(c),
                anion: Some(a),
            } => format!("Group {} + {}", c, a),
            Requirement::Match {
                cation: Some(g),
                anion: None,
            }
            | Requirement::Match {
                cation: None,
                anion: Some(g),
            } => format!("{} compounds", g),
            Requirement::Match {
                cation: None,
                anion: None,
            } => "Any compound".to_string(),
            Requirement::Specific(symbol) => format!("{} compounds", symbol),
        }
    }
}

const fn pair(cation: IonGroup, anion: IonGroup) -> Requirement {
    Requirement::Match {
        cation: Some(cation),
        anion: Some(anion),
    }
}

const fn cation(group: IonGroup) -> Requirement {
    Requirement::Match {
        cation: Some(group),
        anion: None,
    }
}

const fn anion(group: IonGroup) -> Requirement {
    Requirement::Match {
        cation: None,
        anion: Some(group),
    }
}

/// Explicit requirements of a level. Most levels have none.
pub fn requirements_for_level(level: u32) -> &'static [Requirement] {
    use IonGroup::*;
    const L2: [Requirement; 2] = [pair(I, VI), pair(II, VII)];
    const L3: [Requirement; 1] = [pair(II, V)];
    const L4: [Requirement; 1] = [pair(III, VI)];
    const L5: [Requirement; 2] = [cation(TmI), cation(TmII)];
    const L6: [Requirement; 2] = [cation(TmII), cation(TmIII)];
    const L7: [Requirement; 2] = [cation(TmIII), cation(TmIV)];
    const L10: [Requirement; 2] = [Requirement::Specific("OH-"), Requirement::Specific("NO3-")];
    const L13: [Requirement; 1] = [anion(CpIII)];
    const L16: [Requirement; 1] = [cation(UncommonTmII)];
    const L17: [Requirement; 2] = [cation(UncommonTmIII), cation(UncommonTmIV)];
    const L18: [Requirement; 1] = [anion(UncommonCpI)];
    const L19: [Requirement; 1] = [anion(UncommonCpII)];
    match level {
        2 => &L2,
        3 => &L3,
        4 => &L4,
        5 => &L5,
        6 => &L6,
        7 => &L7,
        10 => &L10,
        13 => &L13,
        16 => &L16,
        17 => &L17,
        18 => &L18,
        19 => &L19,
        _ => &[],
    }
}

/// Requirements of `level` not yet met by `solved`.
pub fn unmet_requirements(level: u32, solved: &BTreeSet<CompoundKey>) -> Vec<Requirement> {
    requirements_for_level(level)
        .iter()
        .filter(|r| r.count(solved) == 0)
        .copied()
        .collect()
}

/// True if the compound would satisfy any of `unmet`.
pub fn meets_any(key: &CompoundKey, unmet: &[Requirement]) -> bool {
    unmet.iter().any(|r| r.matches(key))
}

pub fn can_level_up(level: u32, solved: &BTreeSet<CompoundKey>) -> bool {
    if level >= MAX_LEVEL {
        return false;
    }
    solved.len() >= LEVEL_UP_THRESHOLD && unmet_requirements(level, solved).is_empty()
}

/// Human-readable objective lines for the level.
pub fn progress_lines(level: u32, solved: &BTreeSet<CompoundKey>) -> Vec<String> {
    let total = solved.len();
    if level >= MAX_LEVEL {
        return vec![
            "Max Level! Keep mastering compounds!".to_string(),
            format!("Total mastered (this level): {}", total),
        ];
    }
    let reqs = requirements_for_level(level);
    if reqs.is_empty() {
        return vec![format!(
            "Master any {} compounds ({}/{})",
            LEVEL_UP_THRESHOLD, total, LEVEL_UP_THRESHOLD
        )];
    }
    let mut lines: Vec<String> = reqs
        .iter()
        .map(|r| {
            let n = r.count(solved);
            let mark = if n >= 1 { '✓' } else { '✗' };
            format!("{}: {} ({}/1)", r.label(), mark, n)
        })
        .collect();
    lines.push(format!("Total (this level): {}/{}", total, LEVEL_UP_THRESHOLD));
    lines
}
