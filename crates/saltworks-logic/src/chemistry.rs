//! Pure chemistry helpers - charges, stoichiometry, formula formatting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of an ionic bond an ion sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IonKind {
    Cation,
    Anion,
}

impl IonKind {
    /// +1 for cations, -1 for anions.
    pub fn sign(self) -> i32 {
        match self {
            IonKind::Cation => 1,
            IonKind::Anion => -1,
        }
    }

    pub fn sign_char(self) -> char {
        match self {
            IonKind::Cation => '+',
            IonKind::Anion => '-',
        }
    }

    pub fn from_charge(charge: i32) -> Self {
        if charge < 0 {
            IonKind::Anion
        } else {
            IonKind::Cation
        }
    }
}

/// Euclidean greatest common divisor. `gcd(0, 0) == 0`.
pub fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Least common multiple, `|a*b| / gcd(a, b)`. Zero if either input is zero.
pub fn lcm(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// Minimum whole-number ion counts for one neutral formula unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stoichiometry {
    pub cations: u32,
    pub anions: u32,
    /// Total positive (and negative) charge in one formula unit.
    pub lcm: u32,
}

impl Stoichiometry {
    pub fn total(&self) -> u32 {
        self.cations + self.anions
    }
}

/// How many cations and anions form one neutral unit.
///
/// Charge magnitudes below 1 are treated as 1 so malformed data still yields
/// a usable (if chemically odd) 1:1 ratio instead of a division by zero.
pub fn stoichiometric_counts(cation_charge: u32, anion_charge: u32) -> Stoichiometry {
    let c = cation_charge.max(1);
    let a = anion_charge.max(1);
    let l = lcm(c, a);
    Stoichiometry {
        cations: l / c,
        anions: l / a,
        lcm: l,
    }
}

/// Parse a signed charge out of an ion symbol such as `Ca2+`, `Cl-`, `SO42-`.
///
/// A symbol without a trailing `+`/`-` is unparseable and yields 0.
/// A run of two or more digits before the sign ends in the charge (`PO43-`,
/// `Hg22+`). A single digit is the charge after a single element (`Fe3+`)
/// and a subscript after a polyatomic body (`NO3-` is -1).
pub fn charge_from_symbol(symbol: &str) -> i32 {
    let symbol = symbol.trim();
    let sign = match symbol.chars().last() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return 0,
    };
    let body = &symbol[..symbol.len() - 1];
    let digits_start = body
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let root = &body[..digits_start];
    let digits = &body[digits_start..];

    if digits.is_empty() {
        return sign;
    }
    if root.is_empty() {
        return 0;
    }

    let magnitude = if digits.len() >= 2 || is_single_element(root) {
        digits[digits.len() - 1..].parse::<i32>().unwrap_or(0)
    } else {
        1
    };
    sign * magnitude
}

/// One uppercase letter optionally followed by lowercase letters.
fn is_single_element(root: &str) -> bool {
    let mut chars = root.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_lowercase()),
        _ => false,
    }
}

/// An ion symbol paired with its signed charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargedIon {
    pub symbol: String,
    pub charge: i32,
}

impl ChargedIon {
    pub fn new(symbol: impl Into<String>, charge: i32) -> Self {
        Self {
            symbol: symbol.into(),
            charge,
        }
    }
}

/// Ions bucketed by exact signed charge. Only ±1, ±2 and ±3 are kept.
#[derive(Debug, Clone, Default)]
pub struct ChargeBuckets {
    buckets: BTreeMap<i32, Vec<ChargedIon>>,
}

impl ChargeBuckets {
    /// Ions with exactly this charge (empty for unbucketable charges).
    pub fn get(&self, charge: i32) -> &[ChargedIon] {
        self.buckets.get(&charge).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn positive(&self) -> Vec<&ChargedIon> {
        [1, 2, 3].iter().flat_map(|c| self.get(*c)).collect()
    }

    pub fn negative(&self) -> Vec<&ChargedIon> {
        [-1, -2, -3].iter().flat_map(|c| self.get(*c)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }
}

/// Group ions into charge buckets, dropping anything outside ±1..±3.
pub fn group_by_charge_magnitude(ions: &[ChargedIon]) -> ChargeBuckets {
    let mut buckets: BTreeMap<i32, Vec<ChargedIon>> = BTreeMap::new();
    for ion in ions {
        if ion.charge != 0 && ion.charge.abs() <= 3 {
            buckets.entry(ion.charge).or_default().push(ion.clone());
        }
    }
    ChargeBuckets { buckets }
}

/// Format one side of a formula with its multiplicity.
///
/// `("Cl", 2)` → `Cl2`, `("OH", 2)` → `(OH)2`, `("PO4", 2)` → `(PO4)2`.
pub fn format_formula_segment(root: &str, count: u32) -> String {
    if count <= 1 {
        return root.to_string();
    }
    let uppercase = root.chars().filter(|c| c.is_ascii_uppercase()).count();
    let needs_parens = root.chars().any(|c| !c.is_ascii_alphabetic()) || uppercase > 1;
    if needs_parens {
        format!("({}){}", root, count)
    } else {
        format!("{}{}", root, count)
    }
}

/// Wrap every digit run in `<sub>` tags: `PbCl2` → `PbCl<sub>2</sub>`.
pub fn formula_to_html(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len() + 16);
    let mut in_digits = false;
    for c in formula.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                out.push_str("<sub>");
                in_digits = true;
            }
        } else if in_digits {
            out.push_str("</sub>");
            in_digits = false;
        }
        out.push(c);
    }
    if in_digits {
        out.push_str("</sub>");
    }
    out
}
