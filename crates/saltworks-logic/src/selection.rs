//! The player's pending ion selection and its chemistry checks.

use crate::board::TokenId;
use crate::chemistry::IonKind;
use serde::{Deserialize, Serialize};

/// One tapped board token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedIon {
    pub token: TokenId,
    pub slot: usize,
    pub symbol: String,
    /// Signed charge of the ion.
    pub charge: i32,
}

impl SelectedIon {
    pub fn kind(&self) -> IonKind {
        IonKind::from_charge(self.charge)
    }
}

/// Why a selection cannot form a compound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Ions with the same charge don't form a neutral ionic compound.")]
    MixedChargeRequired,
    #[error("Too many different types of ions. Focus on two ions at a time.")]
    TooManyIonTypes,
    #[error("{summary} • Balance the charges.")]
    ChargeImbalance { net: i32, summary: String },
}

/// Ordered multiset of selected tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionSet {
    entries: Vec<SelectedIon>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SelectedIon] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Add the token, or remove it if already selected.
    /// Returns true when the token ends up selected.
    pub fn toggle(&mut self, ion: SelectedIon) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.token == ion.token) {
            self.entries.remove(pos);
            false
        } else {
            self.entries.push(ion);
            true
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&SelectedIon) -> bool) {
        self.entries.retain(keep);
    }

    /// Distinct symbols in first-selected order.
    pub fn distinct_symbols(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for e in &self.entries {
            if !seen.contains(&e.symbol.as_str()) {
                seen.push(&e.symbol);
            }
        }
        seen
    }

    /// Number of selected tokens carrying `symbol`.
    pub fn count_of(&self, symbol: &str) -> usize {
        self.entries.iter().filter(|e| e.symbol == symbol).count()
    }

    pub fn net_charge(&self) -> i32 {
        self.entries.iter().map(|e| e.charge).sum()
    }

    pub fn first_of(&self, kind: IonKind) -> Option<&SelectedIon> {
        self.entries.iter().find(|e| e.kind() == kind)
    }

    /// Run the three checks in order, stopping at the first failure.
    pub fn validate(&self) -> Result<(), SelectionError> {
        let has_cation = self.first_of(IonKind::Cation).is_some();
        let has_anion = self.first_of(IonKind::Anion).is_some();
        if !has_cation || !has_anion {
            return Err(SelectionError::MixedChargeRequired);
        }

        if self.distinct_symbols().len() > 2 {
            return Err(SelectionError::TooManyIonTypes);
        }

        let net = self.net_charge();
        if net != 0 {
            return Err(SelectionError::ChargeImbalance {
                net,
                summary: self.charge_summary(),
            });
        }
        Ok(())
    }

    /// `Ca2+ ion charge: 2+ | Cl- ion charge: 1-`
    pub fn charge_summary(&self) -> String {
        self.distinct_symbols()
            .into_iter()
            .filter_map(|symbol| self.entries.iter().find(|e| e.symbol == symbol))
            .map(|e| {
                let sign = if e.charge < 0 { '-' } else { '+' };
                format!("{} ion charge: {}{}", e.symbol, e.charge.unsigned_abs(), sign)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(set: &mut SelectionSet, id: u32, symbol: &str, charge: i32) {
        set.toggle(SelectedIon {
            token: TokenId(id),
            slot: id as usize,
            symbol: symbol.into(),
            charge,
        });
    }

    #[test]
    fn test_balanced_pair_passes() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Na+", 1);
        pick(&mut set, 2, "Cl-", -1);
        assert_eq!(set.validate(), Ok(()));
    }

    #[test]
    fn test_imbalanced_pair_reports_net_charge() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Ca2+", 2);
        pick(&mut set, 2, "Cl-", -1);
        match set.validate() {
            Err(SelectionError::ChargeImbalance { net, summary }) => {
                assert_eq!(net, 1);
                assert_eq!(summary, "Ca2+ ion charge: 2+ | Cl- ion charge: 1-");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_same_sign_fails_first() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Na+", 1);
        pick(&mut set, 2, "K+", 1);
        pick(&mut set, 3, "Li+", 1);
        assert_eq!(set.validate(), Err(SelectionError::MixedChargeRequired));
    }

    #[test]
    fn test_three_symbols_rejected() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Na+", 1);
        pick(&mut set, 2, "K+", 1);
        pick(&mut set, 3, "O2-", -2);
        assert_eq!(set.validate(), Err(SelectionError::TooManyIonTypes));
    }

    #[test]
    fn test_multiset_balance() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Ca2+", 2);
        pick(&mut set, 2, "Cl-", -1);
        pick(&mut set, 3, "Cl-", -1);
        assert!(set.validate().is_ok());
        assert_eq!(set.count_of("Cl-"), 2);
        assert_eq!(set.distinct_symbols(), vec!["Ca2+", "Cl-"]);
    }

    #[test]
    fn test_toggle_deselects() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Na+", 1);
        assert!(set.contains(TokenId(1)));
        pick(&mut set, 1, "Na+", 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_retain_prunes_entries() {
        let mut set = SelectionSet::new();
        pick(&mut set, 1, "Na+", 1);
        pick(&mut set, 2, "Cl-", -1);
        set.retain(|e| e.token != TokenId(1));
        assert_eq!(set.len(), 1);
        assert!(set.contains(TokenId(2)));
    }

    #[test]
    fn test_first_cation_respects_order() {
        let mut set = SelectionSet::new();
        pick(&mut set, 4, "Cl-", -1);
        pick(&mut set, 2, "Na+", 1);
        assert_eq!(set.first_of(IonKind::Cation).unwrap().symbol, "Na+");
        assert_eq!(set.first_of(IonKind::Anion).unwrap().token, TokenId(4));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SelectionError::TooManyIonTypes.to_string(),
            "Too many different types of ions. Focus on two ions at a time."
        );
        let err = SelectionError::ChargeImbalance {
            net: 1,
            summary: "x".into(),
        };
        assert_eq!(err.to_string(), "x • Balance the charges.");
    }
}
