use crate::catalog::Catalog;
use crate::models::SelectionStore;

/// Read-only view over the current selections that answers "how much of
/// nutrient X has already been supplied", optionally excluding one
/// (fertilizer, owning-nutrient) entry — the caller's own, when it is
/// about to decide its rate.
pub struct ContributionLedger<'a> {
    catalog: &'a Catalog,
    store: &'a SelectionStore,
}

impl<'a> ContributionLedger<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a SelectionStore) -> Self {
        Self { catalog, store }
    }

    /// Total kg/ha of `target` contributed by every selection, minus the
    /// excluded entry if given. Entries without a rate contribute nothing;
    /// entries referencing unknown products are skipped with a debug event.
    pub fn already_added(&self, target: &str, exclude: Option<(&str, &str)>) -> f64 {
        let mut total = 0.0;
        for (owning, selections) in self.store.iter() {
            for selection in selections {
                if let Some((ex_fert, ex_owner)) = exclude {
                    if selection.fertilizer == ex_fert && owning == ex_owner {
                        continue;
                    }
                }
                let Some(fertilizer) = self.catalog.fertilizer(&selection.fertilizer) else {
                    tracing::debug!(
                        fertilizer = %selection.fertilizer,
                        "skipping selection for unknown fertilizer"
                    );
                    continue;
                };
                let percent = fertilizer.percent_of(target);
                if percent <= 0.0 {
                    continue;
                }
                let rate = selection.rate.unwrap_or(0.0);
                total += rate * percent / 100.0;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil;

    #[test]
    fn empty_store_contributes_nothing() {
        let catalog = testutil::catalog();
        let store = SelectionStore::new();
        let ledger = ContributionLedger::new(&catalog, &store);
        assert_eq!(ledger.already_added("Calcium", None), 0.0);
    }

    #[test]
    fn sums_across_owning_nutrients() {
        let catalog = testutil::catalog();
        let mut store = SelectionStore::new();
        // Gypsum for Calcium: 100 kg/ha at 23% Ca, 18% S
        store.push("Calcium", "Gypsum (Calcium Sulfate)");
        store.set_rate("Calcium", "Gypsum (Calcium Sulfate)", 100.0);
        // Elemental Sulfur for Sulphur: 50 kg/ha at 90% S
        store.push("Sulphur", "Elemental Sulfur");
        store.set_rate("Sulphur", "Elemental Sulfur", 50.0);

        let ledger = ContributionLedger::new(&catalog, &store);
        assert!((ledger.already_added("Calcium", None) - 23.0).abs() < 1e-9);
        // Sulphur arrives from both selections: 18 + 45
        assert!((ledger.already_added("Sulphur", None) - 63.0).abs() < 1e-9);
        assert_eq!(ledger.already_added("Zinc", None), 0.0);
    }

    #[test]
    fn unset_rates_contribute_zero() {
        let catalog = testutil::catalog();
        let mut store = SelectionStore::new();
        store.push("Calcium", "Gypsum (Calcium Sulfate)");

        let ledger = ContributionLedger::new(&catalog, &store);
        assert_eq!(ledger.already_added("Calcium", None), 0.0);
    }

    #[test]
    fn unknown_fertilizer_skipped_silently() {
        let catalog = testutil::catalog();
        let mut store = SelectionStore::new();
        store.push("Calcium", "Mystery Blend");
        store.set_rate("Calcium", "Mystery Blend", 500.0);

        let ledger = ContributionLedger::new(&catalog, &store);
        assert_eq!(ledger.already_added("Calcium", None), 0.0);
        assert_eq!(store.dangling_selections(&catalog), 1);
    }

    #[test]
    fn exclusion_removes_exactly_one_entry() {
        let catalog = testutil::catalog();
        let mut store = SelectionStore::new();
        store.push("Calcium", "Dolomite");
        store.set_rate("Calcium", "Dolomite", 200.0);
        store.push("Magnesium", "Dolomite");
        store.set_rate("Magnesium", "Dolomite", 80.0);

        let ledger = ContributionLedger::new(&catalog, &store);
        let full = ledger.already_added("Magnesium", None);
        let without_ca_entry =
            ledger.already_added("Magnesium", Some(("Dolomite", "Calcium")));

        // Excluded entry's own contribution: 200 kg/ha * 22% Mg
        let ca_entry_contribution = 200.0 * 22.0 / 100.0;
        assert!((full - (without_ca_entry + ca_entry_contribution)).abs() < 1e-9);

        // The Magnesium-owned entry is still counted
        assert!((without_ca_entry - 80.0 * 22.0 / 100.0).abs() < 1e-9);
    }
}
