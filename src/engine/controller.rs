use crate::catalog::Catalog;
use crate::engine::{RateCalculator, RateQuote, DEFAULT_ALLOWED_EXCESS_PERCENT};
use crate::models::{kg_ha_to_ppm, Fertilizer, Nutrient, SelectionStore};

/// Owns the selection state for a session and applies every mutation the
/// report workflow needs: pick a product for a nutrient, edit a rate,
/// remove or reset, and read back projected levels. Reads are recomputed
/// from scratch against current state — no cached derived values to go
/// stale.
///
/// Unknown nutrient or product names never error; they are skipped with a
/// debug event so a partially-loaded catalog cannot wedge the workflow.
pub struct SelectionController {
    catalog: Catalog,
    store: SelectionStore,
    excess_percent: f64,
}

impl SelectionController {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            store: SelectionStore::new(),
            excess_percent: DEFAULT_ALLOWED_EXCESS_PERCENT,
        }
    }

    pub fn with_excess_percent(mut self, percent: f64) -> Self {
        self.set_excess_percent(percent);
        self
    }

    pub fn set_excess_percent(&mut self, percent: f64) {
        self.excess_percent = percent.clamp(0.0, 100.0);
    }

    pub fn excess_percent(&self) -> f64 {
        self.excess_percent
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Preview the quote a product would get for a nutrient right now,
    /// without mutating anything. The same computation backs seeding, so
    /// the preview and the seeded rate always agree.
    pub fn quote(&self, owning: &str, fertilizer: &str) -> Option<RateQuote> {
        let nutrient = self.catalog.nutrient(owning)?;
        let product = self.catalog.fertilizer(fertilizer)?;
        let calc = RateCalculator::new(&self.catalog, &self.store);
        Some(calc.compute_rate(nutrient, product, self.excess_percent))
    }

    /// Add a product to a nutrient's selection list (or replace the entry
    /// at `index`), then seed the new entry's rate with the capped quote
    /// computed against everything else already selected — so sequential
    /// entries see a moving baseline. A rate is only ever seeded where none
    /// exists; nothing a user typed is overwritten.
    ///
    /// Returns the quote used for seeding, or `None` when the call was
    /// skipped (unknown names, or the product is already in this list).
    pub fn select_fertilizer(
        &mut self,
        owning: &str,
        fertilizer: &str,
        index: Option<usize>,
    ) -> Option<RateQuote> {
        if self.catalog.nutrient(owning).is_none() {
            tracing::debug!(owning, "select for unknown nutrient ignored");
            return None;
        }
        if self.catalog.fertilizer(fertilizer).is_none() {
            tracing::debug!(fertilizer, "select of unknown fertilizer ignored");
            return None;
        }
        if self.store.contains(owning, fertilizer) {
            tracing::debug!(owning, fertilizer, "product already selected for nutrient");
            return None;
        }

        match index {
            Some(i) => self.store.replace(owning, i, fertilizer),
            None => self.store.push(owning, fertilizer),
        }

        let quote = self.quote(owning, fertilizer)?;
        self.store.seed_rate(owning, fertilizer, quote.capped);
        Some(quote)
    }

    /// Direct rate overwrite. Deliberately does not revisit other entries'
    /// caps; a later selection or preview recomputes against the new state.
    pub fn set_rate(&mut self, owning: &str, fertilizer: &str, rate: f64) {
        self.store.set_rate(owning, fertilizer, rate);
    }

    /// Splice out one entry. Remaining entries keep their rates.
    pub fn remove_selection(&mut self, owning: &str, index: usize) -> Option<String> {
        self.store.remove(owning, index)
    }

    /// Clear a nutrient's whole selection list. Entries (and rates) the
    /// same products have under other nutrients are untouched.
    pub fn reset_nutrient(&mut self, owning: &str) {
        self.store.clear_nutrient(owning);
    }

    /// The rate an entry effectively applies at: the stored rate, or the
    /// capped quote the calculator would seed if none is stored yet.
    fn effective_rate(&self, owning: &str, product: &Fertilizer) -> f64 {
        if let Some(rate) = self.store.rate(owning, &product.name) {
            return rate;
        }
        match self.catalog.nutrient(owning) {
            Some(nutrient) => {
                let calc = RateCalculator::new(&self.catalog, &self.store);
                calc.compute_rate(nutrient, product, self.excess_percent).capped
            }
            None => 0.0,
        }
    }

    /// The "New" level for a nutrient: its current reading plus everything
    /// every selected product (under any owning nutrient) contributes to
    /// it, converted back to level units.
    pub fn projected_level(&self, nutrient: &Nutrient) -> f64 {
        let mut total_kg_ha = 0.0;
        for (owning, selections) in self.store.iter() {
            for selection in selections {
                let Some(product) = self.catalog.fertilizer(&selection.fertilizer) else {
                    tracing::debug!(
                        fertilizer = %selection.fertilizer,
                        "projection skipped unknown fertilizer"
                    );
                    continue;
                };
                let percent = product.percent_of(&nutrient.name);
                if percent <= 0.0 {
                    continue;
                }
                let rate = match selection.rate {
                    Some(rate) => rate,
                    None => self.effective_rate(owning, product),
                };
                total_kg_ha += rate * percent / 100.0;
            }
        }
        nutrient.current + kg_ha_to_ppm(total_kg_ha)
    }

    /// Projected levels for every measured nutrient, recomputed in one
    /// pass. Callers treat a mutation plus this read as one step.
    pub fn projected_levels(&self) -> Vec<(String, f64)> {
        self.catalog
            .nutrients()
            .iter()
            .map(|n| (n.name.clone(), self.projected_level(n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil;
    use crate::models::round_rate;

    #[test]
    fn select_seeds_capped_rate() {
        let mut controller = SelectionController::new(testutil::catalog());
        let quote = controller
            .select_fertilizer("Calcium", "Dolomite", None)
            .unwrap();

        assert_eq!(quote.capped, 545.5);
        assert_eq!(
            controller.store().rate("Calcium", "Dolomite"),
            Some(545.5)
        );
    }

    #[test]
    fn preview_and_seed_agree() {
        let controller = {
            let mut c = SelectionController::new(testutil::catalog());
            c.select_fertilizer("Sulphur", "Elemental Sulfur", None);
            c
        };
        let preview = controller.quote("Calcium", "Dolomite").unwrap();

        let mut mutated = controller;
        let seeded = mutated
            .select_fertilizer("Calcium", "Dolomite", None)
            .unwrap();
        assert_eq!(preview, seeded);
    }

    #[test]
    fn sequential_entries_see_moving_baseline() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Agricultural Limestone (CaCO₃)", None);
        controller.set_rate("Calcium", "Agricultural Limestone (CaCO₃)", 400.0);

        // 400 kg/ha of 38% limestone already supplies 152 kg/ha of Ca, so
        // Dolomite's uncapped rate is computed against the shrunken deficit.
        let quote = controller
            .select_fertilizer("Calcium", "Dolomite", None)
            .unwrap();
        let expected = round_rate((1200.0 - 152.0) * 100.0 / 30.0);
        assert_eq!(quote.uncapped, expected);
        assert_eq!(quote.capped, 545.5); // magnesium cap still binds
    }

    #[test]
    fn fully_met_deficit_seeds_zero() {
        let mut controller = SelectionController::new(testutil::catalog());
        let first = controller
            .select_fertilizer("Calcium", "Agricultural Limestone (CaCO₃)", None)
            .unwrap();
        // Limestone alone closes the whole deficit
        assert!(first.capped > 0.0);

        let second = controller
            .select_fertilizer("Calcium", "Triple Superphosphate", None)
            .unwrap();
        assert_eq!(second.relevance, crate::engine::Relevance::NoDeficit);
        assert_eq!(
            controller.store().rate("Calcium", "Triple Superphosphate"),
            Some(0.0)
        );
    }

    #[test]
    fn duplicate_selection_is_noop() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);
        assert!(controller
            .select_fertilizer("Calcium", "Dolomite", None)
            .is_none());
        assert_eq!(controller.store().selections_for("Calcium").len(), 1);
    }

    #[test]
    fn unknown_names_are_skipped() {
        let mut controller = SelectionController::new(testutil::catalog());
        assert!(controller
            .select_fertilizer("Calcium", "Mystery Blend", None)
            .is_none());
        assert!(controller
            .select_fertilizer("Unobtainium", "Dolomite", None)
            .is_none());
        assert!(controller.store().is_empty());
    }

    #[test]
    fn replace_reseeds_only_the_replaced_entry() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Agricultural Limestone (CaCO₃)", None);
        controller.set_rate("Calcium", "Agricultural Limestone (CaCO₃)", 400.0);
        controller.select_fertilizer("Calcium", "Gypsum (Calcium Sulfate)", None);

        controller.select_fertilizer("Calcium", "Dolomite", Some(1));
        let selections = controller.store().selections_for("Calcium");
        assert_eq!(selections[1].fertilizer, "Dolomite");
        assert!(selections[1].rate.is_some());
        // The untouched entry keeps the rate the user typed
        assert_eq!(
            controller
                .store()
                .rate("Calcium", "Agricultural Limestone (CaCO₃)"),
            Some(400.0)
        );
    }

    #[test]
    fn same_product_under_two_nutrients_contributes_twice() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);
        controller.set_rate("Calcium", "Dolomite", 500.0);
        controller.select_fertilizer("Magnesium", "Dolomite", None);
        controller.set_rate("Magnesium", "Dolomite", 100.0);

        // Both entries feed Magnesium: (500 + 100) kg/ha * 22% / 2.4
        let magnesium = controller.catalog().nutrient("Magnesium").unwrap().clone();
        let projected = controller.projected_level(&magnesium);
        let expected = 100.0 + (600.0 * 22.0 / 100.0) / 2.4;
        assert!((projected - expected).abs() < 1e-9);

        // And both feed Calcium
        let calcium = controller.catalog().nutrient("Calcium").unwrap().clone();
        let projected = controller.projected_level(&calcium);
        let expected = 1000.0 + (600.0 * 30.0 / 100.0) / 2.4;
        assert!((projected - expected).abs() < 1e-9);
    }

    #[test]
    fn reset_keeps_rates_owned_by_other_nutrients() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);
        controller.set_rate("Calcium", "Dolomite", 500.0);
        controller.select_fertilizer("Magnesium", "Dolomite", None);
        controller.set_rate("Magnesium", "Dolomite", 100.0);

        controller.reset_nutrient("Calcium");
        assert!(controller.store().selections_for("Calcium").is_empty());
        assert_eq!(controller.store().rate("Magnesium", "Dolomite"), Some(100.0));

        let magnesium = controller.catalog().nutrient("Magnesium").unwrap().clone();
        let projected = controller.projected_level(&magnesium);
        let expected = 100.0 + (100.0 * 22.0 / 100.0) / 2.4;
        assert!((projected - expected).abs() < 1e-9);
    }

    #[test]
    fn remove_does_not_reseed_remaining_entries() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Agricultural Limestone (CaCO₃)", None);
        controller.set_rate("Calcium", "Agricultural Limestone (CaCO₃)", 400.0);
        let dolomite_quote = controller
            .select_fertilizer("Calcium", "Dolomite", None)
            .unwrap();

        let removed = controller.remove_selection("Calcium", 0);
        assert_eq!(removed.as_deref(), Some("Agricultural Limestone (CaCO₃)"));
        // Dolomite's rate stays what was seeded against the old baseline
        assert_eq!(
            controller.store().rate("Calcium", "Dolomite"),
            Some(dolomite_quote.capped)
        );
    }

    #[test]
    fn set_rate_does_not_disturb_other_entries() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);
        controller.select_fertilizer("Magnesium", "Kieserite (Magnesium Sulfate Monohydrate)", None);
        let kieserite_before = controller
            .store()
            .rate("Magnesium", "Kieserite (Magnesium Sulfate Monohydrate)");

        controller.set_rate("Calcium", "Dolomite", 9999.0);
        // Deliberately no recomputation of the other entry's cap
        assert_eq!(
            controller
                .store()
                .rate("Magnesium", "Kieserite (Magnesium Sulfate Monohydrate)"),
            kieserite_before
        );
    }

    #[test]
    fn projected_levels_deterministic() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);
        controller.select_fertilizer("Sulphur", "Gypsum (Calcium Sulfate)", None);

        assert_eq!(controller.projected_levels(), controller.projected_levels());
    }

    #[test]
    fn excess_percent_clamped() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.set_excess_percent(150.0);
        assert_eq!(controller.excess_percent(), 100.0);
        controller.set_excess_percent(-5.0);
        assert_eq!(controller.excess_percent(), 0.0);
    }
}
