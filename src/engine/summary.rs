use crate::engine::{RateCalculator, SelectionController};
use crate::models::{AmendmentSummary, ProductTotal, SummaryRow};
use std::collections::BTreeMap;

/// Flattens the controller's selection state into reporting rows: one row
/// per (owning nutrient, product, contained nutrient). Rows are not
/// deduplicated by product; the unique-product view lives alongside in
/// `products`, collapsed by name with the highest rate seen.
pub struct SummaryProjector<'a> {
    controller: &'a SelectionController,
}

impl<'a> SummaryProjector<'a> {
    pub fn new(controller: &'a SelectionController) -> Self {
        Self { controller }
    }

    pub fn build_summary(&self) -> AmendmentSummary {
        let catalog = self.controller.catalog();
        let store = self.controller.store();
        let calc = RateCalculator::new(catalog, store);

        let mut rows = Vec::new();
        for (owning, selections) in store.iter() {
            for selection in selections {
                let Some(product) = catalog.fertilizer(&selection.fertilizer) else {
                    tracing::debug!(
                        fertilizer = %selection.fertilizer,
                        "summary skipped unknown fertilizer"
                    );
                    continue;
                };
                let rate = match selection.rate {
                    Some(rate) => rate,
                    None => match catalog.nutrient(owning) {
                        Some(nutrient) => {
                            calc.compute_rate(nutrient, product, self.controller.excess_percent())
                                .capped
                        }
                        None => 0.0,
                    },
                };
                for contained in &product.contains {
                    let percent = product.percent_of(contained);
                    rows.push(SummaryRow {
                        fertilizer: product.name.clone(),
                        nutrient: contained.clone(),
                        rate,
                        actual_nutrient_applied: rate * percent / 100.0,
                        unit: "kg/ha".to_string(),
                        contains: product.contains.clone(),
                        owning_nutrients: vec![owning.clone()],
                    });
                }
            }
        }

        let mut by_product: BTreeMap<&str, &SummaryRow> = BTreeMap::new();
        for row in &rows {
            match by_product.get(row.fertilizer.as_str()) {
                Some(existing) if existing.rate >= row.rate => {}
                _ => {
                    by_product.insert(row.fertilizer.as_str(), row);
                }
            }
        }
        let products = by_product
            .into_values()
            .map(|row| ProductTotal {
                fertilizer: row.fertilizer.clone(),
                rate: row.rate,
                unit: row.unit.clone(),
                contains: row.contains.clone(),
            })
            .collect();

        AmendmentSummary {
            generated_at: chrono::Utc::now(),
            rows,
            products,
        }
    }
}
