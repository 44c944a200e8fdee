use crate::catalog::Catalog;
use crate::engine::{SelectionController, SummaryProjector};
use crate::models::{ppm_to_kg_ha, Nutrient};
use std::fmt::Write as _;

/// Renders the correction plan as plain text: one block per deficient
/// nutrient (main nutrients first) with original/new/requirement/target
/// figures, per-product application lines, cross-contribution notes, and
/// a closing unique-product list.
pub struct ReportRenderer<'a> {
    controller: &'a SelectionController,
    deficiency_threshold_percent: f64,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(controller: &'a SelectionController, deficiency_threshold_percent: f64) -> Self {
        Self {
            controller,
            deficiency_threshold_percent,
        }
    }

    pub fn render(&self) -> String {
        let catalog = self.controller.catalog();
        let deficient = catalog.deficient_nutrients(self.deficiency_threshold_percent);

        let mut out = String::new();
        let _ = writeln!(out, "Soil Corrections");
        let _ = writeln!(out, "================");

        if deficient.is_empty() {
            let _ = writeln!(out, "No corrections needed. All nutrients are optimal!");
            return out;
        }

        for nutrient in &deficient {
            self.render_nutrient(&mut out, nutrient, catalog);
        }

        self.render_products(&mut out);
        out
    }

    fn render_nutrient(&self, out: &mut String, nutrient: &Nutrient, catalog: &Catalog) {
        let new_value = self.controller.projected_level(nutrient);
        let requirement = (nutrient.ideal - new_value).max(0.0);

        let _ = writeln!(out);
        let label = nutrient.assay.as_deref().unwrap_or(nutrient.name.as_str());
        let _ = writeln!(
            out,
            "{}: Current: {:.1} {unit}, Target: {:.1} {unit}, Needed: {:.1} {unit}.",
            label,
            nutrient.current,
            nutrient.ideal,
            requirement,
            unit = nutrient.unit
        );

        if nutrient.ideal > 0.0 {
            let deviation = new_value - nutrient.ideal;
            let percent_diff = deviation / nutrient.ideal * 100.0;
            let flag = if percent_diff.abs() > self.deficiency_threshold_percent {
                " [!]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  Deviation: {:+.1}% ({:+.1} {}, {:+.1} kg/ha){}",
                percent_diff,
                deviation,
                nutrient.unit,
                ppm_to_kg_ha(deviation),
                flag
            );
        }

        for (name, value) in [
            ("Original", nutrient.current),
            ("New", new_value),
            ("Requirement", requirement),
            ("Target", nutrient.ideal),
        ] {
            let _ = writeln!(
                out,
                "  {:<12} {:>8.1} {} ({:.1} kg/ha)",
                name,
                value,
                nutrient.unit,
                ppm_to_kg_ha(value)
            );
        }

        for selection in self.controller.store().selections_for(&nutrient.name) {
            let Some(product) = catalog.fertilizer(&selection.fertilizer) else {
                continue;
            };
            let rate = selection.rate.unwrap_or(0.0);
            let main_percent = product.percent_of(&nutrient.name);
            let main_added = rate * main_percent / 100.0;
            let _ = write!(
                out,
                "  Applying {:.1} kg/ha of {} adds {:.1} kg/ha of {}",
                rate, product.name, main_added, nutrient.name
            );
            let others: Vec<String> = product
                .contains
                .iter()
                .filter(|n| **n != nutrient.name)
                .map(|n| format!("{}: {:.1} kg/ha", n, rate * product.percent_of(n) / 100.0))
                .collect();
            if others.is_empty() {
                let _ = writeln!(out);
            } else {
                let _ = writeln!(out, " (also adds: {})", others.join(", "));
            }

            if let Some(quote) = self.controller.quote(&nutrient.name, &product.name) {
                if quote.is_capped() {
                    if let Some(limiting) = &quote.limiting {
                        let _ = writeln!(
                            out,
                            "    Rate capped due to {} excess ({:.1} kg/ha, capped at {:.1} kg/ha)",
                            limiting, quote.uncapped, quote.capped
                        );
                    }
                }
                if quote.capped_to_zero() {
                    let _ = writeln!(
                        out,
                        "    No safe non-zero rate: every amount would push {} past its ceiling",
                        quote.limiting.as_deref().unwrap_or("another nutrient")
                    );
                }
            }
        }

        self.render_cross_contributions(out, nutrient, catalog);
    }

    /// Note contributions arriving from products selected for *other*
    /// nutrients, so the reader sees why "New" moved without a selection
    /// here.
    fn render_cross_contributions(&self, out: &mut String, nutrient: &Nutrient, catalog: &Catalog) {
        for (owning, selections) in self.controller.store().iter() {
            if owning == &nutrient.name {
                continue;
            }
            for selection in selections {
                let Some(product) = catalog.fertilizer(&selection.fertilizer) else {
                    continue;
                };
                let percent = product.percent_of(&nutrient.name);
                let rate = selection.rate.unwrap_or(0.0);
                let added = rate * percent / 100.0;
                if added > 0.0 {
                    let _ = writeln!(
                        out,
                        "  {} rose by {:.1} {} because {} was treated with {}, which also contains {}.",
                        nutrient.name,
                        added / crate::models::PPM_TO_KG_HA,
                        nutrient.unit,
                        owning,
                        product.name,
                        nutrient.name
                    );
                }
            }
        }
    }

    fn render_products(&self, out: &mut String) {
        let summary = SummaryProjector::new(self.controller).build_summary();
        if summary.products.is_empty() {
            return;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Selected Fertilizers");
        let _ = writeln!(out, "--------------------");
        for product in &summary.products {
            let _ = writeln!(
                out,
                "  {} at {:.1} {} (contains: {})",
                product.fertilizer,
                product.rate,
                product.unit,
                product.contains.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil;

    #[test]
    fn optimal_report_says_so() {
        let catalog = Catalog::new(
            vec![Nutrient::new("Calcium", 1500.0, 1500.0, "ppm")],
            Catalog::builtin_fertilizers(),
        );
        let controller = SelectionController::new(catalog);
        let report = ReportRenderer::new(&controller, 25.0).render();
        assert!(report.contains("No corrections needed"));
    }

    #[test]
    fn report_lists_selection_and_cap() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Dolomite", None);

        let report = ReportRenderer::new(&controller, 25.0).render();
        assert!(report.contains("Applying 545.5 kg/ha of Dolomite"));
        assert!(report.contains("Rate capped due to Magnesium excess"));
        assert!(report.contains("Selected Fertilizers"));
    }

    #[test]
    fn cross_contribution_noted_for_other_nutrient() {
        let mut controller = SelectionController::new(testutil::catalog());
        controller.select_fertilizer("Calcium", "Gypsum (Calcium Sulfate)", None);
        controller.set_rate("Calcium", "Gypsum (Calcium Sulfate)", 100.0);

        // Sulphur is deficient and receives 18 kg/ha from the Gypsum
        // selected for Calcium.
        let report = ReportRenderer::new(&controller, 25.0).render();
        assert!(report.contains("because Calcium was treated with Gypsum (Calcium Sulfate)"));
    }
}
