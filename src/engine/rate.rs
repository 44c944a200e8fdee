use crate::catalog::Catalog;
use crate::engine::ContributionLedger;
use crate::models::{kg_ha_to_ppm, ppm_to_kg_ha, round_rate, Fertilizer, Nutrient, SelectionStore};

/// Why a quote carries the rates it does. A capped-to-zero `Applicable`
/// quote ("no safe non-zero rate exists") is a different situation from
/// `NoContent` ("this product does not address the nutrient at all"), and
/// consumers render them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// The product has no content for the target nutrient.
    NoContent,
    /// The target is already at or above its ideal, counting contributions
    /// from other selections.
    NoDeficit,
    /// A real rate was computed (possibly capped, possibly to zero).
    Applicable,
}

/// Result of a rate computation: the rate that would close the remaining
/// deficit, the rate after excess ceilings on the product's other
/// nutrients, and which nutrient bound the cap if one did.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub uncapped: f64,
    pub capped: f64,
    pub limiting: Option<String>,
    pub relevance: Relevance,
}

impl RateQuote {
    fn zero(relevance: Relevance) -> Self {
        Self {
            uncapped: 0.0,
            capped: 0.0,
            limiting: None,
            relevance,
        }
    }

    /// A ceiling on another nutrient reduced the rate below what the
    /// deficit alone called for.
    pub fn is_capped(&self) -> bool {
        self.relevance == Relevance::Applicable && self.capped < self.uncapped
    }

    /// The product is relevant but no amount of it can be applied safely.
    pub fn capped_to_zero(&self) -> bool {
        self.relevance == Relevance::Applicable && self.capped == 0.0 && self.uncapped > 0.0
    }
}

/// Computes the application rate for one (nutrient, product) pair against
/// the current selection state. Pure: identical state in, identical quote
/// out — the same call backs both rate seeding and dropdown previews.
pub struct RateCalculator<'a> {
    catalog: &'a Catalog,
    store: &'a SelectionStore,
}

impl<'a> RateCalculator<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a SelectionStore) -> Self {
        Self { catalog, store }
    }

    pub fn compute_rate(
        &self,
        target: &Nutrient,
        fertilizer: &Fertilizer,
        excess_percent: f64,
    ) -> RateQuote {
        let percent = fertilizer.percent_of(&target.name);
        if percent <= 0.0 {
            return RateQuote::zero(Relevance::NoContent);
        }

        let ledger = ContributionLedger::new(self.catalog, self.store);
        let exclude = Some((fertilizer.name.as_str(), target.name.as_str()));

        let already_added = ledger.already_added(&target.name, exclude);
        let remaining_ppm =
            (target.ideal - (target.current + kg_ha_to_ppm(already_added))).max(0.0);
        let remaining_kg_ha = ppm_to_kg_ha(remaining_ppm);
        if remaining_kg_ha <= 0.0 {
            return RateQuote::zero(Relevance::NoDeficit);
        }

        let uncapped = round_rate(remaining_kg_ha * 100.0 / percent);

        let mut capped = uncapped;
        let mut limiting = None;
        if fertilizer.is_compound() {
            for other in &fertilizer.contains {
                if *other == target.name {
                    continue;
                }
                let Some(nutrient) = self.catalog.nutrient(other) else {
                    tracing::debug!(nutrient = %other, "cap check skipped unmeasured nutrient");
                    continue;
                };
                let other_percent = fertilizer.percent_of(other);
                if other_percent <= 0.0 {
                    continue;
                }
                let ceiling_kg_ha = ppm_to_kg_ha(nutrient.excess_ceiling(excess_percent));
                let already_other = ledger.already_added(other, exclude);
                let headroom_kg_ha =
                    ceiling_kg_ha - (ppm_to_kg_ha(nutrient.current) + already_other);
                let max_rate = if headroom_kg_ha > 0.0 {
                    headroom_kg_ha * 100.0 / other_percent
                } else {
                    0.0
                };
                if max_rate < capped {
                    capped = max_rate;
                    limiting = Some(other.clone());
                }
            }
        }

        RateQuote {
            uncapped,
            capped: round_rate(capped.max(0.0)),
            limiting,
            relevance: Relevance::Applicable,
        }
    }
}
