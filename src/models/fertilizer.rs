use crate::error::{Result, SoilAmendError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fertilizer product. `nutrient_content` maps generic nutrient names to
/// the percent of the product's mass that is that nutrient; `contains` is
/// the ordered list of nutrients the product supplies. Invariant: every
/// name in `contains` has a positive entry in `nutrient_content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fertilizer {
    pub name: String,
    pub nutrient_content: HashMap<String, f64>,
    #[serde(default)]
    pub contains: Vec<String>,
}

impl Fertilizer {
    pub fn new(name: impl Into<String>, content: &[(&str, f64)]) -> Self {
        let nutrient_content: HashMap<String, f64> = content
            .iter()
            .map(|(n, p)| (n.to_string(), *p))
            .collect();
        let contains = content
            .iter()
            .filter(|(_, p)| *p > 0.0)
            .map(|(n, _)| n.to_string())
            .collect();
        Self {
            name: name.into(),
            nutrient_content,
            contains,
        }
    }

    /// Percent content for a nutrient, 0 when the product does not carry it.
    pub fn percent_of(&self, nutrient: &str) -> f64 {
        self.nutrient_content.get(nutrient).copied().unwrap_or(0.0)
    }

    pub fn supplies(&self, nutrient: &str) -> bool {
        self.percent_of(nutrient) > 0.0
    }

    /// More than one supplied nutrient, so applying it for one nutrient can
    /// push another past its excess ceiling.
    pub fn is_compound(&self) -> bool {
        self.contains.len() > 1
    }

    /// Rebuild `contains` from the content map when a catalog file omitted
    /// it. Ordered by descending percent, then name, for determinism.
    pub fn derive_contains(&mut self) {
        if !self.contains.is_empty() {
            return;
        }
        let mut entries: Vec<(&String, &f64)> = self
            .nutrient_content
            .iter()
            .filter(|(_, p)| **p > 0.0)
            .collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        self.contains = entries.into_iter().map(|(n, _)| n.clone()).collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SoilAmendError::InvalidData(
                "fertilizer with empty name".into(),
            ));
        }
        for nutrient in &self.contains {
            if self.percent_of(nutrient) <= 0.0 {
                return Err(SoilAmendError::InvalidData(format!(
                    "fertilizer '{}' lists '{}' but has no positive content for it",
                    self.name, nutrient
                )));
            }
        }
        Ok(())
    }

    /// "Calcium 30%, Magnesium 22%" in `contains` order, for display.
    pub fn content_summary(&self) -> String {
        self.contains
            .iter()
            .map(|n| format!("{} {}%", n, self.percent_of(n)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
