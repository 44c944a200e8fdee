use serde::{Deserialize, Serialize};

/// Conversion between soil-test levels (ppm) and field application mass
/// (kg/ha). Fixed factor used throughout the lab reports this engine
/// consumes.
pub const PPM_TO_KG_HA: f64 = 2.4;

pub fn ppm_to_kg_ha(ppm: f64) -> f64 {
    ppm * PPM_TO_KG_HA
}

pub fn kg_ha_to_ppm(kg_ha: f64) -> f64 {
    kg_ha / PPM_TO_KG_HA
}

/// Application rates are quoted to one decimal place.
pub fn round_rate(rate: f64) -> f64 {
    (rate * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NutrientStatus {
    Low,
    Optimal,
    High,
}

impl NutrientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientStatus::Low => "Low",
            NutrientStatus::Optimal => "Optimal",
            NutrientStatus::High => "High",
        }
    }
}

impl std::fmt::Display for NutrientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One measured nutrient from a soil test. `current` and `ideal` share the
/// same unit (ppm in practice). `name` is the generic nutrient name used as
/// the unique key everywhere; `assay` keeps the lab's method-qualified label
/// for display when the report used one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    pub current: f64,
    pub ideal: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assay: Option<String>,
}

impl Nutrient {
    pub fn new(name: impl Into<String>, current: f64, ideal: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current,
            ideal,
            unit: unit.into(),
            assay: None,
        }
    }

    pub fn with_assay(mut self, assay: impl Into<String>) -> Self {
        self.assay = Some(assay.into());
        self
    }

    /// Remaining shortfall against the target, in level units. Never negative.
    pub fn deficit(&self) -> f64 {
        (self.ideal - self.current).max(0.0)
    }

    /// Signed deviation from the target as a percentage of the target.
    /// `None` when the target is zero (no meaningful percentage exists).
    pub fn deviation_percent(&self) -> Option<f64> {
        if self.ideal <= 0.0 {
            return None;
        }
        Some((self.current - self.ideal) / self.ideal * 100.0)
    }

    /// Classify against the target using a symmetric deviation threshold.
    /// A zero target means no correction is possible, which reads as Optimal.
    pub fn status(&self, threshold_percent: f64) -> NutrientStatus {
        match self.deviation_percent() {
            None => NutrientStatus::Optimal,
            Some(d) if d < -threshold_percent => NutrientStatus::Low,
            Some(d) if d > threshold_percent => NutrientStatus::High,
            Some(_) => NutrientStatus::Optimal,
        }
    }

    pub fn is_deficient(&self, threshold_percent: f64) -> bool {
        self.status(threshold_percent) == NutrientStatus::Low
    }

    /// Highest level this nutrient may reach as a side effect of correcting
    /// another nutrient, in level units.
    pub fn excess_ceiling(&self, allowed_excess_percent: f64) -> f64 {
        self.ideal * (1.0 + allowed_excess_percent / 100.0)
    }
}
