use crate::error::{Result, SoilAmendError};
use crate::models::{Fertilizer, Nutrient};
use serde::Deserialize;
use std::path::Path;

/// Nutrients ordered first in reports; everything else is secondary.
pub const MAIN_NUTRIENTS: [&str; 5] = [
    "Calcium",
    "Magnesium",
    "Potassium",
    "Phosphorus",
    "Sulphur",
];

/// Map a lab's method-qualified assay name to the generic nutrient name
/// the fertilizer catalog uses.
pub fn generic_name(assay: &str) -> Option<&'static str> {
    match assay {
        "Nitrate-N (KCl)" => Some("Nitrate"),
        "Ammonium-N (KCl)" => Some("Ammonium"),
        "Phosphorus (Mehlich III)" => Some("Phosphorus"),
        "Calcium (Mehlich III)" => Some("Calcium"),
        "Magnesium (Mehlich III)" => Some("Magnesium"),
        "Potassium (Mehlich III)" => Some("Potassium"),
        "Sodium (Mehlich III)" => Some("Sodium"),
        "Sulfur (KCl)" => Some("Sulphur"),
        "Aluminium" => Some("Aluminium"),
        "Silicon (CaCl2)" => Some("Silicon"),
        "Boron (Hot CaCl2)" => Some("Boron"),
        "Iron (DTPA)" => Some("Iron"),
        "Manganese (DTPA)" => Some("Manganese"),
        "Copper (DTPA)" => Some("Copper"),
        "Zinc (DTPA)" => Some("Zinc"),
        _ => None,
    }
}

/// Lenient numeric coercion for lab values. Censored readings ("<2.0")
/// report below the detection limit and coerce to 0; other strings parse
/// their leading numeric prefix, and anything unparseable is 0.
pub fn coerce_level(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.contains('<') {
        return 0.0;
    }
    let re = regex_lite::Regex::new(r"^-?\d+(\.\d+)?").unwrap();
    match re.find(trimmed) {
        Some(m) => {
            let value: f64 = m.as_str().parse().unwrap_or(0.0);
            value.max(0.0)
        }
        None => 0.0,
    }
}

/// The immutable session catalog: measured nutrients plus the fertilizer
/// product list. Loaded once at startup; everything downstream borrows it.
#[derive(Debug, Clone)]
pub struct Catalog {
    nutrients: Vec<Nutrient>,
    fertilizers: Vec<Fertilizer>,
}

impl Catalog {
    pub fn new(nutrients: Vec<Nutrient>, fertilizers: Vec<Fertilizer>) -> Self {
        Self {
            nutrients,
            fertilizers,
        }
    }

    pub fn nutrients(&self) -> &[Nutrient] {
        &self.nutrients
    }

    pub fn fertilizers(&self) -> &[Fertilizer] {
        &self.fertilizers
    }

    pub fn nutrient(&self, name: &str) -> Option<&Nutrient> {
        self.nutrients.iter().find(|n| n.name == name)
    }

    pub fn fertilizer(&self, name: &str) -> Option<&Fertilizer> {
        self.fertilizers.iter().find(|f| f.name == name)
    }

    /// Products that supply `nutrient`, highest percent content first
    /// (the order selection dropdowns present them in).
    pub fn fertilizers_for(&self, nutrient: &str) -> Vec<&Fertilizer> {
        let mut matches: Vec<&Fertilizer> = self
            .fertilizers
            .iter()
            .filter(|f| f.supplies(nutrient))
            .collect();
        matches.sort_by(|a, b| {
            b.percent_of(nutrient)
                .partial_cmp(&a.percent_of(nutrient))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        matches
    }

    /// Deficient nutrients in report order: main nutrients first (in their
    /// fixed order), then the rest in measured order.
    pub fn deficient_nutrients(&self, threshold_percent: f64) -> Vec<&Nutrient> {
        let deficient: Vec<&Nutrient> = self
            .nutrients
            .iter()
            .filter(|n| n.is_deficient(threshold_percent))
            .collect();

        let mut ordered: Vec<&Nutrient> = MAIN_NUTRIENTS
            .iter()
            .filter_map(|main| deficient.iter().find(|n| n.name == *main).copied())
            .collect();
        ordered.extend(
            deficient
                .iter()
                .filter(|n| !MAIN_NUTRIENTS.contains(&n.name.as_str()))
                .copied(),
        );
        ordered
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for nutrient in &self.nutrients {
            if !seen.insert(nutrient.name.as_str()) {
                return Err(SoilAmendError::Catalog(format!(
                    "duplicate nutrient '{}'",
                    nutrient.name
                )));
            }
            if nutrient.ideal < 0.0 || nutrient.current < 0.0 {
                return Err(SoilAmendError::Catalog(format!(
                    "nutrient '{}' has a negative level",
                    nutrient.name
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for fertilizer in &self.fertilizers {
            if !seen.insert(fertilizer.name.as_str()) {
                return Err(SoilAmendError::Catalog(format!(
                    "duplicate fertilizer '{}'",
                    fertilizer.name
                )));
            }
            fertilizer.validate()?;
        }
        Ok(())
    }

    /// The stock product list shipped with the tool. A catalog file
    /// replaces it wholesale when configured.
    pub fn builtin_fertilizers() -> Vec<Fertilizer> {
        vec![
            Fertilizer::new("Agricultural Limestone (CaCO₃)", &[("Calcium", 38.0)]),
            Fertilizer::new("Gypsum (Calcium Sulfate)", &[("Calcium", 23.0), ("Sulphur", 18.0)]),
            Fertilizer::new("Calcium Nitrate", &[("Calcium", 19.0), ("Nitrate", 12.0)]),
            Fertilizer::new("Dolomite", &[("Calcium", 30.0), ("Magnesium", 22.0)]),
            Fertilizer::new(
                "Kieserite (Magnesium Sulfate Monohydrate)",
                &[("Magnesium", 16.0), ("Sulphur", 22.0)],
            ),
            Fertilizer::new(
                "Epsom Salt (Magnesium Sulfate Heptahydrate)",
                &[("Magnesium", 10.0), ("Sulphur", 13.0)],
            ),
            Fertilizer::new("Magnesite", &[("Magnesium", 47.8)]),
            Fertilizer::new("Magnesium Oxide", &[("Magnesium", 60.0)]),
            Fertilizer::new("Muriate of Potash (Potassium Chloride)", &[("Potassium", 60.0)]),
            Fertilizer::new(
                "Sulfate of Potash (Potassium Sulfate)",
                &[("Potassium", 50.0), ("Sulphur", 17.0)],
            ),
            Fertilizer::new("Potassium Nitrate", &[("Potassium", 44.0), ("Nitrate", 13.0)]),
            Fertilizer::new(
                "Monopotassium Phosphate (MKP)",
                &[("Phosphorus", 22.7), ("Potassium", 28.7)],
            ),
            Fertilizer::new("Triple Superphosphate", &[("Phosphorus", 45.0), ("Calcium", 19.0)]),
            Fertilizer::new(
                "Monoammonium Phosphate (MAP)",
                &[("Phosphorus", 22.0), ("Ammonium", 11.0)],
            ),
            Fertilizer::new(
                "Diammonium Phosphate (DAP)",
                &[("Phosphorus", 20.0), ("Ammonium", 18.0)],
            ),
            Fertilizer::new("Rock Phosphate", &[("Phosphorus", 25.0), ("Calcium", 30.0)]),
            Fertilizer::new("Elemental Sulfur", &[("Sulphur", 90.0)]),
            Fertilizer::new("Ammonium Sulfate", &[("Ammonium", 21.0), ("Sulphur", 24.0)]),
            Fertilizer::new("Zinc Sulfate (ZnSO₄)", &[("Zinc", 23.0), ("Sulphur", 17.9)]),
            Fertilizer::new("Copper Sulfate (CuSO₄)", &[("Copper", 25.0), ("Sulphur", 12.8)]),
            Fertilizer::new("Manganese Sulfate (MnSO₄)", &[("Manganese", 31.0), ("Sulphur", 18.0)]),
            Fertilizer::new("Iron Sulfate (FeSO₄)", &[("Iron", 19.7), ("Sulphur", 11.4)]),
            Fertilizer::new("Borax", &[("Boron", 11.3)]),
            Fertilizer::new("Soluble Boron", &[("Boron", 20.0)]),
            Fertilizer::new("Sodium Molybdate", &[("Molybdenum", 39.0)]),
        ]
    }

    /// Load measured nutrients from a lab-report file (YAML or JSON by
    /// extension). Assay names map to generic names; censored and
    /// non-numeric values coerce leniently.
    pub fn load_lab_report(path: &Path) -> Result<Vec<Nutrient>> {
        let file: LabReportFile = read_structured(path)?;
        let mut nutrients = Vec::with_capacity(file.nutrients.len());
        for raw in file.nutrients {
            let current = raw.current.to_level();
            let ideal = raw.ideal.to_level();
            let (name, assay) = match generic_name(&raw.name) {
                Some(generic) => (generic.to_string(), Some(raw.name.clone())),
                None => (raw.name.clone(), None),
            };
            if matches!(raw.current, LevelValue::Text(_)) || matches!(raw.ideal, LevelValue::Text(_)) {
                tracing::debug!(nutrient = %name, "coerced non-numeric lab value");
            }
            let mut nutrient =
                Nutrient::new(name, current, ideal, raw.unit.unwrap_or_else(|| "ppm".into()));
            if let Some(assay) = assay {
                nutrient = nutrient.with_assay(assay);
            }
            nutrients.push(nutrient);
        }
        Ok(nutrients)
    }

    /// Load a replacement fertilizer catalog from file. Products without an
    /// explicit `contains` list get one derived from their content map.
    pub fn load_fertilizers(path: &Path) -> Result<Vec<Fertilizer>> {
        let file: FertilizerFile = read_structured(path)?;
        let mut fertilizers = file.fertilizers;
        for fertilizer in &mut fertilizers {
            fertilizer.derive_contains();
            fertilizer.validate()?;
        }
        Ok(fertilizers)
    }
}

fn read_structured<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// A lab value as it appears in report files: numeric, or a string such as
/// "<2.0" that needs coercion.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LevelValue {
    Number(f64),
    Text(String),
}

impl LevelValue {
    fn to_level(&self) -> f64 {
        match self {
            LevelValue::Number(v) => v.max(0.0),
            LevelValue::Text(s) => coerce_level(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNutrient {
    name: String,
    current: LevelValue,
    ideal: LevelValue,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabReportFile {
    nutrients: Vec<RawNutrient>,
}

#[derive(Debug, Deserialize)]
struct FertilizerFile {
    fertilizers: Vec<Fertilizer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_level_censored_values() {
        assert_eq!(coerce_level("<2.0"), 0.0);
        assert_eq!(coerce_level(" < 0.5 "), 0.0);
        assert_eq!(coerce_level("12.5"), 12.5);
        assert_eq!(coerce_level("12.5 ppm"), 12.5);
        assert_eq!(coerce_level("n/a"), 0.0);
        assert_eq!(coerce_level(""), 0.0);
        // Negative readings normalize to zero
        assert_eq!(coerce_level("-3.1"), 0.0);
    }

    #[test]
    fn generic_name_mapping() {
        assert_eq!(generic_name("Calcium (Mehlich III)"), Some("Calcium"));
        assert_eq!(generic_name("Sulfur (KCl)"), Some("Sulphur"));
        assert_eq!(generic_name("Unknown Assay"), None);
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::new(Vec::new(), Catalog::builtin_fertilizers());
        assert!(catalog.validate().is_ok());
        assert!(catalog.fertilizer("Dolomite").is_some());
    }

    #[test]
    fn fertilizers_for_sorts_by_content() {
        let catalog = Catalog::new(Vec::new(), Catalog::builtin_fertilizers());
        let for_calcium = catalog.fertilizers_for("Calcium");
        assert!(!for_calcium.is_empty());
        // Limestone (38%) ranks above Gypsum (23%)
        let names: Vec<&str> = for_calcium.iter().map(|f| f.name.as_str()).collect();
        let lime_pos = names
            .iter()
            .position(|n| *n == "Agricultural Limestone (CaCO₃)")
            .unwrap();
        let gypsum_pos = names
            .iter()
            .position(|n| *n == "Gypsum (Calcium Sulfate)")
            .unwrap();
        assert!(lime_pos < gypsum_pos);
        // Every listed product actually supplies calcium
        assert!(for_calcium.iter().all(|f| f.supplies("Calcium")));
    }

    #[test]
    fn deficient_nutrients_main_first() {
        let nutrients = vec![
            Nutrient::new("Zinc", 1.0, 5.0, "ppm"),
            Nutrient::new("Calcium", 500.0, 1500.0, "ppm"),
            Nutrient::new("Potassium", 190.0, 200.0, "ppm"),
            Nutrient::new("Magnesium", 50.0, 120.0, "ppm"),
        ];
        let catalog = Catalog::new(nutrients, Catalog::builtin_fertilizers());
        let ordered: Vec<&str> = catalog
            .deficient_nutrients(25.0)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        // Potassium is only 5% low, so it is not deficient at a 25% threshold
        assert_eq!(ordered, vec!["Calcium", "Magnesium", "Zinc"]);
    }

    #[test]
    fn validate_rejects_duplicates() {
        let nutrients = vec![
            Nutrient::new("Calcium", 500.0, 1500.0, "ppm"),
            Nutrient::new("Calcium", 600.0, 1500.0, "ppm"),
        ];
        let catalog = Catalog::new(nutrients, Vec::new());
        assert!(catalog.validate().is_err());
    }
}
