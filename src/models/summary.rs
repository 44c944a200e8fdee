use chrono::{DateTime, Utc};
use serde::Serialize;

/// One reporting row: a selected product's contribution of one contained
/// nutrient, in the context of the nutrient it was selected for. Rows are
/// not deduplicated by product; the same fertilizer selected under two
/// owning nutrients produces rows for each owning context.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub fertilizer: String,
    pub nutrient: String,
    /// Product application rate, kg/ha.
    pub rate: f64,
    /// Mass of `nutrient` actually delivered at that rate, kg/ha.
    pub actual_nutrient_applied: f64,
    pub unit: String,
    pub contains: Vec<String>,
    pub owning_nutrients: Vec<String>,
}

/// Unique-product view: summary rows collapsed by fertilizer name, keeping
/// the highest rate seen for each product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductTotal {
    pub fertilizer: String,
    pub rate: f64,
    pub unit: String,
    pub contains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmendmentSummary {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<SummaryRow>,
    pub products: Vec<ProductTotal>,
}

impl AmendmentSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total kg/ha of one nutrient delivered across every row.
    pub fn total_applied(&self, nutrient: &str) -> f64 {
        self.rows
            .iter()
            .filter(|row| row.nutrient == nutrient)
            .map(|row| row.actual_nutrient_applied)
            .sum()
    }
}
