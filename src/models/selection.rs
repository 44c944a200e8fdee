use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fertilizer chosen to correct a specific nutrient. The rate is kg/ha
/// of product; `None` means no rate has been seeded or typed yet, and such
/// an entry contributes nothing to ledger totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub fertilizer: String,
    pub rate: Option<f64>,
}

impl Selection {
    pub fn new(fertilizer: impl Into<String>) -> Self {
        Self {
            fertilizer: fertilizer.into(),
            rate: None,
        }
    }
}

/// All fertilizer selections for the session, keyed by the owning nutrient
/// (the nutrient each list is trying to correct). The same product may
/// appear under several owning nutrients, each occurrence with its own
/// rate. Iteration order is owning-nutrient name order, so every derived
/// computation is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionStore {
    selections: BTreeMap<String, Vec<Selection>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.values().all(|list| list.is_empty())
    }

    pub fn selections_for(&self, owning: &str) -> &[Selection] {
        self.selections.get(owning).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &[Selection])> {
        self.selections.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn owning_nutrients(&self) -> impl Iterator<Item = &String> {
        self.selections.keys()
    }

    /// True if `owning`'s list already holds the product.
    pub fn contains(&self, owning: &str, fertilizer: &str) -> bool {
        self.selections_for(owning)
            .iter()
            .any(|s| s.fertilizer == fertilizer)
    }

    /// Append a selection. The caller guards against duplicates.
    pub fn push(&mut self, owning: &str, fertilizer: &str) {
        self.selections
            .entry(owning.to_string())
            .or_default()
            .push(Selection::new(fertilizer));
    }

    /// Replace the entry at `index`, dropping its old rate. Out-of-range
    /// indices append instead.
    pub fn replace(&mut self, owning: &str, index: usize, fertilizer: &str) {
        let list = self.selections.entry(owning.to_string()).or_default();
        if index < list.len() {
            list[index] = Selection::new(fertilizer);
        } else {
            list.push(Selection::new(fertilizer));
        }
    }

    /// Splice out the entry at `index`, returning the removed product name.
    pub fn remove(&mut self, owning: &str, index: usize) -> Option<String> {
        let list = self.selections.get_mut(owning)?;
        if index >= list.len() {
            return None;
        }
        Some(list.remove(index).fertilizer)
    }

    /// Drop the whole selection list for a nutrient. Entries owned by other
    /// nutrients (and their rates) are untouched.
    pub fn clear_nutrient(&mut self, owning: &str) -> Vec<Selection> {
        self.selections.remove(owning).unwrap_or_default()
    }

    pub fn rate(&self, owning: &str, fertilizer: &str) -> Option<f64> {
        self.selections_for(owning)
            .iter()
            .find(|s| s.fertilizer == fertilizer)
            .and_then(|s| s.rate)
    }

    /// Overwrite the rate on an existing entry. Negative or non-finite
    /// input clamps to zero. Unknown pairs are a logged no-op.
    pub fn set_rate(&mut self, owning: &str, fertilizer: &str, rate: f64) {
        let clamped = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
        if clamped != rate {
            tracing::debug!(owning, fertilizer, rate, "clamped invalid rate to {}", clamped);
        }
        match self
            .selections
            .get_mut(owning)
            .and_then(|list| list.iter_mut().find(|s| s.fertilizer == fertilizer))
        {
            Some(entry) => entry.rate = Some(clamped),
            None => {
                tracing::debug!(owning, fertilizer, "set_rate on unselected pair ignored");
            }
        }
    }

    /// Fill in a rate only where none exists yet; a rate the user already
    /// set is never overwritten.
    pub fn seed_rate(&mut self, owning: &str, fertilizer: &str, rate: f64) {
        if let Some(entry) = self
            .selections
            .get_mut(owning)
            .and_then(|list| list.iter_mut().find(|s| s.fertilizer == fertilizer))
        {
            if entry.rate.is_none() {
                entry.rate = Some(rate.max(0.0));
            }
        }
    }

    /// True if any owning nutrient other than `except` selects the product.
    pub fn selected_elsewhere(&self, fertilizer: &str, except: &str) -> bool {
        self.selections
            .iter()
            .filter(|(owning, _)| owning.as_str() != except)
            .any(|(_, list)| list.iter().any(|s| s.fertilizer == fertilizer))
    }

    /// Count selection entries that reference a product or owning nutrient
    /// missing from the catalog. Such entries are skipped (with a debug
    /// event) by every computation; this makes the skips visible to tests.
    pub fn dangling_selections(&self, catalog: &Catalog) -> usize {
        self.selections
            .iter()
            .flat_map(|(owning, list)| list.iter().map(move |s| (owning, s)))
            .filter(|(owning, s)| {
                catalog.nutrient(owning).is_none() || catalog.fertilizer(&s.fertilizer).is_none()
            })
            .count()
    }
}
