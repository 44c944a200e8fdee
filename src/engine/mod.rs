pub mod controller;
pub mod ledger;
pub mod rate;
pub mod summary;

pub use controller::SelectionController;
pub use ledger::ContributionLedger;
pub use rate::{RateCalculator, RateQuote, Relevance};
pub use summary::SummaryProjector;

/// Default ceiling slack for nutrients dragged along by a compound
/// product: they may end up to this far above their own target.
pub const DEFAULT_ALLOWED_EXCESS_PERCENT: f64 = 25.0;
