pub mod fertilizer;
pub mod nutrient;
pub mod selection;
pub mod summary;

pub use fertilizer::*;
pub use nutrient::*;
pub use selection::*;
pub use summary::*;
