//! Multiple-testing correction engine.

mod methods;
mod select;

pub use methods::{adjust_pvalues, adjust_pvalues_with_pi0, harmonic_sum, AdjustMethod};
pub use select::{resolve_storey, select_method, AdjustSelection};
