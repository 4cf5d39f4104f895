//! Human-readable explanation of the top-ranked result.

pub mod explainer;
pub mod types;

#[cfg(test)]
mod tests;

pub use explainer::explain;
pub use types::{BreakdownEntry, Explanation};
