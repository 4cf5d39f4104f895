//! Intent weight profiles and the ranking configuration that carries them.
//!
//! A profile maps metric names to weights summing to 1.0. The [`ProfileTable`]
//! is loaded once and shared read-only by every request; [`ProfileTable::resolve`]
//! turns a caller's free-form intent into a profile without ever failing.

pub mod error;
pub mod loader;
pub mod table;
pub mod types;


pub use error::{ProfileError, ProfileResult};
pub use loader::RankingConfig;
pub use table::ProfileTable;
pub use types::{IntentResolution, IntentWeightProfile, ResolvedProfile};
