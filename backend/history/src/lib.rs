//! Local history of essay checks.
//!
//! One JSON record per line, appended and never rewritten.

pub mod store;
pub mod types;

pub use store::HistoryStore;
pub use types::{HistoryFilter, HistoryRecord};
