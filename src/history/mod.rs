//! Scan history: the ordered, durable log of scan records.

pub mod snapshot;
mod store;

pub use store::{HistoryConfig, HistoryStore, LoadOutcome, PersistStatus};
