//! Upload ingestion, background derivation plumbing and video removal.

pub mod ingest;
pub mod queue;
pub mod removal;
pub mod sink;

pub use queue::{DerivationQueue, spawn_dispatcher};
pub use sink::DbDerivationSink;
