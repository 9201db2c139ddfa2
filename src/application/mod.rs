//! Application layer - Services that orchestrate ports.

pub mod ingest;

pub use ingest::{IngestError, IngestionService};
