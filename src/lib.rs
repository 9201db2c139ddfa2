//! Video ingestion gateway
//!
//! Hexagonal Architecture:
//! - domain/: Pure types (uploaded clips, stored locators, analysis tasks)
//! - ports/: Trait definitions for storage and task publishing
//! - adapters/: Concrete implementations (local disk, S3, AMQP, HTTP)
//! - application/: The ingestion service
//! - config: Environment configuration
//!
//! # Features
//! - `s3`: S3-compatible object storage backend (enabled by default)

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::{IngestError, IngestionService};
pub use config::IngestConfig;
