//! Adapters - Concrete implementations of ports, plus the HTTP boundary.

pub mod amqp;
#[cfg(feature = "s3")]
pub mod aws;
pub mod factory;
pub mod http;
pub mod local;

pub use factory::build_storage;
