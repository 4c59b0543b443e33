//! Shared vocabulary for the tenderflow ingestion pipeline: the closed
//! column-type sum type, field/schema descriptors, the record wrapper,
//! identifier sanitization, and run configuration.

pub mod config;
pub mod naming;
pub mod types;

pub use config::RunContext;
pub use types::{ColumnType, FieldDescriptor, PatternTag, Record, Schema};
