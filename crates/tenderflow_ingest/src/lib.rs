//! The ingestion core: file discovery, the runtime half of schema
//! evolution, adaptive batch sizing, record routing, batch loading, and
//! progress tracking, tied together by the orchestrator.

pub mod batch_sizer;
pub mod cancel;
pub mod discover;
pub mod loader;
pub mod orchestrator;
pub mod router;
pub mod schema_manager;
pub mod tracker;

pub use cancel::CancellationToken;
pub use orchestrator::{run, IngestSummary};
