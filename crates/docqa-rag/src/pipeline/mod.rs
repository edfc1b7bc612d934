//! Pipeline orchestration for the ingest and query flows

pub mod flow;
pub mod orchestrator;

pub use flow::{FlowStage, FlowTracker, IngestStage, QueryStage};
pub use orchestrator::{Analysis, Pipeline};
