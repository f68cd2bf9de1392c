//! Core library modules for butterfly-batch
//!
//! Engine contract, graph lifecycle, profiles and the batch route queue.

pub mod engine;
pub mod error;
pub mod graph;
pub mod profile;
pub mod progress;
pub mod queue;
pub mod telemetry;
pub mod types;

// Re-export main types for internal use
pub use engine::{GraphConfig, RoutingEngine};
pub use error::{EngineError, Error, Result};
pub use graph::Graph;
pub use profile::{EngineProfile, Profile};
pub use queue::{BatchSummary, QueueOptions, RouteBatchQueue, TaskOutcome};
