//! # Butterfly-batch Library
//!
//! Client-side orchestration over an OpenStreetMap routing engine: graph
//! lifecycle, declarative routing profiles, bounded-concurrency batch
//! routing with live throughput/ETA telemetry, and local geometry on the
//! resulting route shapes.
//!
//! ## Features
//!
//! - **Engine agnostic**: the engine is any [`RoutingEngine`] implementation
//! - **Batch routing**: thousands of routes with a bounded number in flight
//! - **Progress tracking**: sliding-window throughput, ETA and an optional progress bar
//! - **Shape geometry**: Douglas-Peucker simplification and parallel offsets
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use butterfly_batch::{Graph, Profile, QueueOptions, RouteRequest, RoutingEngine};
//!
//! async fn run<E: RoutingEngine>(engine: Arc<E>) -> butterfly_batch::Result<()> {
//!     let graph = Graph::new(engine, "europe/belgium-latest.osm.pbf");
//!     graph.add_profile(&Profile::new("car", "highway").default_weight(10))?;
//!     graph.load().await?;
//!
//!     let queue = graph.route_queue("car", QueueOptions::default().with_progress(true))?;
//!     queue.enqueue_route("a", RouteRequest::new(1, 2))?;
//!     queue.enqueue_route("b", RouteRequest::new(3, 4))?;
//!
//!     let summary = queue
//!         .await_all(|id, outcome| match outcome {
//!             Ok(Some(route)) => println!("{id}: {} nodes", route.nodes.len()),
//!             Ok(None) => println!("{id}: no route"),
//!             Err(err) => eprintln!("{id}: {err}"),
//!         })
//!         .await?;
//!     println!("{} routes, {} empty", summary.completed, summary.empty);
//!     Ok(())
//! }
//! ```
//!
//! ## Geometry
//!
//! ```rust
//! use butterfly_batch::geometry::{offset, simplify, OffsetOptions, Side};
//! use butterfly_batch::Location;
//!
//! let line = vec![
//!     Location::new(0.0, 0.0),
//!     Location::new(0.0, 1.0),
//!     Location::new(0.0, 2.0),
//! ];
//! assert_eq!(simplify(&line, 0.1), vec![line[0], line[2]]);
//!
//! let shifted = offset(&line[..2], &OffsetOptions::new(5.0, Side::Left));
//! assert!(shifted[0].lon < 0.0);
//! ```

// Re-export core types that users might need
pub use crate::core::engine::{GraphConfig, RoutingEngine};
pub use crate::core::error::{EngineError, Error, Result};
pub use crate::core::graph::Graph;
pub use crate::core::profile::{EngineProfile, PenaltyEntry, Profile, TagValues};
pub use crate::core::progress::ProgressCallback;
pub use crate::core::queue::{
    default_concurrency, BatchSummary, QueueOptions, QueueTask, RouteBatchQueue, TaskOutcome,
};
pub use crate::core::telemetry::{format_eta, Progress};
pub use crate::core::types::{
    GraphId, Location, NearestQuery, NodeId, ProfileHandle, ProfileId, QueueStatus, RouteRequest,
    RouteResult, TaggedRecord, WayId,
};

pub mod core;
pub mod geometry;

#[doc(hidden)]
pub mod test_support;

// C-compatible FFI bindings (optional)
#[cfg(feature = "c-bindings")]
pub mod ffi;
