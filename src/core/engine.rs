//! Contract of the external routing engine
//!
//! Graph storage, spatial indexing and path search all live behind this
//! trait. Every call is qualified by opaque handles the engine hands out;
//! this crate never touches engine internals. Calls are blocking and may be
//! CPU heavy, so async callers run them on tokio's blocking pool.

use crate::core::error::EngineError;
use crate::core::profile::EngineProfile;
use crate::core::types::{
    GraphId, Location, NearestQuery, NodeId, ProfileId, RouteRequest, RouteResult, TaggedRecord,
    WayId,
};

/// What the engine needs to load a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Engine-specific locator: a file path, an extract name or a query
    pub source: String,
    /// Profiles registered together with the graph
    pub profiles: Vec<EngineProfile>,
}

impl GraphConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            profiles: Vec::new(),
        }
    }
}

/// Handle-based interface of the routing engine.
///
/// Implementations must be safe to call from many worker threads at once;
/// the batch queue relies on that to run routes in parallel.
pub trait RoutingEngine: Send + Sync + 'static {
    /// Load (or build) a graph and register the configured profiles
    fn load_graph(&self, config: &GraphConfig) -> Result<GraphId, EngineError>;

    /// Release a graph; returns `false` when the handle was unknown
    fn unload_graph(&self, graph: GraphId) -> bool;

    /// Id under which a profile passed in [`GraphConfig::profiles`] was registered
    fn profile_id(&self, graph: GraphId, name: &str) -> Option<ProfileId>;

    /// Register an additional profile on an already loaded graph
    fn register_profile(
        &self,
        graph: GraphId,
        profile: &EngineProfile,
    ) -> Result<ProfileId, EngineError>;

    /// Routable nodes closest to a location, nearest first
    fn nearest_nodes(
        &self,
        graph: GraphId,
        profile: ProfileId,
        query: &NearestQuery,
    ) -> Result<Vec<NodeId>, EngineError>;

    /// Every node within `radius_m` metres of `location`, nearest first
    fn nodes_in_radius(
        &self,
        graph: GraphId,
        profile: ProfileId,
        location: Location,
        radius_m: f64,
    ) -> Result<Vec<TaggedRecord>, EngineError>;

    /// Compute a route; `Ok(None)` means no route exists
    fn route(
        &self,
        graph: GraphId,
        profile: ProfileId,
        request: &RouteRequest,
    ) -> Result<Option<RouteResult>, EngineError>;

    /// Coordinates of the given nodes, in order; unknown nodes are skipped
    fn shape(
        &self,
        graph: GraphId,
        profile: ProfileId,
        nodes: &[NodeId],
    ) -> Result<Vec<Location>, EngineError>;

    fn node(
        &self,
        graph: GraphId,
        profile: ProfileId,
        id: NodeId,
    ) -> Result<Option<TaggedRecord>, EngineError>;

    fn way(
        &self,
        graph: GraphId,
        profile: ProfileId,
        id: WayId,
    ) -> Result<Option<TaggedRecord>, EngineError>;
}
