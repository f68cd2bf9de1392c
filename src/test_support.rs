//! In-memory routing engine for tests and demos
//!
//! [`ScriptedEngine`] answers route queries from a fixed table keyed by
//! `(start, end)` node pairs and records how it was called, so tests can
//! assert on load counts and peak parallelism.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::engine::{GraphConfig, RoutingEngine};
use crate::core::error::EngineError;
use crate::core::profile::EngineProfile;
use crate::core::types::{
    GraphId, Location, NearestQuery, NodeId, ProfileId, RouteRequest, RouteResult, TaggedRecord,
    WayId,
};
use crate::geometry::meters_to_degrees;

/// Base search radius of [`ScriptedEngine::nearest_nodes`], in degrees
pub const SEARCH_RADIUS_DEG: f64 = 0.01;

#[derive(Debug, Default)]
struct LoadedGraphs {
    next_id: u32,
    graphs: HashMap<GraphId, Vec<String>>,
}

/// Scripted [`RoutingEngine`] with call accounting
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    routes: HashMap<(NodeId, NodeId), RouteResult>,
    failures: HashSet<(NodeId, NodeId)>,
    nodes: HashMap<NodeId, TaggedRecord>,
    ways: HashMap<WayId, TaggedRecord>,
    delay: Option<Duration>,
    loaded: Mutex<LoadedGraphs>,
    loads: AtomicUsize,
    route_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `start -> end` with the given node sequence
    pub fn with_route(mut self, start: NodeId, end: NodeId, nodes: Vec<NodeId>) -> Self {
        self.routes.insert((start, end), RouteResult::new(nodes));
        self
    }

    /// Answer `start -> end` with an engine error
    pub fn with_failure(mut self, start: NodeId, end: NodeId) -> Self {
        self.failures.insert((start, end));
        self
    }

    pub fn with_node(mut self, id: NodeId, location: Location) -> Self {
        self.nodes.insert(
            id,
            TaggedRecord {
                id,
                location: Some(location),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_node_tag(mut self, id: NodeId, key: &str, value: &str) -> Self {
        self.nodes
            .entry(id)
            .or_insert_with(|| TaggedRecord {
                id,
                ..Default::default()
            })
            .tags
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_way(mut self, id: WayId, node_refs: Vec<NodeId>, tags: &[(&str, &str)]) -> Self {
        self.ways.insert(
            id,
            TaggedRecord {
                id,
                location: None,
                node_refs,
                tags: tags
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        );
        self
    }

    /// Make every route call block for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of successful `load_graph` calls
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    /// Highest number of route calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self, graph: GraphId) -> bool {
        self.loaded.lock().graphs.contains_key(&graph)
    }

    fn check_handles(&self, graph: GraphId, profile: ProfileId) -> Result<(), EngineError> {
        let loaded = self.loaded.lock();
        let profiles = loaded
            .graphs
            .get(&graph)
            .ok_or_else(|| EngineError::new(format!("unknown graph {graph}")))?;
        if profile.0 == 0 || profile.0 as usize > profiles.len() {
            return Err(EngineError::new(format!("unknown profile {profile} on {graph}")));
        }
        Ok(())
    }

    fn lookup(&self, request: &RouteRequest) -> Result<Option<RouteResult>, EngineError> {
        for start in &request.starts {
            for end in &request.ends {
                if self.failures.contains(&(*start, *end)) {
                    return Err(EngineError::new(format!("no graph edge near {start} -> {end}")));
                }
                if let Some(route) = self.routes.get(&(*start, *end)) {
                    return Ok(Some(route.clone()));
                }
            }
        }
        Ok(None)
    }
}

/// Tracks one in-flight route call
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RoutingEngine for ScriptedEngine {
    fn load_graph(&self, config: &GraphConfig) -> Result<GraphId, EngineError> {
        if config.source.trim().is_empty() {
            return Err(EngineError::new("graph source must not be empty"));
        }
        let mut loaded = self.loaded.lock();
        loaded.next_id += 1;
        let id = GraphId(loaded.next_id);
        let names = config.profiles.iter().map(|p| p.id.clone()).collect();
        loaded.graphs.insert(id, names);
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn unload_graph(&self, graph: GraphId) -> bool {
        self.loaded.lock().graphs.remove(&graph).is_some()
    }

    fn profile_id(&self, graph: GraphId, name: &str) -> Option<ProfileId> {
        let loaded = self.loaded.lock();
        let position = loaded.graphs.get(&graph)?.iter().position(|p| p == name)?;
        Some(ProfileId(position as u32 + 1))
    }

    fn register_profile(
        &self,
        graph: GraphId,
        profile: &EngineProfile,
    ) -> Result<ProfileId, EngineError> {
        let mut loaded = self.loaded.lock();
        let profiles = loaded
            .graphs
            .get_mut(&graph)
            .ok_or_else(|| EngineError::new(format!("unknown graph {graph}")))?;
        if let Some(position) = profiles.iter().position(|p| *p == profile.id) {
            return Ok(ProfileId(position as u32 + 1));
        }
        profiles.push(profile.id.clone());
        Ok(ProfileId(profiles.len() as u32))
    }

    fn nearest_nodes(
        &self,
        graph: GraphId,
        profile: ProfileId,
        query: &NearestQuery,
    ) -> Result<Vec<NodeId>, EngineError> {
        self.check_handles(graph, profile)?;
        let radius = SEARCH_RADIUS_DEG * query.distance_threshold_multiplier;
        let target = query.location;

        let mut candidates: Vec<(f64, NodeId)> = self
            .nodes
            .values()
            .filter_map(|record| {
                let location = record.location?;
                let dist = (location.lon - target.lon).hypot(location.lat - target.lat);
                (dist <= radius).then_some((dist, record.id))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(candidates
            .into_iter()
            .take(query.limit)
            .map(|(_, id)| id)
            .collect())
    }

    fn nodes_in_radius(
        &self,
        graph: GraphId,
        profile: ProfileId,
        location: Location,
        radius_m: f64,
    ) -> Result<Vec<TaggedRecord>, EngineError> {
        self.check_handles(graph, profile)?;
        let radius = meters_to_degrees(radius_m);

        let mut found: Vec<(f64, &TaggedRecord)> = self
            .nodes
            .values()
            .filter_map(|record| {
                let point = record.location?;
                let dist = (point.lon - location.lon).hypot(point.lat - location.lat);
                (dist <= radius).then_some((dist, record))
            })
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        Ok(found.into_iter().map(|(_, record)| record.clone()).collect())
    }

    fn route(
        &self,
        graph: GraphId,
        profile: ProfileId,
        request: &RouteRequest,
    ) -> Result<Option<RouteResult>, EngineError> {
        self.check_handles(graph, profile)?;
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.lookup(request)
    }

    fn shape(
        &self,
        graph: GraphId,
        profile: ProfileId,
        nodes: &[NodeId],
    ) -> Result<Vec<Location>, EngineError> {
        self.check_handles(graph, profile)?;
        Ok(nodes
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(|record| record.location))
            .collect())
    }

    fn node(
        &self,
        graph: GraphId,
        profile: ProfileId,
        id: NodeId,
    ) -> Result<Option<TaggedRecord>, EngineError> {
        self.check_handles(graph, profile)?;
        Ok(self.nodes.get(&id).cloned())
    }

    fn way(
        &self,
        graph: GraphId,
        profile: ProfileId,
        id: WayId,
    ) -> Result<Option<TaggedRecord>, EngineError> {
        self.check_handles(graph, profile)?;
        Ok(self.ways.get(&id).cloned())
    }
}
