//! Shared value types for routing requests, results and engine handles

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// OSM node identifier
pub type NodeId = i64;

/// OSM way identifier
pub type WayId = i64;

/// A point in WGS84 coordinates, serialized as `[lon, lat]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Location {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.lon, location.lat]
    }
}

impl From<(f64, f64)> for Location {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle_type!(
    /// Opaque engine handle for a loaded graph
    GraphId
);
handle_type!(
    /// Opaque engine handle for a registered profile
    ProfileId
);

/// A profile registered on a specific graph.
///
/// Holds the owning graph's handle explicitly so every engine call is
/// qualified by both ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileHandle {
    pub graph: GraphId,
    pub profile: ProfileId,
    pub name: String,
}

/// A point-to-point route request.
///
/// The engine may pick any of the candidate start and end nodes; an optional
/// bearing constrains the initial heading in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub starts: Vec<NodeId>,
    pub ends: Vec<NodeId>,
    pub bearing: Option<f64>,
}

impl RouteRequest {
    /// Route between a single start and a single end node
    pub fn new(start: NodeId, end: NodeId) -> Self {
        Self {
            starts: vec![start],
            ends: vec![end],
            bearing: None,
        }
    }

    /// Route between candidate start and end node sets
    pub fn between(starts: Vec<NodeId>, ends: Vec<NodeId>) -> Self {
        Self {
            starts,
            ends,
            bearing: None,
        }
    }

    /// Constrain the initial heading of the route
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.starts.is_empty() {
            return Err("route request has no start nodes".to_string());
        }
        if self.ends.is_empty() {
            return Err("route request has no end nodes".to_string());
        }
        if let Some(bearing) = self.bearing {
            if !bearing.is_finite() {
                return Err(format!("bearing must be finite, got {bearing}"));
            }
        }
        Ok(())
    }
}

/// Route computed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteResult {
    /// Node ids along the route, start to end
    pub nodes: Vec<NodeId>,
    /// Way ids traversed between consecutive nodes (may be empty)
    #[serde(default)]
    pub ways: Vec<WayId>,
}

impl RouteResult {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            ways: Vec::new(),
        }
    }

    /// Whether the route carries no path elements
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A tagged OSM record returned by node and way lookups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub id: i64,
    /// Coordinates, present for nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Member nodes, present for ways
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_refs: Vec<NodeId>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Parameters for a nearest routable node lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestQuery {
    pub location: Location,
    /// Maximum number of candidate nodes to return
    pub limit: usize,
    /// Scales the engine's search radius when looking for candidates
    pub distance_threshold_multiplier: f64,
}

impl NearestQuery {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            limit: 1,
            distance_threshold_multiplier: 1.0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_distance_threshold_multiplier(mut self, multiplier: f64) -> Self {
        self.distance_threshold_multiplier = multiplier;
        self
    }
}

/// Point-in-time view of a route queue.
///
/// `is_empty` holds exactly when both counters are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queued_tasks: usize,
    pub active_tasks: usize,
    pub is_empty: bool,
}

impl QueueStatus {
    pub(crate) fn new(queued_tasks: usize, active_tasks: usize) -> Self {
        Self {
            queued_tasks,
            active_tasks,
            is_empty: queued_tasks + active_tasks == 0,
        }
    }
}
