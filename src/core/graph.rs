//! Graph lifecycle and delegated engine calls
//!
//! A [`Graph`] wraps one engine graph handle. It is created unloaded, loads
//! at most once however many callers race on [`Graph::load`], and on
//! [`Graph::unload`] releases every route queue created against it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::core::engine::{GraphConfig, RoutingEngine};
use crate::core::error::{EngineError, Error, Result};
use crate::core::profile::{EngineProfile, Profile};
use crate::core::queue::{QueueOptions, RouteBatchQueue};
use crate::core::types::{
    GraphId, Location, NearestQuery, NodeId, ProfileHandle, ProfileId, RouteRequest, RouteResult,
    TaggedRecord, WayId,
};
use crate::geometry::{self, OffsetOptions};

#[derive(Debug)]
struct LoadedGraph {
    id: GraphId,
    profiles: HashMap<String, ProfileId>,
}

#[derive(Debug, Default)]
struct GraphState {
    /// Every profile added so far, registered again on each load
    profiles: Vec<EngineProfile>,
    loaded: Option<LoadedGraph>,
}

/// Client-side view of one engine graph
pub struct Graph<E: RoutingEngine> {
    engine: Arc<E>,
    source: String,
    state: RwLock<GraphState>,
    load_lock: tokio::sync::Mutex<()>,
    queues: Mutex<Vec<Weak<RouteBatchQueue<E>>>>,
}

impl<E: RoutingEngine> Graph<E> {
    /// Create an unloaded graph for an engine-specific source
    pub fn new(engine: Arc<E>, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
            state: RwLock::new(GraphState::default()),
            load_lock: tokio::sync::Mutex::new(()),
            queues: Mutex::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded.is_some()
    }

    /// Engine handle of the loaded graph
    pub fn id(&self) -> Option<GraphId> {
        self.state.read().loaded.as_ref().map(|loaded| loaded.id)
    }

    /// Add a routing profile.
    ///
    /// Before load the profile is passed to the engine with the graph config;
    /// on a loaded graph it is registered right away.
    pub fn add_profile(&self, profile: &Profile) -> Result<()> {
        let engine_profile = profile.to_engine()?;
        let mut state = self.state.write();
        if state.profiles.iter().any(|p| p.id == engine_profile.id) {
            return Err(Error::InvalidInput(format!(
                "profile '{}' is already added",
                engine_profile.id
            )));
        }

        if let Some(loaded) = state.loaded.as_mut() {
            let id = self.engine.register_profile(loaded.id, &engine_profile)?;
            debug!("Registered profile '{}' as {id} on {}", engine_profile.id, loaded.id);
            loaded.profiles.insert(engine_profile.id.clone(), id);
        }
        state.profiles.push(engine_profile);
        Ok(())
    }

    /// Names of all added profiles, in insertion order
    pub fn profile_names(&self) -> Vec<String> {
        self.state
            .read()
            .profiles
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// Load the graph, or return the handle of the graph already loaded.
    ///
    /// Concurrent callers wait for the first load and share its handle.
    pub async fn load(&self) -> Result<GraphId> {
        if let Some(id) = self.id() {
            return Ok(id);
        }
        let _load = self.load_lock.lock().await;
        if let Some(id) = self.id() {
            return Ok(id);
        }

        let config = GraphConfig {
            source: self.source.clone(),
            profiles: self.state.read().profiles.clone(),
        };
        info!(
            "Loading graph from {} with {} profiles",
            config.source,
            config.profiles.len()
        );

        let engine = Arc::clone(&self.engine);
        let (id, mut profiles) =
            run_blocking(move || load_with_profiles(engine.as_ref(), &config)).await?;

        let mut state = self.state.write();
        // Profiles added while the engine was loading
        for profile in &state.profiles {
            if profiles.contains_key(&profile.id) {
                continue;
            }
            match self.engine.register_profile(id, profile) {
                Ok(profile_id) => {
                    profiles.insert(profile.id.clone(), profile_id);
                }
                Err(err) => {
                    self.engine.unload_graph(id);
                    return Err(err.into());
                }
            }
        }
        state.loaded = Some(LoadedGraph { id, profiles });
        info!("Loaded graph {id} from {}", self.source);
        Ok(id)
    }

    /// Unload the graph and release every queue created against it.
    ///
    /// Returns `false` when nothing was loaded.
    pub fn unload(&self) -> bool {
        let mut state = self.state.write();
        let Some(loaded) = state.loaded.take() else {
            return false;
        };

        let queues: Vec<_> = self.queues.lock().drain(..).collect();
        let mut released = 0;
        for queue in queues.iter().filter_map(Weak::upgrade) {
            queue.release();
            released += 1;
        }

        if !self.engine.unload_graph(loaded.id) {
            warn!("Engine did not know graph {} at unload", loaded.id);
        }
        info!("Unloaded graph {} and released {released} queues", loaded.id);
        true
    }

    /// Handle for a registered profile on the loaded graph
    pub fn profile(&self, name: &str) -> Result<ProfileHandle> {
        let state = self.state.read();
        let loaded = state.loaded.as_ref().ok_or(Error::NotLoaded)?;
        Self::handle(loaded, name)
    }

    fn handle(loaded: &LoadedGraph, name: &str) -> Result<ProfileHandle> {
        let profile = loaded
            .profiles
            .get(name)
            .copied()
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;
        Ok(ProfileHandle {
            graph: loaded.id,
            profile,
            name: name.to_string(),
        })
    }

    /// Create a batch queue bound to this graph and `profile`
    pub fn route_queue(
        &self,
        profile: &str,
        options: QueueOptions,
    ) -> Result<Arc<RouteBatchQueue<E>>> {
        // The read guard keeps unload from slipping in before registration
        let state = self.state.read();
        let loaded = state.loaded.as_ref().ok_or(Error::NotLoaded)?;
        let handle = Self::handle(loaded, profile)?;

        let queue = Arc::new(RouteBatchQueue::new(
            Arc::clone(&self.engine),
            handle,
            options,
        ));
        let mut queues = self.queues.lock();
        queues.retain(|q| q.strong_count() > 0);
        queues.push(Arc::downgrade(&queue));
        debug!(
            "Created route queue on {} ({} live)",
            loaded.id,
            queues.len()
        );
        Ok(queue)
    }

    /// Compute a single route; `Ok(None)` when no route exists
    pub async fn route(&self, profile: &str, request: RouteRequest) -> Result<Option<RouteResult>> {
        request.validate().map_err(Error::InvalidInput)?;
        let route = self
            .call(profile, move |engine, handle| {
                engine.route(handle.graph, handle.profile, &request)
            })
            .await?;
        Ok(route.filter(|r| !r.is_empty()))
    }

    /// Routable nodes closest to a location, nearest first
    pub async fn nearest_nodes(&self, profile: &str, query: NearestQuery) -> Result<Vec<NodeId>> {
        if query.limit == 0 {
            return Err(Error::InvalidInput("nearest node limit must be at least 1".to_string()));
        }
        if !query.distance_threshold_multiplier.is_finite()
            || query.distance_threshold_multiplier <= 0.0
        {
            return Err(Error::InvalidInput(format!(
                "distance threshold multiplier must be positive, got {}",
                query.distance_threshold_multiplier
            )));
        }
        self.call(profile, move |engine, handle| {
            engine.nearest_nodes(handle.graph, handle.profile, &query)
        })
        .await
    }

    /// Every node within `radius_m` metres of `location`, nearest first
    pub async fn nodes_in_radius(
        &self,
        profile: &str,
        location: Location,
        radius_m: f64,
    ) -> Result<Vec<TaggedRecord>> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "search radius must be positive, got {radius_m}"
            )));
        }
        self.call(profile, move |engine, handle| {
            engine.nodes_in_radius(handle.graph, handle.profile, location, radius_m)
        })
        .await
    }

    /// Coordinates of the given nodes
    pub async fn shape(&self, profile: &str, nodes: Vec<NodeId>) -> Result<Vec<Location>> {
        self.call(profile, move |engine, handle| {
            engine.shape(handle.graph, handle.profile, &nodes)
        })
        .await
    }

    /// Shape of `nodes`, simplified with tolerance `epsilon` in degrees
    pub async fn simplified_shape(
        &self,
        profile: &str,
        nodes: Vec<NodeId>,
        epsilon: f64,
    ) -> Result<Vec<Location>> {
        let shape = self.shape(profile, nodes).await?;
        Ok(geometry::simplify(&shape, epsilon))
    }

    /// Shape of `nodes`, offset sideways
    pub async fn offset_shape(
        &self,
        profile: &str,
        nodes: Vec<NodeId>,
        options: &OffsetOptions,
    ) -> Result<Vec<Location>> {
        let shape = self.shape(profile, nodes).await?;
        Ok(geometry::offset(&shape, options))
    }

    pub async fn node(&self, profile: &str, id: NodeId) -> Result<Option<TaggedRecord>> {
        self.call(profile, move |engine, handle| {
            engine.node(handle.graph, handle.profile, id)
        })
        .await
    }

    pub async fn way(&self, profile: &str, id: WayId) -> Result<Option<TaggedRecord>> {
        self.call(profile, move |engine, handle| {
            engine.way(handle.graph, handle.profile, id)
        })
        .await
    }

    /// Run one engine call for `profile` on the blocking pool
    async fn call<T, F>(&self, profile: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&E, &ProfileHandle) -> std::result::Result<T, EngineError> + Send + 'static,
    {
        let handle = self.profile(profile)?;
        let engine = Arc::clone(&self.engine);
        run_blocking(move || f(engine.as_ref(), &handle)).await
    }
}

impl<E: RoutingEngine> Drop for Graph<E> {
    fn drop(&mut self) {
        if self.is_loaded() {
            self.unload();
        }
    }
}

fn load_with_profiles<E: RoutingEngine>(
    engine: &E,
    config: &GraphConfig,
) -> std::result::Result<(GraphId, HashMap<String, ProfileId>), EngineError> {
    let id = engine.load_graph(config)?;
    let mut profiles = HashMap::new();
    for profile in &config.profiles {
        let registered = match engine.profile_id(id, &profile.id) {
            Some(profile_id) => Ok(profile_id),
            None => engine.register_profile(id, profile),
        };
        match registered {
            Ok(profile_id) => {
                profiles.insert(profile.id.clone(), profile_id);
            }
            Err(err) => {
                engine.unload_graph(id);
                return Err(err);
            }
        }
    }
    Ok((id, profiles))
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, EngineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => Ok(result?),
        Err(err) => Err(Error::Engine(EngineError::new(format!(
            "engine worker failed: {err}"
        )))),
    }
}
