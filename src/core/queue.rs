//! Bounded-concurrency batch routing
//!
//! A [`RouteBatchQueue`] collects route requests for one graph and profile,
//! then [`RouteBatchQueue::await_all`] drains them through the engine with at
//! most `max_concurrency` routes in flight. Completions are consumed by a
//! single coordinator (the `await_all` future), which is the only writer of
//! the telemetry counters and the only caller of the completion callback.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::core::engine::RoutingEngine;
use crate::core::error::{EngineError, Error, Result};
use crate::core::progress::{ProgressCallback, ProgressReporter};
use crate::core::telemetry::{CompletionKind, Progress, Telemetry, DEFAULT_TELEMETRY_WINDOW};
use crate::core::types::{ProfileHandle, QueueStatus, RouteRequest, RouteResult};

/// Outcome delivered to the completion callback for one task.
///
/// `Ok(None)` means the engine found no route, which is distinct from an
/// engine failure.
pub type TaskOutcome = std::result::Result<Option<RouteResult>, EngineError>;

/// Default number of routes in flight: one less than the logical CPU count, at least one
pub fn default_concurrency() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Options for a route queue
#[derive(Clone)]
pub struct QueueOptions {
    /// Maximum number of routes computed at the same time
    pub max_concurrency: usize,

    /// Render a progress bar on stderr while processing
    pub progress: bool,

    /// Span of the sliding throughput window
    pub telemetry_window: Duration,

    /// Optional callback receiving a telemetry snapshot after every completion
    pub on_progress: Option<ProgressCallback>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            progress: false,
            telemetry_window: DEFAULT_TELEMETRY_WINDOW,
            on_progress: None,
        }
    }
}

impl QueueOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_telemetry_window(mut self, window: Duration) -> Self {
        self.telemetry_window = window;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// A route waiting in the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueTask {
    pub id: String,
    pub request: RouteRequest,
}

/// Totals for one `await_all` run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    /// Tasks for which the engine found no route
    pub empty: usize,
    /// Tasks for which the engine reported an error
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueueTask>,
    ids: HashSet<String>,
    active: usize,
    processing: bool,
}

/// Batch route queue bound to one graph and profile
pub struct RouteBatchQueue<E: RoutingEngine> {
    engine: Arc<E>,
    handle: ProfileHandle,
    options: QueueOptions,
    state: Mutex<QueueState>,
    released: AtomicBool,
}

impl<E: RoutingEngine> RouteBatchQueue<E> {
    pub(crate) fn new(engine: Arc<E>, handle: ProfileHandle, mut options: QueueOptions) -> Self {
        options.max_concurrency = options.max_concurrency.max(1);
        Self {
            engine,
            handle,
            options,
            state: Mutex::new(QueueState::default()),
            released: AtomicBool::new(false),
        }
    }

    /// Graph and profile this queue routes against
    pub fn profile(&self) -> &ProfileHandle {
        &self.handle
    }

    pub fn max_concurrency(&self) -> usize {
        self.options.max_concurrency
    }

    /// Whether the owning graph has been unloaded
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Add a route to the queue and return its id.
    ///
    /// Ids must be non-empty and unique among queued tasks. Rejected while
    /// the queue is processing.
    pub fn enqueue_route(&self, id: impl Into<String>, request: RouteRequest) -> Result<String> {
        if self.is_released() {
            return Err(Error::NotLoaded);
        }
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput("route id must not be empty".to_string()));
        }
        request.validate().map_err(Error::InvalidInput)?;

        let mut state = self.state.lock();
        if state.processing {
            return Err(Error::State(
                "cannot enqueue routes while the queue is processing".to_string(),
            ));
        }
        if !state.ids.insert(id.clone()) {
            return Err(Error::InvalidInput(format!("route id '{id}' is already queued")));
        }
        state.pending.push_back(QueueTask {
            id: id.clone(),
            request,
        });
        Ok(id)
    }

    /// Snapshot of queued and active task counts
    pub fn status(&self) -> QueueStatus {
        let state = self.state.lock();
        QueueStatus::new(state.pending.len(), state.active)
    }

    /// Drop every task not yet dispatched and return how many were dropped
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.state.lock();
        if state.processing {
            return Err(Error::State(
                "cannot clear the queue while it is processing".to_string(),
            ));
        }
        let dropped = state.pending.len();
        state.pending.clear();
        state.ids.clear();
        Ok(dropped)
    }

    /// Route every queued task and resolve once the queue is empty.
    ///
    /// `on_complete` runs exactly once per task, in completion order, for
    /// routes, empty results and engine failures alike. Engine failures never
    /// stop the rest of the batch. Only one `await_all` may run at a time.
    pub async fn await_all<F>(&self, mut on_complete: F) -> Result<BatchSummary>
    where
        F: FnMut(&str, TaskOutcome),
    {
        let total = {
            let mut state = self.state.lock();
            if state.processing {
                return Err(Error::State(
                    "await_all is already running on this queue".to_string(),
                ));
            }
            if self.is_released() {
                return Err(Error::NotLoaded);
            }
            state.processing = true;
            state.ids.clear();
            state.pending.len()
        };
        let _guard = ProcessingGuard { state: &self.state };

        let started = Instant::now();
        let mut telemetry = Telemetry::new(total, self.options.telemetry_window, started);
        let reporter = self.options.progress.then(|| ProgressReporter::new(total));
        info!(
            "Routing {total} tasks on {} with concurrency {}",
            self.handle.name, self.options.max_concurrency
        );

        let completions = stream::iter(std::iter::from_fn(|| self.next_task()))
            .map(|task| self.run_task(task))
            .buffer_unordered(self.options.max_concurrency);
        tokio::pin!(completions);

        while let Some((id, outcome)) = completions.next().await {
            {
                let mut state = self.state.lock();
                state.active = state.active.saturating_sub(1);
            }

            let outcome = outcome.map(|route| route.filter(|r| !r.is_empty()));
            let kind = match &outcome {
                Ok(Some(_)) => CompletionKind::Routed,
                Ok(None) => CompletionKind::Empty,
                Err(err) => {
                    debug!("Route '{id}' failed: {err}");
                    CompletionKind::Failed
                }
            };
            telemetry.record(Instant::now(), kind);
            on_complete(&id, outcome);

            let progress = telemetry.snapshot(Instant::now());
            if let Some(reporter) = &reporter {
                reporter.update(&progress);
            }
            if let Some(callback) = &self.options.on_progress {
                callback(&progress);
            }
        }

        let now = Instant::now();
        if let Some(reporter) = &reporter {
            reporter.finish(&telemetry.snapshot(now));
        }
        let summary = BatchSummary {
            total,
            completed: telemetry.completed(),
            empty: telemetry.empty(),
            failed: telemetry.failed(),
            elapsed: telemetry.elapsed(now),
        };
        info!(
            "Routed {} tasks in {:.2}s ({} empty, {} failed)",
            summary.completed,
            summary.elapsed.as_secs_f64(),
            summary.empty,
            summary.failed
        );
        Ok(summary)
    }

    /// Mark the queue unusable after its graph was unloaded
    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
        if self.state.lock().processing {
            warn!(
                "Graph {} unloaded while queue on {} was processing; undispatched routes will fail",
                self.handle.graph, self.handle.name
            );
        }
    }

    /// Pop the next task and count it active under the same lock
    fn next_task(&self) -> Option<QueueTask> {
        let mut state = self.state.lock();
        let task = state.pending.pop_front()?;
        state.active += 1;
        Some(task)
    }

    fn run_task(&self, task: QueueTask) -> impl Future<Output = (String, TaskOutcome)> {
        let engine = Arc::clone(&self.engine);
        let (graph, profile) = (self.handle.graph, self.handle.profile);
        let released = self.is_released();

        async move {
            let QueueTask { id, request } = task;
            if released {
                return (
                    id,
                    Err(EngineError::new("graph was unloaded before the route was dispatched")),
                );
            }
            debug!("Dispatching route '{id}'");
            let outcome =
                match tokio::task::spawn_blocking(move || engine.route(graph, profile, &request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => Err(EngineError::new(format!("route worker failed: {err}"))),
                };
            (id, outcome)
        }
    }
}

/// Clears the processing flag when `await_all` finishes or is dropped
struct ProcessingGuard<'a> {
    state: &'a Mutex<QueueState>,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.processing = false;
        state.active = 0;
    }
}
