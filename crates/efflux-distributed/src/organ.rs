//! Organ nodes and the flooding work-dispatch protocol.
//!
//! An organ owns a [`MaterialPool`], the workers living in it, one
//! [`Manager`] per work type it has seen, and outgoing edges to its
//! neighbours. Requests for work are flooded over every edge and handed to
//! a local worker at the same time; the first completed result wins and the
//! rest stay buffered for the next request of the same type.
//!
//! Every organ runs these tasks:
//!
//! - an accept loop for inbound edges
//! - one request listener per inbound edge, handling requests in order
//! - one response listener per outbound edge
//! - one hand-off task per pending `make_available`
//!
//! All of them stop when [`Organ::shutdown`] is called.

use crate::edge::Edge;
use crate::error::{DistributedError, DistributedResult};
use crate::manager::Manager;
use crate::status::NodeStatus;
use crate::wire::{self, Diffusion, EdgeTransport, EnvelopeListener, WorkEnvelope};
use crate::worker::{same_worker, WorkerRef};
use efflux_core::blob::LigandBlob;
use efflux_core::config::EffluxConfig;
use efflux_core::types::{EdgeType, Work, WorkType};
use efflux_runtime::material_pool::MaterialPool;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Default)]
struct Registry {
    workers: Vec<WorkerRef>,
    managers: HashMap<WorkType, Arc<Manager>>,
}

impl Registry {
    fn is_resident(&self, worker: &WorkerRef) -> bool {
        self.workers.iter().any(|w| same_worker(w, worker))
    }
}

/// A vertex of the organ graph.
pub struct Organ {
    name: String,
    address: SocketAddr,
    config: EffluxConfig,
    materials: MaterialPool,
    edges: RwLock<Vec<Arc<Edge>>>,
    registry: Mutex<Registry>,
    shutdown: watch::Sender<bool>,
    next_diffusion: AtomicUsize,
}

impl Organ {
    /// Start a new organ listening on a fresh port of `dispatch.bind_host`.
    ///
    /// The organ begins with the seeded material pool, no workers, no
    /// managers and no edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the listener
    /// cannot be bound.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let heart = Organ::initialize("heart", EffluxConfig::default()).await?;
    /// let lungs = Organ::initialize("lungs", EffluxConfig::default()).await?;
    /// connect_nodes(&heart, &lungs, EdgeType::Cardiovascular, EdgeType::Cardiovascular).await?;
    /// ```
    pub async fn initialize(
        name: impl Into<String>,
        config: EffluxConfig,
    ) -> DistributedResult<Arc<Self>> {
        config.validate()?;
        let bind = SocketAddr::new(config.dispatch.bind_host, 0);
        let listener = wire::listen(bind)
            .await
            .map_err(|source| DistributedError::Bind { addr: bind, source })?;
        let address = listener.local_addr();
        let materials = MaterialPool::initialize(&config);
        let (shutdown, _) = watch::channel(false);

        let organ = Arc::new(Self {
            name: name.into(),
            address,
            config,
            materials,
            edges: RwLock::new(Vec::new()),
            registry: Mutex::new(Registry::default()),
            shutdown,
            next_diffusion: AtomicUsize::new(0),
        });
        tokio::spawn(Arc::clone(&organ).accept_edges(listener));
        info!(organ = %organ, "organ started");
        Ok(organ)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn config(&self) -> &EffluxConfig {
        &self.config
    }

    /// The organ's material pool, shared with its cells.
    pub fn materials(&self) -> &MaterialPool {
        &self.materials
    }

    /// Whether [`Organ::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }

    pub async fn worker_count(&self) -> usize {
        self.registry.lock().await.workers.len()
    }

    /// Open an edge to the organ at `peer`.
    ///
    /// Requests flow from this organ to the peer and responses come back
    /// on the same connection. Connecting twice creates two edges.
    ///
    /// # Errors
    ///
    /// Returns [`DistributedError::Connect`] if the connection cannot be
    /// established. Nothing retries.
    pub async fn connect(
        self: &Arc<Self>,
        peer: SocketAddr,
        edge_type: EdgeType,
    ) -> DistributedResult<()> {
        let transport = wire::connect(peer)
            .await
            .map_err(|source| DistributedError::Connect { peer, source })?;
        let (sink, responses) = transport.split();
        self.edges
            .write()
            .await
            .push(Arc::new(Edge::new(edge_type, peer, sink)));

        let organ = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = Arc::clone(&organ).serve_responses(peer, responses).await {
                error!(organ = %organ, %peer, "response listener stopped: {}", e);
            }
        });
        info!(organ = %self, %peer, %edge_type, "edge connected");
        Ok(())
    }

    /// Register a worker, creating the manager for its type if needed.
    pub async fn add_worker(self: &Arc<Self>, worker: WorkerRef) {
        let mut registry = self.registry.lock().await;
        if registry.is_resident(&worker) {
            return;
        }
        let work_type = worker.work_type();
        let result_buffer_size = self.config.dispatch.result_buffer_size;
        registry
            .managers
            .entry(work_type)
            .or_insert_with(|| Arc::new(Manager::new(work_type, result_buffer_size)))
            .add_resident();
        worker.set_organ(Some(Arc::downgrade(self)));
        registry.workers.push(worker);
        debug!(organ = %self, %work_type, "worker added");
    }

    /// Detach a worker. Returns `false` if it did not live here.
    ///
    /// The manager for its type stays; once no worker of that type is left
    /// it stops accepting requests.
    pub async fn remove_worker(&self, worker: &WorkerRef) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(index) = registry.workers.iter().position(|w| same_worker(w, worker)) else {
            return false;
        };
        let removed = registry.workers.remove(index);
        if let Some(manager) = registry.managers.get(&removed.work_type()) {
            manager.remove_resident();
        }
        removed.set_organ(None);
        debug!(organ = %self, work_type = %removed.work_type(), "worker removed");
        true
    }

    /// Announce that `worker` is idle and can take one unit of work.
    ///
    /// Never blocks: the hand-off runs in its own task. The announcement
    /// is best effort and is dropped without error when no manager exists
    /// for the worker's type, when the worker does not live here, or when
    /// it is dying.
    pub fn make_available(self: &Arc<Self>, worker: WorkerRef) {
        let organ = Arc::clone(self);
        tokio::spawn(async move {
            let work_type = worker.work_type();
            if worker.is_apoptosis() {
                debug!(organ = %organ, %work_type, "dying worker not made available");
                return;
            }
            let manager = {
                let registry = organ.registry.lock().await;
                let Some(manager) = registry.managers.get(&work_type).cloned() else {
                    debug!(organ = %organ, %work_type, "no manager, availability dropped");
                    return;
                };
                if !registry.is_resident(&worker) {
                    debug!(organ = %organ, %work_type, "worker not resident, availability dropped");
                    return;
                }
                manager
            };
            let mut shutdown = organ.shutdown.subscribe();
            if organ.is_shut_down() {
                return;
            }
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = manager.offer(worker) => {}
            }
        });
    }

    /// Request work with the configured deadline.
    pub async fn request_work(self: &Arc<Self>, request: Work) -> Work {
        let deadline = Instant::now() + self.config.timing.request_timeout();
        self.request_work_until(request, deadline).await
    }

    /// Request work, waiting until `deadline` at most.
    ///
    /// A result already buffered from an earlier flood is returned right
    /// away. Otherwise the request goes out over every edge and to a local
    /// worker, and the first completed result is returned. Past the
    /// deadline the result is a 503 "Timeout". Nothing is retried.
    #[instrument(
        skip(self, request),
        fields(organ = %self, work_type = %request.work_type(), request_id = %Uuid::new_v4())
    )]
    pub async fn request_work_until(self: &Arc<Self>, request: Work, deadline: Instant) -> Work {
        if request.is_completed() {
            warn!("request is already completed");
            return request;
        }
        let work_type = request.work_type();
        let manager = self.manager_or_insert(work_type).await;
        manager.record_request();

        let result = match manager.try_take_result() {
            Some(result) => {
                debug!(%result, "received buffered result");
                result
            }
            None => {
                self.flood(&request).await;
                if manager.accepts_requests() {
                    self.attempt_locally(Arc::clone(&manager), request, deadline);
                }
                match manager.take_result(deadline).await {
                    Some(result) => {
                        debug!(%result, "received result");
                        result
                    }
                    None => {
                        debug!("request timed out");
                        Work::timeout(work_type)
                    }
                }
            }
        };
        manager.record_outcome(&result);
        result
    }

    /// Status of the organ. Reading it resets the dispatch counters.
    pub async fn status(&self) -> NodeStatus {
        let connections = self.edges.read().await.iter().map(|edge| edge.peer()).collect();
        let mut work: Vec<_> = {
            let registry = self.registry.lock().await;
            registry.managers.values().map(|manager| manager.drain_stats()).collect()
        };
        work.sort_by_key(|status| status.work_type);
        NodeStatus {
            name: self.name.clone(),
            address: self.address,
            connections,
            work,
            materials: self.materials.snapshot().await,
        }
    }

    /// Diffuse materials to a neighbour every diffusion interval.
    pub fn start_diffusion(self: &Arc<Self>) -> JoinHandle<()> {
        let organ = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown = organ.shutdown.subscribe();
            if organ.is_shut_down() {
                return;
            }
            let mut ticker = tokio::time::interval(organ.config.timing.diffusion_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = organ.send_diffusion().await {
                            warn!(organ = %organ, "diffusion failed: {}", e);
                        }
                    }
                }
            }
            debug!(organ = %organ, "diffusion stopped");
        })
    }

    /// Send one round of diffusion over the next non-neuronal edge.
    ///
    /// Returns `false` when there is no edge that carries diffusion. On a
    /// send failure the materials are merged back into this organ's pool.
    pub async fn send_diffusion(&self) -> DistributedResult<bool> {
        let edges: Vec<Arc<Edge>> = self
            .edges
            .read()
            .await
            .iter()
            .filter(|edge| edge.edge_type().carries_diffusion())
            .cloned()
            .collect();
        if edges.is_empty() {
            return Ok(false);
        }
        let edge = &edges[self.next_diffusion.fetch_add(1, Ordering::Relaxed) % edges.len()];

        let payload = Diffusion {
            resources: self.materials.split_resource().await,
            waste: self.materials.split_waste().await,
            hormones: self.materials.split_hormone().await,
        };
        if let Err(e) = edge.send(WorkEnvelope::diffusion(payload.clone())).await {
            self.receive_diffusion(payload).await;
            return Err(e.into());
        }
        Ok(true)
    }

    /// Stop every task of this organ and cancel its material pool.
    pub fn shutdown(&self) {
        info!(organ = %self, "organ shutting down");
        self.shutdown.send_replace(true);
        self.materials.cancel();
    }

    async fn manager_or_insert(&self, work_type: WorkType) -> Arc<Manager> {
        let mut registry = self.registry.lock().await;
        let result_buffer_size = self.config.dispatch.result_buffer_size;
        Arc::clone(
            registry
                .managers
                .entry(work_type)
                .or_insert_with(|| Arc::new(Manager::new(work_type, result_buffer_size))),
        )
    }

    async fn manager(&self, work_type: WorkType) -> Option<Arc<Manager>> {
        self.registry.lock().await.managers.get(&work_type).cloned()
    }

    async fn flood(&self, request: &Work) {
        let edges: Vec<Arc<Edge>> = self.edges.read().await.clone();
        for edge in edges {
            if let Err(e) = edge.send(WorkEnvelope::from(request.clone())).await {
                warn!(organ = %self, peer = %edge.peer(), "failed to send request: {}", e);
            }
        }
    }

    fn attempt_locally(self: &Arc<Self>, manager: Arc<Manager>, request: Work, deadline: Instant) {
        let organ = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(worker) = organ.claim_resident(&manager, deadline).await {
                let result = settle(worker.work(deadline, request).await);
                manager.push_result(result).await;
            }
        });
    }

    /// Claim an idle worker that still lives in this organ.
    async fn claim_resident(&self, manager: &Manager, deadline: Instant) -> Option<WorkerRef> {
        while let Some(worker) = manager.claim_worker(deadline).await {
            if self.registry.lock().await.is_resident(&worker) {
                return Some(worker);
            }
            debug!(organ = %self, work_type = %manager.work_type(), "skipping worker that left");
        }
        None
    }

    async fn receive_diffusion(&self, payload: Diffusion) {
        self.materials.put_resource(payload.resources).await;
        self.materials.put_waste(payload.waste).await;
        self.materials.put_hormone(payload.hormones).await;
    }

    async fn accept_edges(self: Arc<Self>, listener: EnvelopeListener) {
        let mut shutdown = self.shutdown.subscribe();
        futures::pin_mut!(listener);
        if self.is_shut_down() {
            return;
        }
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                incoming = listener.next() => match incoming {
                    Some(Ok(transport)) => {
                        let organ = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = Arc::clone(&organ).serve_requests(transport).await {
                                error!(organ = %organ, "request listener stopped: {}", e);
                            }
                        });
                    }
                    Some(Err(e)) => warn!(organ = %self, "failed to accept edge: {}", e),
                    None => break,
                },
            }
        }
        debug!(organ = %self, "accept loop stopped");
    }

    /// Handle inbound requests of one edge, one at a time.
    #[instrument(skip(self, transport), fields(organ = %self))]
    async fn serve_requests(self: Arc<Self>, transport: EdgeTransport) -> DistributedResult<()> {
        let (mut responses, mut requests) = transport.split();
        let mut shutdown = self.shutdown.subscribe();
        if self.is_shut_down() {
            return Ok(());
        }
        loop {
            let envelope = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                envelope = requests.next() => match envelope {
                    Some(envelope) => envelope?,
                    None => return Ok(()),
                },
            };

            if envelope.is_diffusion() {
                if let Some(payload) = envelope.diffusion {
                    self.receive_diffusion(payload).await;
                }
                continue;
            }

            let request = Work::from(envelope);
            if request.is_completed() {
                return Err(DistributedError::ProtocolViolation(format!(
                    "received completed work on the request path: {}",
                    request
                )));
            }

            let work_type = request.work_type();
            let manager = match self.manager(work_type).await {
                Some(manager) if manager.accepts_requests() => manager,
                _ => {
                    debug!(%work_type, "no local workers, request dropped");
                    continue;
                }
            };

            let deadline = Instant::now() + self.config.timing.wait_for_worker();
            match self.claim_resident(&manager, deadline).await {
                Some(worker) => {
                    let result = settle(worker.work(deadline, request).await);
                    manager.record_completed(&result);
                    responses.send(WorkEnvelope::from(result)).await?;
                }
                None => {
                    debug!(%work_type, "no worker became available, signalling growth");
                    self.materials
                        .put_ligand(LigandBlob {
                            growth: 1,
                            ..Default::default()
                        })
                        .await;
                }
            }
        }
    }

    /// Route responses of one outbound edge into the managers' buffers.
    #[instrument(skip(self, responses), fields(organ = %self))]
    async fn serve_responses(
        self: Arc<Self>,
        peer: SocketAddr,
        mut responses: SplitStream<EdgeTransport>,
    ) -> DistributedResult<()> {
        let mut shutdown = self.shutdown.subscribe();
        if self.is_shut_down() {
            return Ok(());
        }
        loop {
            let envelope = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                envelope = responses.next() => match envelope {
                    Some(envelope) => envelope?,
                    None => {
                        debug!("edge closed by peer");
                        return Ok(());
                    }
                },
            };

            let work = Work::from(envelope);
            debug!(%work, "received response");
            if work.is_pending() {
                return Err(DistributedError::ProtocolViolation(format!(
                    "received pending work on the response path: {}",
                    work
                )));
            }
            let Some(manager) = self.manager(work.work_type()).await else {
                return Err(DistributedError::ProtocolViolation(format!(
                    "received completed work nobody asked for: {}",
                    work
                )));
            };
            manager.push_result(work).await;
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

impl fmt::Debug for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organ")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish()
    }
}

/// Open one edge in each direction between `a` and `b`.
///
/// # Errors
///
/// Returns the first connection failure. An edge that was already opened
/// stays open.
pub async fn connect_nodes(
    a: &Arc<Organ>,
    b: &Arc<Organ>,
    a_to_b: EdgeType,
    b_to_a: EdgeType,
) -> DistributedResult<()> {
    a.connect(b.address(), a_to_b).await?;
    b.connect(a.address(), b_to_a).await?;
    Ok(())
}

/// A worker must answer; an unanswered request counts as unavailable.
fn settle(result: Work) -> Work {
    if result.is_pending() {
        result.fail("No result")
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efflux_core::types::{STATUS_OK, STATUS_UNAVAILABLE};

    #[test]
    fn test_settle_never_returns_pending() {
        let settled = settle(Work::request(WorkType::DIGEST));
        assert_eq!(settled.status(), STATUS_UNAVAILABLE);
        let done = settle(Work::request(WorkType::DIGEST).complete("Digested."));
        assert_eq!(done.status(), STATUS_OK);
    }

    #[tokio::test]
    async fn test_initialize_binds_a_fresh_port() {
        let a = Organ::initialize("a", EffluxConfig::default()).await.unwrap();
        let b = Organ::initialize("b", EffluxConfig::default()).await.unwrap();
        assert_ne!(a.address(), b.address());
        assert!(a.address().ip().is_loopback());
        assert_eq!(a.edge_count().await, 0);
        assert_eq!(a.to_string(), format!("a ({})", a.address()));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = EffluxConfig::default();
        config.dispatch.result_buffer_size = 0;
        let err = Organ::initialize("bad", config).await.unwrap_err();
        assert!(matches!(err, DistributedError::Config(_)));
    }

    #[tokio::test]
    async fn test_completed_request_is_returned_unchanged() {
        let organ = Organ::initialize("a", EffluxConfig::default()).await.unwrap();
        let done = Work::request(WorkType::MOVE).complete("Moved.");
        assert_eq!(organ.request_work(done.clone()).await, done);
    }

    #[tokio::test]
    async fn test_connect_to_missing_peer_fails() {
        let organ = Organ::initialize("a", EffluxConfig::default()).await.unwrap();
        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let err = organ.connect(closed, EdgeType::Neuronal).await.unwrap_err();
        assert!(matches!(err, DistributedError::Connect { .. }));
        assert_eq!(organ.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_diffusion_needs_a_carrying_edge() {
        let a = Organ::initialize("a", EffluxConfig::default()).await.unwrap();
        let b = Organ::initialize("b", EffluxConfig::default()).await.unwrap();
        assert!(!a.send_diffusion().await.unwrap());
        a.connect(b.address(), EdgeType::Neuronal).await.unwrap();
        assert!(!a.send_diffusion().await.unwrap());
        assert_eq!(a.materials().check_resource().await.o2, 10000);
    }
}
