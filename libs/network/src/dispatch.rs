//! Work-item dispatcher
//!
//! Owns the routing tables and the pending request/response correlation
//! store; answers "who handles this function" and "how do I reach that
//! origin"; executes local handlers; and pumps the outbound queue into
//! connection send queues.
//!
//! Inbound envelopes enter through [`Dispatcher::dispatch`], local callers
//! send through [`Dispatcher::schedule_request`], and one or more transport
//! threads drive [`Dispatcher::send_work_items`] periodically. Connection
//! lifecycle is driven by the discovery handshake through
//! [`Dispatcher::add_connection`] / [`Dispatcher::drop_connection`].
//!
//! No method here ever propagates an error to its caller: every failure is
//! logged and degrades to dropping or bouncing the offending item.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use types::{BufferPool, IdSequences, ResponseStatus, ServiceKey, WorkItem};

use crate::connection::{Connection, ConnectionId, OriginId};
use crate::discovery::DiscoveryData;
use crate::routing::tables::{RoutingTables, TableStore};
use crate::service::ServiceHandler;

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// This node's identity in the mesh.
    pub origin_id: OriginId,
    /// How long an undeliverable reply keeps being requeued before it is
    /// silently dropped.
    pub dropped_connection_retry_timeout: Duration,
    /// How long an unclaimed pending response survives before a sweep
    /// evicts it.
    pub pending_response_ttl: Duration,
    /// Select the single-writer lock-free table-update strategy instead of
    /// the reader/writer-locked one.
    pub lock_free_copy_and_swap: bool,
    /// Maximum items drained per `send_work_items` call.
    pub send_batch_size: usize,
}

impl DispatcherConfig {
    pub fn new(origin_id: OriginId) -> Self {
        Self {
            origin_id,
            ..Default::default()
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            origin_id: 0,
            dropped_connection_retry_timeout: Duration::from_secs(60),
            pending_response_ttl: Duration::from_secs(300),
            lock_free_copy_and_swap: false,
            send_batch_size: 128,
        }
    }
}

/// Pending request/response correlation store, keyed by unique id.
#[derive(Default)]
struct PendingStore {
    requests: HashMap<i32, WorkItem>,
    responses: HashMap<i32, WorkItem>,
}

/// The routing and dispatch core of one node.
pub struct Dispatcher {
    config: DispatcherConfig,
    tables: TableStore,
    pending: RwLock<PendingStore>,
    outbound_tx: Sender<WorkItem>,
    outbound_rx: Receiver<WorkItem>,
    sequences: IdSequences,
    pool: BufferPool,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let tables = TableStore::new(config.lock_free_copy_and_swap);
        let (outbound_tx, outbound_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            tables,
            pending: RwLock::new(PendingStore::default()),
            outbound_tx,
            outbound_rx,
            sequences: IdSequences::new(),
            pool: BufferPool::new(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Unique-id sequences for building requests destined through this node.
    pub fn sequences(&self) -> &IdSequences {
        &self.sequences
    }

    /// Payload buffer pool shared with the codec layer.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Number of items currently waiting in the outbound queue.
    pub fn outbound_depth(&self) -> usize {
        self.outbound_rx.len()
    }

    /// Register an in-process service. Returns whether any function key was
    /// newly registered.
    ///
    /// The handler's startup hook runs first and can veto registration. The
    /// first registrant for a key wins; duplicates are logged, not fatal.
    pub fn register_local_service(&self, handler: Arc<dyn ServiceHandler>) -> bool {
        if !handler.startup() {
            warn!("service handler declined startup; not registering");
            return false;
        }

        let keys = handler.service_keys();
        let mut registered = Vec::new();
        self.tables.update(|tables| {
            for &key in &keys {
                if tables.local_services.contains_key(&key) {
                    warn!(service_key = key, "duplicate local service registration ignored");
                    continue;
                }
                tables.local_services.insert(key, handler.clone());
                registered.push(key);
            }
        });

        info!(keys = ?registered, "registered local service");
        !registered.is_empty()
    }

    /// Register a connection and everything its peer advertised, as one
    /// atomically published table update.
    ///
    /// Functions already served locally are skipped: local service always
    /// wins over remote routing. Re-adding a live connection id replaces the
    /// stale entry (logged, since it should not normally occur).
    pub fn add_connection(&self, connection: Arc<dyn Connection>, discovery: &DiscoveryData) {
        let connection_id = connection.id();
        let origin = discovery.origin_id;

        self.tables.update(|tables| {
            if tables.active_connections.contains_key(&connection_id) {
                error!(
                    connection_id,
                    "connection id already registered; overwriting stale entry"
                );
                Self::remove_connection_entries(tables, connection_id);
            }

            tables.active_connections.insert(connection_id, connection.clone());
            tables.connection_to_origin.insert(connection_id, origin);
            tables
                .origin_to_connections
                .entry(origin)
                .or_default()
                .register(connection_id);

            let mut contributed = Vec::new();
            for &key in &discovery.service_keys {
                if tables.local_services.contains_key(&key) {
                    debug!(service_key = key, "ignoring advertised function served locally");
                    continue;
                }
                tables
                    .function_to_origins
                    .entry(key)
                    .or_default()
                    .register(origin);
                contributed.push(key);
            }
            tables.connection_to_functions.insert(connection_id, contributed);
        });

        info!(
            connection_id,
            origin,
            advertised = discovery.service_keys.len(),
            "registered connection"
        );
    }

    /// Reverse `add_connection` for a departed connection, pruning schedulers
    /// that become empty.
    pub fn drop_connection(&self, connection_id: ConnectionId) {
        self.tables.update(|tables| {
            Self::remove_connection_entries(tables, connection_id);
        });
        info!(connection_id, "dropped connection");
    }

    fn remove_connection_entries(tables: &mut RoutingTables, connection_id: ConnectionId) {
        tables.active_connections.remove(&connection_id);
        let Some(origin) = tables.connection_to_origin.remove(&connection_id) else {
            return;
        };

        if let Some(scheduler) = tables.origin_to_connections.get(&origin) {
            scheduler.deregister(&connection_id);
            if scheduler.is_empty() {
                tables.origin_to_connections.remove(&origin);
            }
        }

        let contributed = tables
            .connection_to_functions
            .remove(&connection_id)
            .unwrap_or_default();
        for key in contributed {
            // Another connection of the same origin may still advertise the
            // function; only the origin's last carrier unregisters it.
            let still_carried = tables.connection_to_functions.iter().any(|(id, keys)| {
                tables.connection_to_origin.get(id) == Some(&origin) && keys.contains(&key)
            });
            if still_carried {
                continue;
            }
            if let Some(scheduler) = tables.function_to_origins.get(&key) {
                scheduler.deregister(&origin);
                if scheduler.is_empty() {
                    tables.function_to_origins.remove(&key);
                }
            }
        }
    }

    /// This node's advertisement for the discovery handshake: its identity
    /// plus the union of locally-served and currently-routable function keys.
    pub fn discovery_data(&self) -> DiscoveryData {
        let tables = self.tables.load();
        let mut keys: HashSet<ServiceKey> = tables.local_keys().collect();
        keys.extend(tables.routable_keys());
        let mut service_keys: Vec<ServiceKey> = keys.into_iter().collect();
        service_keys.sort_unstable();
        DiscoveryData {
            origin_id: self.config.origin_id,
            service_keys,
        }
    }

    /// Inbound entry point: route one envelope.
    ///
    /// Replies for this node complete their pending request; replies in
    /// transit and unservable requests go outbound; requests for a local
    /// function run their handler synchronously on the calling thread.
    pub fn dispatch(&self, item: WorkItem) {
        if item.is_reply {
            if item.origin_id == self.config.origin_id {
                self.complete_reply(item);
            } else {
                self.enqueue_outbound(item);
            }
            return;
        }

        let key = item.destination_key();
        let handler = self.tables.load().local_service(key).cloned();
        match handler {
            Some(handler) => self.dispatch_local(&handler, item),
            None => self.enqueue_outbound(item),
        }
    }

    fn dispatch_local(&self, handler: &Arc<dyn ServiceHandler>, item: WorkItem) {
        let key = item.destination_key();
        let unique_id = item.unique_id;
        let reply_requested = item.reply_requested;
        // Payload handles are shared, so this clone is cheap; it outlives the
        // handler call so an error reply can still be synthesized.
        let template = item.clone();

        match handler.process_request(item) {
            Ok(Some(reply)) => self.dispatch(reply),
            Ok(None) => {
                if reply_requested {
                    error!(
                        unique_id,
                        service_key = key,
                        "handler produced no reply for a reply-requested item; dropping"
                    );
                }
            }
            Err(err) => {
                error!(unique_id, service_key = key, error = %err, "local handler failed");
                if reply_requested {
                    self.dispatch(template.unprocessed_error_reply(
                        ResponseStatus::ProcessingError,
                        err.to_string(),
                    ));
                }
            }
        }
    }

    fn complete_reply(&self, item: WorkItem) {
        let mut pending = self.pending.write();
        pending.requests.remove(&item.unique_id);
        if let Some(previous) = pending.responses.insert(item.unique_id, item) {
            warn!(
                unique_id = previous.unique_id,
                "pending response superseded by newer reply"
            );
        }
    }

    /// Caller-facing send path: stamp origin and request flags, record the
    /// pending request when a reply is wanted, then dispatch.
    pub fn schedule_request(&self, mut item: WorkItem) {
        item.origin_id = self.config.origin_id;
        item.is_reply = false;
        if item.reply_requested {
            self.pending
                .write()
                .requests
                .insert(item.unique_id, item.clone());
        }
        self.dispatch(item);
    }

    /// Poll-based retrieval of a completed reply. Removes the entry, so a
    /// second call for the same id returns `None`.
    pub fn get_processed_response(&self, unique_id: i32) -> Option<WorkItem> {
        self.pending.write().responses.remove(&unique_id)
    }

    /// Evict pending responses (and orphaned pending requests) older than the
    /// configured TTL. Callers that abandon a request would otherwise leak
    /// their entries forever.
    pub fn sweep_expired_responses(&self) -> usize {
        let ttl = self.config.pending_response_ttl;
        let mut pending = self.pending.write();
        let before = pending.responses.len() + pending.requests.len();
        pending.responses.retain(|_, item| item.age() < ttl);
        pending.requests.retain(|_, item| item.age() < ttl);
        let swept = before - pending.responses.len() - pending.requests.len();
        if swept > 0 {
            debug!(swept, "swept expired pending entries");
        }
        swept
    }

    /// Drain the outbound queue (bounded batch) and resolve a destination
    /// connection for each item. Returns how many items were handed to a
    /// connection send queue.
    pub fn send_work_items(&self) -> usize {
        let mut batch = Vec::new();
        for _ in 0..self.config.send_batch_size {
            match self.outbound_rx.try_recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
        }
        if batch.is_empty() {
            return 0;
        }

        let tables = self.tables.load();
        let mut delivered = 0;
        for item in batch {
            if item.is_reply {
                delivered += self.send_reply(&tables, item);
            } else {
                delivered += self.send_request(&tables, item);
            }
        }
        delivered
    }

    fn send_reply(&self, tables: &RoutingTables, item: WorkItem) -> usize {
        match tables.connection_for_origin(item.origin_id) {
            Some(connection) => {
                connection.enqueue(item);
                1
            }
            None => {
                if item.age() < self.config.dropped_connection_retry_timeout {
                    debug!(
                        unique_id = item.unique_id,
                        origin = item.origin_id,
                        "no connection for reply origin; requeueing"
                    );
                    self.enqueue_outbound(item);
                } else {
                    warn!(
                        unique_id = item.unique_id,
                        origin = item.origin_id,
                        "dropping reply: origin unreachable past retry window"
                    );
                }
                0
            }
        }
    }

    fn send_request(&self, tables: &RoutingTables, item: WorkItem) -> usize {
        let key = item.destination_key();
        let target = tables
            .origin_for_function(key)
            .and_then(|origin| tables.connection_for_origin(origin));

        if let Some(connection) = target {
            connection.enqueue(item);
            return 1;
        }

        warn!(
            unique_id = item.unique_id,
            service_key = key,
            "destination unreachable; bouncing error reply to requester"
        );
        let bounce = item.unprocessed_error_reply(
            ResponseStatus::DestinationUnreachable,
            format!("no route to service key {key}"),
        );
        match tables.connection_for_origin(item.origin_id) {
            // The requester is reachable directly; hand the bounce to its
            // connection.
            Some(connection) => {
                connection.enqueue(bounce);
                1
            }
            // Re-enter dispatch: a locally-originated bounce completes the
            // caller's pending request, a remote one rides the outbound queue.
            None => {
                self.dispatch(bounce);
                0
            }
        }
    }

    fn enqueue_outbound(&self, item: WorkItem) {
        if self.outbound_tx.send(item).is_err() {
            error!("outbound queue closed; dropping work item");
        }
    }
}
