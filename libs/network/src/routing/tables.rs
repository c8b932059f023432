//! Routing-table bundle and update strategies
//!
//! All six routing maps live in one immutable bundle behind a single
//! pointer. Every topology mutation builds a fresh copy of the bundle and
//! publishes it atomically, so readers can never observe a state torn across
//! tables: a connection is either fully registered (origin map, function
//! maps, reverse indexes) or not at all.
//!
//! Two publication strategies are selectable at dispatcher construction:
//!
//! 1. **Locked**: a reader/writer lock around the bundle pointer. Strongly
//!    consistent; safe when multiple threads mutate topology.
//! 2. **Swap**: a lock-free atomic pointer swap, valid when one dedicated
//!    thread performs all topology mutations. The hot dispatch/send path
//!    loads the pointer with no lock in both modes; only writers differ.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use types::ServiceKey;

use crate::connection::{Connection, ConnectionId, OriginId};
use crate::routing::round_robin::RoundRobinScheduler;
use crate::service::ServiceHandler;

/// Immutable snapshot of the full routing topology.
#[derive(Clone, Default)]
pub struct RoutingTables {
    /// Which live connection(s) reach a given origin.
    pub(crate) origin_to_connections: HashMap<OriginId, RoundRobinScheduler<ConnectionId>>,
    /// Which origin(s) currently serve a function.
    pub(crate) function_to_origins: HashMap<ServiceKey, RoundRobinScheduler<OriginId>>,
    /// Reverse lookup for teardown.
    pub(crate) connection_to_origin: HashMap<ConnectionId, OriginId>,
    /// Functions to unregister when a connection drops.
    pub(crate) connection_to_functions: HashMap<ConnectionId, Vec<ServiceKey>>,
    /// Id-based connection lookup.
    pub(crate) active_connections: HashMap<ConnectionId, Arc<dyn Connection>>,
    /// Functions served in-process, bypassing the network entirely.
    pub(crate) local_services: HashMap<ServiceKey, Arc<dyn ServiceHandler>>,
}

impl RoutingTables {
    /// Resolve a live connection for an origin, rotating among candidates
    /// and skipping entries whose transport reports itself dead.
    pub fn connection_for_origin(&self, origin: OriginId) -> Option<Arc<dyn Connection>> {
        let scheduler = self.origin_to_connections.get(&origin)?;
        for _ in 0..scheduler.len() {
            let id = scheduler.next_target()?;
            if let Some(connection) = self.active_connections.get(&id) {
                if connection.is_alive() {
                    return Some(connection.clone());
                }
            }
        }
        None
    }

    /// Rotate to the next origin serving a function key.
    pub fn origin_for_function(&self, key: ServiceKey) -> Option<OriginId> {
        self.function_to_origins.get(&key)?.next_target()
    }

    pub fn local_service(&self, key: ServiceKey) -> Option<&Arc<dyn ServiceHandler>> {
        self.local_services.get(&key)
    }

    /// Function keys reachable through currently registered connections.
    pub fn routable_keys(&self) -> impl Iterator<Item = ServiceKey> + '_ {
        self.function_to_origins.keys().copied()
    }

    /// Function keys served in-process.
    pub fn local_keys(&self) -> impl Iterator<Item = ServiceKey> + '_ {
        self.local_services.keys().copied()
    }
}

/// Holder of the current routing-table bundle.
pub enum TableStore {
    /// Reader/writer lock around the bundle pointer.
    Locked(RwLock<Arc<RoutingTables>>),
    /// Single-writer lock-free pointer swap.
    Swap(ArcSwap<RoutingTables>),
}

impl TableStore {
    pub fn new(lock_free_copy_and_swap: bool) -> Self {
        let initial = Arc::new(RoutingTables::default());
        if lock_free_copy_and_swap {
            Self::Swap(ArcSwap::new(initial))
        } else {
            Self::Locked(RwLock::new(initial))
        }
    }

    /// Current bundle for the hot read path.
    pub fn load(&self) -> Arc<RoutingTables> {
        match self {
            Self::Locked(lock) => lock.read().clone(),
            Self::Swap(swap) => swap.load_full(),
        }
    }

    /// Copy the current bundle, mutate the copy, publish it atomically.
    pub fn update(&self, mutate: impl FnOnce(&mut RoutingTables)) {
        match self {
            Self::Locked(lock) => {
                let mut guard = lock.write();
                let mut next = (**guard).clone();
                mutate(&mut next);
                *guard = Arc::new(next);
            }
            Self::Swap(swap) => {
                let mut next = (*swap.load_full()).clone();
                mutate(&mut next);
                swap.store(Arc::new(next));
            }
        }
    }
}
