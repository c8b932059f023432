//! Connection collaborator interface
//!
//! The transport layer owns sockets and their read/write loops; the
//! dispatcher only needs a stable id, a liveness predicate, and the
//! connection's inbound send queue to push resolved work items into.

use std::fmt;
use types::WorkItem;

/// Stable unique id of a connection within this process.
pub type ConnectionId = u64;

/// Identity of a node in the mesh.
pub type OriginId = i32;

/// Capability exposed by a live transport connection.
pub trait Connection: Send + Sync + fmt::Debug {
    /// Stable unique id, constant for the lifetime of the connection.
    fn id(&self) -> ConnectionId;

    /// Whether this end initiated the connection.
    fn is_outbound(&self) -> bool;

    /// Whether the underlying transport still considers itself healthy.
    fn is_alive(&self) -> bool;

    /// Hand a resolved work item to this connection's send queue.
    ///
    /// Must not block on socket I/O; the connection's own write loop drains
    /// the queue.
    fn enqueue(&self, item: WorkItem);
}
