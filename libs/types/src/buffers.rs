//! Pooled payload buffers
//!
//! Work-item payloads are opaque byte sections that get copied in and out of
//! wire frames at high rate. Instead of allocating per payload, a bounded
//! free-list pool hands out reusable `BytesMut` buffers, and each payload is
//! a reference-counted handle: cloning a work item (reply, forward, pending
//! copy) shares the handle, and the buffer returns to the pool exactly once,
//! when the last handle drops.

use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Default capacity of each pooled buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

/// Default maximum number of idle buffers retained by the pool.
pub const DEFAULT_POOL_LIMIT: usize = 256;

/// Bounded free-list of reusable payload buffers.
///
/// Cheap to clone; clones share the same free list.
#[derive(Debug, Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

#[derive(Debug)]
struct PoolShared {
    free: Mutex<Vec<BytesMut>>,
    max_pooled: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_POOL_LIMIT, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_limits(max_pooled: usize, buffer_capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                max_pooled,
                buffer_capacity,
            }),
        }
    }

    /// Rent a cleared buffer with at least `len` capacity.
    fn rent(&self, len: usize) -> BytesMut {
        let mut free = self.shared.free.lock();
        match free.pop() {
            Some(buf) if buf.capacity() >= len => buf,
            Some(_) | None => BytesMut::with_capacity(len.max(self.shared.buffer_capacity)),
        }
    }

    /// Copy `data` into a pooled buffer and wrap it in a shared payload handle.
    ///
    /// Returns `None` for empty input: zero-length payloads are represented as
    /// absent, never as zero-length allocations.
    pub fn payload_from_slice(&self, data: &[u8]) -> Option<PooledPayload> {
        if data.is_empty() {
            return None;
        }
        let mut buf = self.rent(data.len());
        buf.extend_from_slice(data);
        Some(PooledPayload {
            inner: Arc::new(PayloadInner {
                data: buf,
                pool: Arc::downgrade(&self.shared),
            }),
        })
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle_count(&self) -> usize {
        self.shared.free.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-counted handle to a pooled payload buffer.
///
/// Immutable once created. Clones share the underlying buffer; the buffer is
/// released back to its pool when the last handle drops.
#[derive(Debug, Clone)]
pub struct PooledPayload {
    inner: Arc<PayloadInner>,
}

impl PooledPayload {
    pub fn as_slice(&self) -> &[u8] {
        &self.inner.data
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }
}

impl PartialEq for PooledPayload {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for PooledPayload {}

#[derive(Debug)]
struct PayloadInner {
    data: BytesMut,
    pool: Weak<PoolShared>,
}

impl Drop for PayloadInner {
    fn drop(&mut self) {
        // Pool may already be gone during shutdown; the buffer then just frees.
        if let Some(pool) = self.pool.upgrade() {
            let mut buf = std::mem::take(&mut self.data);
            buf.clear();
            let mut free = pool.free.lock();
            if free.len() < pool.max_pooled {
                free.push(buf);
            }
        }
    }
}
