//! End-to-end test harness
//!
//! Wires dispatchers together through in-memory connections and a pump that
//! plays the role of the transport: it serializes every queued work item to
//! its wire frame, decodes it on the far side, restores the session-level
//! fields the envelope does not carry, and feeds it into the receiving
//! dispatcher.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Once};

use network::{Connection, ConnectionId, Dispatcher, DispatcherConfig, DiscoveryData};
use types::WorkItem;

/// Install the test log subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Connection backed by an in-memory queue instead of a socket.
#[derive(Debug)]
pub struct InMemoryConnection {
    id: ConnectionId,
    outbound: bool,
    queue: Mutex<VecDeque<WorkItem>>,
}

impl InMemoryConnection {
    pub fn new(id: ConnectionId, outbound: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            outbound,
            queue: Mutex::new(VecDeque::new()),
        })
    }

    pub fn drain(&self) -> Vec<WorkItem> {
        self.queue.lock().drain(..).collect()
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Connection for InMemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_outbound(&self) -> bool {
        self.outbound
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn enqueue(&self, item: WorkItem) {
        self.queue.lock().push_back(item);
    }
}

/// One node of the test mesh.
pub struct Node {
    pub dispatcher: Arc<Dispatcher>,
}

impl Node {
    pub fn new(origin_id: i32, lock_free: bool) -> Self {
        init_tracing();
        let mut config = DispatcherConfig::new(origin_id);
        config.lock_free_copy_and_swap = lock_free;
        Self {
            dispatcher: Arc::new(Dispatcher::new(config)),
        }
    }
}

/// Connect two nodes by exchanging real discovery envelopes, the way peers
/// do right after a socket connects. Returns `(a_to_b, b_to_a)` connections.
pub fn connect(a: &Node, b: &Node) -> (Arc<InMemoryConnection>, Arc<InMemoryConnection>) {
    static NEXT_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
    let next = || NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let a_to_b = InMemoryConnection::new(next(), true);
    let b_to_a = InMemoryConnection::new(next(), false);

    // a initiates: its advertisement travels to b, which answers in kind.
    let hello = a
        .dispatcher
        .discovery_data()
        .to_work_item(a.dispatcher.buffer_pool(), a.dispatcher.sequences());
    let heard_by_b = DiscoveryData::from_work_item(&hello).expect("valid discovery request");
    b.dispatcher.add_connection(b_to_a.clone(), &heard_by_b);

    let answer = b
        .dispatcher
        .discovery_data()
        .reply_to(&hello, b.dispatcher.buffer_pool());
    let heard_by_a = DiscoveryData::from_work_item(&answer).expect("valid discovery reply");
    a.dispatcher.add_connection(a_to_b.clone(), &heard_by_a);

    (a_to_b, b_to_a)
}

/// Move every item queued on `from` across the wire into `to`, through a
/// full serialize/deserialize cycle.
pub fn pump(from: &InMemoryConnection, to: &Dispatcher) -> usize {
    let items = from.drain();
    let count = items.len();
    for item in items {
        let frame = codec::serialize_to_buffer(&item).expect("encodable work item");
        let mut decoded = codec::deserialize(&frame, to.buffer_pool()).expect("decodable frame");
        // Session-level fields are not part of the envelope bytes; the
        // transport session restores them on arrival.
        decoded.origin_id = item.origin_id;
        decoded.reply_requested = item.reply_requested;
        to.dispatch(decoded);
    }
    count
}
