//! Routing and dispatch core
//!
//! ## Purpose
//!
//! Maintains, under concurrent mutation, the mapping from a requested
//! service function to a concrete live connection; load-balances among
//! equivalent targets; correlates asynchronous replies with their original
//! callers; and absorbs topology churn without stalling the hot path.
//!
//! ## Architecture Role
//!
//! ```text
//! transport threads → Dispatcher::dispatch → local handler | outbound queue
//!                                                               ↓
//! pump thread       → Dispatcher::send_work_items → routing tables → connection send queue
//! ```
//!
//! Socket I/O, the worker pool executing handlers, and process bootstrap are
//! external collaborators behind the [`Connection`] and [`ServiceHandler`]
//! traits; nothing in this crate blocks on the network.

pub mod connection;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod routing;
pub mod service;

pub use connection::{Connection, ConnectionId, OriginId};
pub use discovery::{discovery_address, DiscoveryData, DISCOVERY_KEY};
pub use dispatch::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, Result};
pub use routing::round_robin::RoundRobinScheduler;
pub use service::ServiceHandler;
