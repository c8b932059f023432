//! Routing primitives: round-robin target selection and the routing-table
//! bundle with its two update strategies.

pub mod round_robin;
pub mod tables;

pub use round_robin::RoundRobinScheduler;
pub use tables::{RoutingTables, TableStore};
