//! Core data types for the work-item routing substrate
//!
//! This crate contains the pure data structures shared by every layer:
//! - Service addressing: the (type, module, function) triple and its
//!   collision-free integer key encoding
//! - The work-item envelope: the self-contained unit of work carrying
//!   routing addresses, correlation id, reply semantics and payloads
//! - Pooled payload buffers with reference-counted ownership
//!
//! ## What This Crate Does NOT Contain
//! - Wire encoding/decoding (belongs in codec/)
//! - Routing tables, dispatch or connection handling (belongs in network/)

pub mod address;
pub mod buffers;
pub mod work_item;

pub use address::{ServiceAddress, ServiceKey, SERVICE_FIELD_MAX, SERVICE_FIELD_MIN};
pub use buffers::{BufferPool, PooledPayload};
pub use work_item::{IdSequences, Priority, ResponseStatus, WorkItem};
