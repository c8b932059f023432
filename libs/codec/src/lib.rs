//! Wire codec for work-item envelopes
//!
//! ## Purpose
//!
//! This crate is the "rules" layer between the pure data structures in
//! `types` and the transport connections in `network`:
//! - Bit-exact encoding of a work item into its wire frame: a fixed 50-byte
//!   little-endian header followed by the variable message-text and payload
//!   sections
//! - Checked decoding with explicit truncation, length-mismatch and
//!   invalid-field errors
//!
//! Zero-length sections are omitted entirely on the wire (size field = 0, no
//! bytes emitted) and decode back to absent, never to zero-length
//! allocations. `deserialize(serialize(x))` reproduces every wire field
//! exactly.
//!
//! ## What This Crate Does NOT Contain
//! - Socket management or connection framing (belongs in network/)
//! - Routing or dispatch logic

pub mod builder;
pub mod constants;
pub mod error;
pub mod parser;

pub use builder::{serialize_to_buffer, serialized_size};
pub use constants::{datetime_to_ticks, ticks_to_datetime, HEADER_SIZE, MAX_SECTION_SIZE};
pub use error::{BuildError, ParseError, ParseResult};
pub use parser::deserialize;
