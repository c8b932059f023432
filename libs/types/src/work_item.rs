//! Work-item envelope
//!
//! The self-contained unit of work exchanged between nodes: routing
//! addresses, priority, correlation id, reply semantics, and the opaque
//! request/response payload sections. A work item is a request XOR a reply,
//! never both. Lifecycle methods (`reply`, `forward`, the impersonated
//! variants and `unprocessed_error_reply`) always produce a *new* item;
//! nothing mutates an envelope in place except status stamping prior to
//! transmission.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};

use crate::address::ServiceAddress;
use crate::address::ServiceKey;
use crate::buffers::PooledPayload;

/// Delivery priority, ordered: a higher value is a higher priority.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Priority {
    /// Background traffic (bulk transfers)
    Background = 0,
    /// Normal priority (default)
    Normal = 1,
    /// Latency-sensitive but not critical
    High = 2,
    /// Critical system messages (discovery, connection management)
    Critical = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Outcome carried by a reply. `None` on requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive,
)]
#[repr(u8)]
pub enum ResponseStatus {
    /// Not a reply, or no status assigned yet
    None = 0,
    /// Handler processed the request successfully
    Success = 1,
    /// No local handler and no routable connection for the destination
    DestinationUnreachable = 2,
    /// The item could not be delivered within the retry window
    TransmissionError = 3,
    /// A local handler failed while processing the request
    ProcessingError = 4,
}

impl Default for ResponseStatus {
    fn default() -> Self {
        Self::None
    }
}

impl ResponseStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::DestinationUnreachable | Self::TransmissionError | Self::ProcessingError
        )
    }
}

/// Per-destination-service-type unique-id sequences.
///
/// Owned by the constructing node, not process-global, so independent nodes
/// in one process (and tests) get isolated id spaces. Ids start at 1 and wrap
/// on `i32` overflow.
#[derive(Debug, Default)]
pub struct IdSequences {
    counters: DashMap<u32, AtomicI32>,
}

impl IdSequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id in the sequence for the given destination service type.
    pub fn next_id(&self, service_type: u32) -> i32 {
        self.counters
            .entry(service_type)
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }
}

/// The envelope carrying one request or reply across every boundary.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Correlation id, assigned at construction from the per-destination-type
    /// sequence and never reassigned. A reply carries its request's id.
    pub unique_id: i32,
    pub priority: Priority,
    /// The node that initiated the original request.
    pub origin_id: i32,
    pub is_reply: bool,
    pub reply_requested: bool,
    pub destination: ServiceAddress,
    pub source: ServiceAddress,
    pub response_status: ResponseStatus,
    pub creation_date: DateTime<Utc>,
    /// Optional diagnostic text (error details, tracing context).
    pub message_text: Option<String>,
    pub request_payload: Option<PooledPayload>,
    pub response_payload: Option<PooledPayload>,
}

impl WorkItem {
    /// Create a new request envelope.
    pub fn request(
        destination: ServiceAddress,
        source: ServiceAddress,
        priority: Priority,
        reply_requested: bool,
        sequences: &IdSequences,
    ) -> Self {
        Self {
            unique_id: sequences.next_id(destination.service_type()),
            priority,
            origin_id: 0,
            is_reply: false,
            reply_requested,
            destination,
            source,
            response_status: ResponseStatus::None,
            creation_date: Utc::now(),
            message_text: None,
            request_payload: None,
            response_payload: None,
        }
    }

    pub fn with_request_payload(mut self, payload: Option<PooledPayload>) -> Self {
        self.request_payload = payload;
        self
    }

    pub fn with_message_text(mut self, text: impl Into<String>) -> Self {
        self.message_text = Some(text.into());
        self
    }

    pub fn destination_key(&self) -> ServiceKey {
        self.destination.key()
    }

    pub fn source_key(&self) -> ServiceKey {
        self.source.key()
    }

    /// Age of the envelope, measured from its creation timestamp.
    pub fn age(&self) -> std::time::Duration {
        (Utc::now() - self.creation_date).to_std().unwrap_or_default()
    }

    /// Build the reply to this request: addresses swapped, correlation id and
    /// origin preserved, request payload shared so the replying side can still
    /// inspect it.
    pub fn reply(&self) -> Self {
        self.impersonated_reply(self.destination)
    }

    /// Build a reply whose source address is `source` rather than this
    /// request's destination, for handlers answering on behalf of another
    /// function.
    pub fn impersonated_reply(&self, source: ServiceAddress) -> Self {
        Self {
            unique_id: self.unique_id,
            priority: self.priority,
            origin_id: self.origin_id,
            is_reply: true,
            reply_requested: false,
            destination: self.source,
            source,
            response_status: ResponseStatus::Success,
            creation_date: Utc::now(),
            message_text: None,
            request_payload: self.request_payload.clone(),
            response_payload: None,
        }
    }

    /// Redirect this request to a new destination, preserving correlation id,
    /// origin, reply semantics and the request payload.
    pub fn forward(&self, destination: ServiceAddress) -> Self {
        self.impersonated_forward(destination, self.source)
    }

    /// Forward with a replaced source address.
    pub fn impersonated_forward(&self, destination: ServiceAddress, source: ServiceAddress) -> Self {
        Self {
            unique_id: self.unique_id,
            priority: self.priority,
            origin_id: self.origin_id,
            is_reply: false,
            reply_requested: self.reply_requested,
            destination,
            source,
            response_status: ResponseStatus::None,
            // Age gates the retry window, so a forward keeps the original clock.
            creation_date: self.creation_date,
            message_text: self.message_text.clone(),
            request_payload: self.request_payload.clone(),
            response_payload: None,
        }
    }

    /// Synthesize an error reply without invoking any handler. Used for
    /// destination-unreachable and transmission-error conditions.
    pub fn unprocessed_error_reply(
        &self,
        status: ResponseStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: self.unique_id,
            priority: self.priority,
            origin_id: self.origin_id,
            is_reply: true,
            reply_requested: false,
            destination: self.source,
            source: self.destination,
            response_status: status,
            creation_date: Utc::now(),
            message_text: Some(message.into()),
            request_payload: None,
            response_payload: None,
        }
    }
}
