//! Service addressing
//!
//! A callable destination is identified by a (type, module, function) triple,
//! each component clamped to `[1, 999]`. The triple encodes bijectively into
//! a single integer `ServiceKey` used as the routing-table key and as the
//! wire-level destination/source address. Two addresses are routing-equivalent
//! iff their keys are equal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest allowed value for each address component.
pub const SERVICE_FIELD_MIN: u32 = 1;
/// Highest allowed value for each address component.
pub const SERVICE_FIELD_MAX: u32 = 999;

/// Integer encoding of a service address: `type * 1_000_000 + module * 1_000 + function`.
///
/// Collision-free for components in `[1, 999]`.
pub type ServiceKey = u32;

/// Immutable (type, module, function) triple identifying a callable destination.
///
/// Components are clamped into range at construction, so every instance holds
/// a valid, encodable address and `key()` is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAddress {
    service_type: u32,
    service_module: u32,
    service_function: u32,
}

impl ServiceAddress {
    /// Create an address, clamping each component into `[1, 999]`.
    pub fn new(service_type: u32, service_module: u32, service_function: u32) -> Self {
        Self {
            service_type: clamp_field(service_type),
            service_module: clamp_field(service_module),
            service_function: clamp_field(service_function),
        }
    }

    /// Create an address from signed wire-format components.
    ///
    /// Negative values clamp to the minimum, like any other out-of-range input.
    pub fn from_wire(service_type: i32, service_module: i32, service_function: i32) -> Self {
        Self::new(
            service_type.max(0) as u32,
            service_module.max(0) as u32,
            service_function.max(0) as u32,
        )
    }

    /// Decode an address from its integer key.
    pub fn from_key(key: ServiceKey) -> Self {
        Self::new(key / 1_000_000, key / 1_000 % 1_000, key % 1_000)
    }

    pub fn service_type(&self) -> u32 {
        self.service_type
    }

    pub fn service_module(&self) -> u32 {
        self.service_module
    }

    pub fn service_function(&self) -> u32 {
        self.service_function
    }

    /// Integer key for routing-table lookups and wire addressing.
    pub fn key(&self) -> ServiceKey {
        self.service_type * 1_000_000 + self.service_module * 1_000 + self.service_function
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.service_type, self.service_module, self.service_function
        )
    }
}

fn clamp_field(value: u32) -> u32 {
    value.clamp(SERVICE_FIELD_MIN, SERVICE_FIELD_MAX)
}
