//! Local-service collaborator interface

use types::{ServiceKey, WorkItem};

use crate::error::Result;

/// Capability exposed by a service hosted in-process.
///
/// Handlers execute on the surrounding worker pool; the dispatcher invokes
/// them synchronously from `dispatch` and never applies a timeout; thread
/// health is the pool's concern.
pub trait ServiceHandler: Send + Sync {
    /// One-time startup hook. Returning `false` vetoes registration.
    fn startup(&self) -> bool {
        true
    }

    /// Function keys this handler serves.
    fn service_keys(&self) -> Vec<ServiceKey>;

    /// Process one request, taking ownership of it.
    ///
    /// Return `Ok(Some(reply))` to answer, `Ok(None)` when no reply is
    /// produced. An `Err` is logged by the dispatcher and converted into a
    /// `ProcessingError` reply when the request asked for one.
    fn process_request(&self, request: WorkItem) -> Result<Option<WorkItem>>;
}
