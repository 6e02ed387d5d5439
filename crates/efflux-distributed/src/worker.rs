//! The contract between an organ and the cells living in it.

use crate::organ::Organ;
use async_trait::async_trait;
use efflux_core::types::{Work, WorkType};
use std::sync::{Arc, Weak};
use tokio::time::Instant;

/// A cell that performs one type of work.
///
/// Worker identity is reference identity: the organ compares `WorkerRef`s
/// by pointer, never by content.
///
/// # Example
///
/// ```rust,ignore
/// struct Heart { organ: std::sync::Mutex<Option<Weak<Organ>>> }
///
/// #[async_trait]
/// impl Worker for Heart {
///     fn work_type(&self) -> WorkType { WorkType::PUMP }
///     fn set_organ(&self, organ: Option<Weak<Organ>>) { *self.organ.lock().unwrap() = organ; }
///     async fn work(&self, _deadline: Instant, request: Work) -> Work {
///         request.complete("Pumped.")
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync {
    /// The work type this worker performs.
    fn work_type(&self) -> WorkType;

    /// Called when the worker joins an organ (`Some`) or leaves it (`None`).
    fn set_organ(&self, organ: Option<Weak<Organ>>);

    /// Perform one unit of work before `deadline`.
    ///
    /// The returned `Work` should be completed; a pending result is turned
    /// into a 503 by the organ.
    async fn work(&self, deadline: Instant, request: Work) -> Work;

    /// A dying worker is no longer handed requests.
    fn is_apoptosis(&self) -> bool {
        false
    }
}

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// Whether two handles point at the same worker.
pub(crate) fn same_worker(a: &WorkerRef, b: &WorkerRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
