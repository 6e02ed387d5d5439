//! Per-work-type pairing of idle workers, incoming requests and results.

use crate::status::WorkStatus;
use crate::worker::WorkerRef;
use efflux_core::types::{Work, WorkType};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Hand-off point for one [`WorkType`] inside an organ.
///
/// Idle workers are handed off through a single slot rather than a strict
/// rendezvous: one announced worker can sit in the slot with no claimer
/// present, and the next offer waits until that worker has been claimed.
/// A worker waiting in the slot may have died or left the organ by the
/// time it is claimed, so claimers re-check it. Completed results for
/// this organ's own requests queue up in a bounded buffer, and a full
/// buffer blocks whoever pushes the next result.
pub struct Manager {
    work_type: WorkType,
    available_tx: mpsc::Sender<WorkerRef>,
    available_rx: Mutex<mpsc::Receiver<WorkerRef>>,
    results_tx: mpsc::Sender<Work>,
    results_rx: Mutex<mpsc::Receiver<Work>>,
    resident: AtomicUsize,
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    completed: AtomicU64,
    completed_failures: AtomicU64,
}

impl Manager {
    pub fn new(work_type: WorkType, result_buffer_size: usize) -> Self {
        let (available_tx, available_rx) = mpsc::channel(1);
        let (results_tx, results_rx) = mpsc::channel(result_buffer_size.max(1));
        Self {
            work_type,
            available_tx,
            available_rx: Mutex::new(available_rx),
            results_tx,
            results_rx: Mutex::new(results_rx),
            resident: AtomicUsize::new(0),
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            completed_failures: AtomicU64::new(0),
        }
    }

    pub fn work_type(&self) -> WorkType {
        self.work_type
    }

    /// Whether any worker of this type lives in the organ.
    ///
    /// A manager created only to collect results for outgoing requests
    /// never accepts requests.
    pub fn accepts_requests(&self) -> bool {
        self.resident.load(Ordering::Acquire) > 0
    }

    pub(crate) fn add_resident(&self) {
        self.resident.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn remove_resident(&self) {
        let _ = self
            .resident
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Announce an idle worker.
    ///
    /// Returns as soon as the worker is parked in the hand-off slot, even
    /// if nobody is claiming yet. Waits only while another worker occupies
    /// the slot.
    pub async fn offer(&self, worker: WorkerRef) {
        // The manager owns a receiver, so the channel never closes.
        let _ = self.available_tx.send(worker).await;
    }

    /// Wait for an idle worker until `deadline`.
    ///
    /// Workers that started dying while waiting in the slot are skipped.
    pub async fn claim_worker(&self, deadline: Instant) -> Option<WorkerRef> {
        let claim = async {
            let mut available = self.available_rx.lock().await;
            loop {
                let worker = available.recv().await?;
                if !worker.is_apoptosis() {
                    return Some(worker);
                }
                debug!(work_type = %self.work_type, "skipping dying worker");
            }
        };
        timeout_at(deadline, claim).await.ok().flatten()
    }

    /// Buffer a completed result, waiting while the buffer is full.
    pub async fn push_result(&self, work: Work) {
        let _ = self.results_tx.send(work).await;
    }

    /// Take a buffered result if one is ready right now.
    pub fn try_take_result(&self) -> Option<Work> {
        self.results_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Wait for a result until `deadline`.
    pub async fn take_result(&self, deadline: Instant) -> Option<Work> {
        let take = async { self.results_rx.lock().await.recv().await };
        timeout_at(deadline, take).await.ok().flatten()
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the outcome of one of this organ's own requests.
    pub(crate) fn record_outcome(&self, result: &Work) {
        if result.is_success() {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count work done here on behalf of a peer.
    pub(crate) fn record_completed(&self, result: &Work) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if !result.is_success() {
            self.completed_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read and reset the counters.
    pub fn drain_stats(&self) -> WorkStatus {
        WorkStatus {
            work_type: self.work_type,
            requests: self.requests.swap(0, Ordering::Relaxed),
            successes: self.successes.swap(0, Ordering::Relaxed),
            failures: self.failures.swap(0, Ordering::Relaxed),
            completed: self.completed.swap(0, Ordering::Relaxed),
            completed_failures: self.completed_failures.swap(0, Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("work_type", &self.work_type)
            .field("resident", &self.resident.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organ::Organ;
    use crate::worker::Worker;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    struct Idle {
        dying: AtomicBool,
    }

    #[async_trait]
    impl Worker for Idle {
        fn work_type(&self) -> WorkType {
            WorkType::FILTER
        }

        fn set_organ(&self, _organ: Option<Weak<Organ>>) {}

        async fn work(&self, _deadline: Instant, request: Work) -> Work {
            request.complete("Filtered.")
        }

        fn is_apoptosis(&self) -> bool {
            self.dying.load(Ordering::Relaxed)
        }
    }

    fn idle(dying: bool) -> WorkerRef {
        Arc::new(Idle {
            dying: AtomicBool::new(dying),
        })
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(100)
    }

    #[tokio::test]
    async fn test_offered_worker_is_claimed() {
        let manager = Manager::new(WorkType::FILTER, 10);
        manager.offer(idle(false)).await;
        let worker = manager.claim_worker(soon()).await;
        assert!(worker.is_some());
    }

    #[tokio::test]
    async fn test_offer_parks_one_worker_without_claimer() {
        let manager = Manager::new(WorkType::FILTER, 10);
        let wait = Duration::from_millis(50);
        let parked = tokio::time::timeout(wait, manager.offer(idle(false))).await;
        assert!(parked.is_ok());

        let second = tokio::time::timeout(wait, manager.offer(idle(false))).await;
        assert!(second.is_err());

        assert!(manager.claim_worker(soon()).await.is_some());
        assert!(manager.claim_worker(soon()).await.is_none());
    }

    #[tokio::test]
    async fn test_claim_times_out_without_workers() {
        let manager = Manager::new(WorkType::FILTER, 10);
        assert!(manager.claim_worker(soon()).await.is_none());
    }

    #[tokio::test]
    async fn test_dying_workers_are_skipped() {
        let manager = Arc::new(Manager::new(WorkType::FILTER, 10));
        manager.offer(idle(true)).await;
        let offering = Arc::clone(&manager);
        tokio::spawn(async move { offering.offer(idle(false)).await });
        let worker = manager.claim_worker(soon()).await.unwrap();
        assert!(!worker.is_apoptosis());
    }

    #[tokio::test]
    async fn test_results_are_buffered_in_order() {
        let manager = Manager::new(WorkType::FILTER, 10);
        assert!(manager.try_take_result().is_none());
        manager
            .push_result(Work::request(WorkType::FILTER).complete("first"))
            .await;
        manager
            .push_result(Work::request(WorkType::FILTER).complete("second"))
            .await;
        assert_eq!(manager.try_take_result().unwrap().result(), "first");
        assert_eq!(manager.take_result(soon()).await.unwrap().result(), "second");
        assert!(manager.take_result(soon()).await.is_none());
    }

    #[tokio::test]
    async fn test_full_buffer_applies_backpressure() {
        let manager = Manager::new(WorkType::FILTER, 1);
        manager.push_result(Work::timeout(WorkType::FILTER)).await;
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            manager.push_result(Work::timeout(WorkType::FILTER)),
        )
        .await;
        assert!(blocked.is_err());
    }

    #[test]
    fn test_residency_and_stats() {
        let manager = Manager::new(WorkType::FILTER, 10);
        assert!(!manager.accepts_requests());
        manager.add_resident();
        assert!(manager.accepts_requests());
        manager.remove_resident();
        manager.remove_resident();
        assert!(!manager.accepts_requests());

        manager.record_request();
        manager.record_request();
        manager.record_outcome(&Work::request(WorkType::FILTER).complete("ok"));
        manager.record_outcome(&Work::timeout(WorkType::FILTER));
        manager.record_completed(&Work::timeout(WorkType::FILTER));

        let stats = manager.drain_stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completed_failures, 1);

        let reset = manager.drain_stats();
        assert_eq!(reset.requests, 0);
        assert_eq!(reset.completed, 0);
    }
}
