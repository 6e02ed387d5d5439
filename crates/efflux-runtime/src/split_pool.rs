//! Single-owner arbiter around one blob.
//!
//! A [`SplitPool`] is a handle to an owner task that holds the only copy of
//! the pool's blob. Every mutation travels through one bounded command
//! queue, so merges, splits and snapshots are totally ordered and each
//! caller's commands are seen in the order it issued them.
//!
//! A `get` never drains the pool: the owner splits whatever it holds at
//! that instant and hands the larger half to the caller. Shares that are
//! not consumed must be merged back with `put`.

use efflux_core::blob::Blob;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, error, warn};

enum Command<B> {
    Put(B),
    Want(oneshot::Sender<B>),
    Check(oneshot::Sender<B>),
}

/// Handle to a running split pool. Clones share the same owner task.
#[derive(Clone)]
pub struct SplitPool<B: Blob> {
    name: &'static str,
    commands: mpsc::Sender<Command<B>>,
    timeout: Duration,
}

impl<B: Blob> SplitPool<B> {
    /// Spawn the owner task on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in log records
    /// * `seed` - Initial contents of the pool
    /// * `capacity` - Size of the command queue
    /// * `timeout` - Upper bound for any single `get` or `check`
    /// * `shutdown` - Flipping this to `true` cancels the pool
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. The owner task itself
    /// panics when it observes cancellation: a pool has no degraded mode.
    pub fn spawn(
        name: &'static str,
        seed: B,
        capacity: usize,
        timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (commands, queue) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_owner(name, seed, queue, shutdown));
        Self {
            name,
            commands,
            timeout,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take a share of the pool, bounded by the pool's own timeout.
    pub async fn get(&self) -> B {
        self.get_until(Instant::now() + self.timeout).await
    }

    /// Take a share of the pool before `deadline`.
    ///
    /// Both the "want" signal and the reply share one deadline. A zero blob
    /// comes back when either phase misses it, which callers cannot tell
    /// apart from an empty pool.
    pub async fn get_until(&self, deadline: Instant) -> B {
        let now = Instant::now();
        if now >= deadline {
            debug!(pool = self.name, "get with an expired deadline");
            return B::default();
        }
        let deadline = deadline.min(now + self.timeout);
        let (reply, mut share) = oneshot::channel();

        match timeout_at(deadline, self.commands.send(Command::Want(reply))).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                warn!(pool = self.name, "get on a closed pool");
                return B::default();
            }
            Err(_) => {
                debug!(pool = self.name, "want queue stayed full until the deadline");
                return B::default();
            }
        }

        match timeout_at(deadline, &mut share).await {
            Ok(Ok(share)) if Instant::now() < deadline => share,
            Ok(Ok(late)) => {
                self.restore(late);
                debug!(pool = self.name, "share arrived after the deadline");
                B::default()
            }
            Ok(Err(_)) => B::default(),
            Err(_) => {
                share.close();
                if let Ok(late) = share.try_recv() {
                    self.restore(late);
                }
                debug!(pool = self.name, "share arrived after the deadline");
                B::default()
            }
        }
    }

    /// Merge a blob into the pool. Empty blobs are skipped.
    pub async fn put(&self, blob: B) {
        if blob.is_empty() {
            return;
        }
        if self.commands.send(Command::Put(blob)).await.is_err() {
            warn!(pool = self.name, "put on a closed pool");
        }
    }

    /// Snapshot of the pool's current contents.
    pub async fn check(&self) -> B {
        let (reply, snapshot) = oneshot::channel();
        let deadline = Instant::now() + self.timeout;
        if !matches!(
            timeout_at(deadline, self.commands.send(Command::Check(reply))).await,
            Ok(Ok(()))
        ) {
            return B::default();
        }
        match timeout_at(deadline, snapshot).await {
            Ok(Ok(blob)) => blob,
            _ => B::default(),
        }
    }

    /// Merge a late share back without waiting for queue space.
    fn restore(&self, blob: B) {
        if let Err(TrySendError::Full(command)) = self.commands.try_send(Command::Put(blob)) {
            let commands = self.commands.clone();
            tokio::spawn(async move {
                let _ = commands.send(command).await;
            });
        }
    }
}

async fn run_owner<B: Blob>(
    name: &'static str,
    mut blob: B,
    mut queue: mpsc::Receiver<Command<B>>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(pool = name, "split pool started with {:?}", blob);
    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    debug!(pool = name, "shutdown handle dropped, split pool stopping");
                    return;
                }
                let cancelled = *shutdown.borrow();
                if cancelled {
                    error!(pool = name, "split pool cancelled holding {:?}", blob);
                    panic!("{} pool cancelled", name);
                }
            }
            command = queue.recv() => match command {
                Some(Command::Put(other)) => blob.add(&other),
                Some(Command::Want(reply)) => {
                    let share = blob.split();
                    if let Err(share) = reply.send(share) {
                        blob.add(&share);
                    }
                }
                Some(Command::Check(reply)) => {
                    let _ = reply.send(blob.clone());
                }
                None => {
                    debug!(pool = name, "all handles dropped, split pool stopping");
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efflux_core::blob::{ResourceBlob, WasteBlob};

    fn resources(o2: u64) -> ResourceBlob {
        ResourceBlob {
            o2,
            ..Default::default()
        }
    }

    fn spawn_pool(seed: ResourceBlob) -> (SplitPool<ResourceBlob>, watch::Sender<bool>) {
        let (cancel, shutdown) = watch::channel(false);
        let pool = SplitPool::spawn("resource", seed, 8, Duration::from_millis(500), shutdown);
        (pool, cancel)
    }

    #[tokio::test]
    async fn sequential_gets_take_half_each_time() {
        let (pool, _cancel) = spawn_pool(resources(1024));
        let mut taken = 0;
        for expected in [512, 256, 128, 64] {
            let share = pool.get().await;
            assert_eq!(share.o2, expected);
            taken += share.o2;
        }
        let rest = pool.check().await;
        assert_eq!(rest.o2, 64);
        assert_eq!(taken + rest.o2, 1024);
    }

    #[tokio::test]
    async fn odd_amounts_round_towards_the_caller() {
        let (pool, _cancel) = spawn_pool(resources(7));
        assert_eq!(pool.get().await.o2, 4);
        assert_eq!(pool.get().await.o2, 2);
        assert_eq!(pool.get().await.o2, 0);
        assert_eq!(pool.check().await.o2, 1);
    }

    #[tokio::test]
    async fn puts_are_seen_before_later_checks() {
        let (pool, _cancel) = spawn_pool(ResourceBlob::default());
        pool.put(resources(3)).await;
        pool.put(resources(4)).await;
        assert_eq!(pool.check().await.o2, 7);
    }

    #[tokio::test]
    async fn check_does_not_mutate() {
        let (pool, _cancel) = spawn_pool(resources(10));
        assert_eq!(pool.check().await, pool.check().await);
        assert_eq!(pool.get().await.o2, 5);
    }

    #[tokio::test]
    async fn expired_deadline_yields_zero_and_keeps_the_share() {
        let (pool, _cancel) = spawn_pool(resources(100));
        let share = pool.get_until(Instant::now()).await;
        assert!(share.is_empty());
        assert_eq!(pool.check().await.o2, 100);
    }

    #[tokio::test]
    async fn past_deadline_never_reaches_the_owner() {
        let (pool, _cancel) = spawn_pool(resources(64));
        let past = Instant::now() - Duration::from_millis(10);
        for _ in 0..3 {
            assert!(pool.get_until(past).await.is_empty());
        }
        assert_eq!(pool.check().await.o2, 64);
        assert_eq!(pool.get().await.o2, 32);
    }

    #[tokio::test]
    async fn concurrent_gets_conserve_the_total() {
        let (cancel, shutdown) = watch::channel(false);
        let pool = SplitPool::spawn(
            "waste",
            WasteBlob {
                co2: 4096,
                creatinine: 99,
            },
            4,
            Duration::from_millis(500),
            shutdown,
        );

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.get().await }));
        }
        let mut taken = WasteBlob::default();
        for handle in handles {
            taken.add(&handle.await.unwrap());
        }
        let rest = pool.check().await;
        assert_eq!(taken.co2 + rest.co2, 4096);
        assert_eq!(taken.creatinine + rest.creatinine, 99);
        drop(cancel);
    }

    #[tokio::test]
    async fn cancelled_pool_hands_out_nothing() {
        let (pool, cancel) = spawn_pool(resources(100));
        assert_eq!(pool.check().await.o2, 100);
        cancel.send_replace(true);
        tokio::task::yield_now().await;
        assert!(pool.get().await.is_empty());
        assert!(pool.check().await.is_empty());
    }
}
