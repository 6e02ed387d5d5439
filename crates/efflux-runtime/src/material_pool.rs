//! The material pool of one organ.
//!
//! Four [`SplitPool`]s (resources, waste, ligands and hormones) behind one
//! cloneable facade. Cells draw from it, organs diffuse parts of it to their
//! neighbours, and a single cancel signal stops all four owners.

use crate::split_pool::SplitPool;
use efflux_core::blob::{Blob, HormoneBlob, LigandBlob, ResourceBlob, WasteBlob};
use efflux_core::config::EffluxConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Pause between two fruitless collection rounds.
const COLLECT_BACKOFF: Duration = Duration::from_millis(1);

/// Point-in-time contents of all four pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSnapshot {
    pub resources: ResourceBlob,
    pub waste: WasteBlob,
    pub ligands: LigandBlob,
    pub hormones: HormoneBlob,
}

#[derive(Clone)]
pub struct MaterialPool {
    resources: SplitPool<ResourceBlob>,
    waste: SplitPool<WasteBlob>,
    ligands: SplitPool<LigandBlob>,
    hormones: SplitPool<HormoneBlob>,
    cancel: Arc<watch::Sender<bool>>,
}

impl MaterialPool {
    /// Start a pool seeded from `config.pool`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(config: &EffluxConfig) -> Self {
        Self::with_seeds(
            config,
            config.pool.seed_resources(),
            config.pool.seed_waste(),
            config.pool.seed_ligands(),
            config.pool.seed_hormones(),
        )
    }

    /// Start a pool with explicit initial contents.
    pub fn with_seeds(
        config: &EffluxConfig,
        resources: ResourceBlob,
        waste: WasteBlob,
        ligands: LigandBlob,
        hormones: HormoneBlob,
    ) -> Self {
        let (cancel, shutdown) = watch::channel(false);
        let capacity = config.pool.queue_capacity;
        let timeout = config.timing.request_timeout();
        Self {
            resources: SplitPool::spawn("resource", resources, capacity, timeout, shutdown.clone()),
            waste: SplitPool::spawn("waste", waste, capacity, timeout, shutdown.clone()),
            ligands: SplitPool::spawn("ligand", ligands, capacity, timeout, shutdown.clone()),
            hormones: SplitPool::spawn("hormone", hormones, capacity, timeout, shutdown),
            cancel: Arc::new(cancel),
        }
    }

    pub async fn get_resource(&self) -> ResourceBlob {
        self.resources.get().await
    }

    pub async fn get_resource_until(&self, deadline: Instant) -> ResourceBlob {
        self.resources.get_until(deadline).await
    }

    pub async fn put_resource(&self, blob: ResourceBlob) {
        self.resources.put(blob).await
    }

    pub async fn check_resource(&self) -> ResourceBlob {
        self.resources.check().await
    }

    pub async fn get_waste(&self) -> WasteBlob {
        self.waste.get().await
    }

    pub async fn get_waste_until(&self, deadline: Instant) -> WasteBlob {
        self.waste.get_until(deadline).await
    }

    pub async fn put_waste(&self, blob: WasteBlob) {
        self.waste.put(blob).await
    }

    pub async fn check_waste(&self) -> WasteBlob {
        self.waste.check().await
    }

    pub async fn get_ligand(&self) -> LigandBlob {
        self.ligands.get().await
    }

    pub async fn get_ligand_until(&self, deadline: Instant) -> LigandBlob {
        self.ligands.get_until(deadline).await
    }

    pub async fn put_ligand(&self, blob: LigandBlob) {
        self.ligands.put(blob).await
    }

    pub async fn check_ligand(&self) -> LigandBlob {
        self.ligands.check().await
    }

    pub async fn get_hormone(&self) -> HormoneBlob {
        self.hormones.get().await
    }

    pub async fn get_hormone_until(&self, deadline: Instant) -> HormoneBlob {
        self.hormones.get_until(deadline).await
    }

    pub async fn put_hormone(&self, blob: HormoneBlob) {
        self.hormones.put(blob).await
    }

    pub async fn check_hormone(&self) -> HormoneBlob {
        self.hormones.check().await
    }

    /// Carve off a quarter of the resource pool for a neighbour.
    ///
    /// Takes a share, hands half of it straight back and returns the rest.
    pub async fn split_resource(&self) -> ResourceBlob {
        split_off(&self.resources).await
    }

    pub async fn split_waste(&self) -> WasteBlob {
        split_off(&self.waste).await
    }

    pub async fn split_hormone(&self) -> HormoneBlob {
        split_off(&self.hormones).await
    }

    /// Draw resources until `need` is satisfied or `deadline` passes.
    ///
    /// Each round takes a share, consumes from it and puts the remainder
    /// back. `need` is reduced in place; on `false` it holds whatever could
    /// not be collected in time.
    pub async fn collect_resources(&self, need: &mut ResourceBlob, deadline: Instant) -> bool {
        while !need.is_empty() {
            if Instant::now() >= deadline {
                debug!(missing = ?need, "resource collection ran out of time");
                return false;
            }
            let before = need.total();
            let mut share = self.resources.get_until(deadline).await;
            share.consume(need);
            self.resources.put(share).await;
            if need.total() == before {
                sleep_until((Instant::now() + COLLECT_BACKOFF).min(deadline)).await;
            }
        }
        true
    }

    /// Snapshot every pool.
    pub async fn snapshot(&self) -> MaterialSnapshot {
        MaterialSnapshot {
            resources: self.resources.check().await,
            waste: self.waste.check().await,
            ligands: self.ligands.check().await,
            hormones: self.hormones.check().await,
        }
    }

    /// Cancel all four pool owners.
    ///
    /// Pools have no degraded mode: each owner task aborts, and every later
    /// `get` or `check` returns a zero blob.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

async fn split_off<B: Blob>(pool: &SplitPool<B>) -> B {
    let mut share = pool.get().await;
    let back = share.split();
    pool.put(back).await;
    share
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(resources: ResourceBlob) -> MaterialPool {
        MaterialPool::with_seeds(
            &EffluxConfig::default(),
            resources,
            WasteBlob::default(),
            LigandBlob::default(),
            HormoneBlob::default(),
        )
    }

    #[tokio::test]
    async fn test_initialize_seeds_from_config() {
        let materials = MaterialPool::initialize(&EffluxConfig::default());
        let snapshot = materials.snapshot().await;
        assert_eq!(snapshot.resources.o2, 10000);
        assert_eq!(snapshot.resources.glucose, 10000);
        assert_eq!(snapshot.resources.vitamins, 10000);
        assert_eq!(snapshot.ligands.growth, 100);
        assert!(snapshot.waste.is_empty());
        assert!(snapshot.hormones.is_empty());
    }

    #[tokio::test]
    async fn test_pools_are_independent() {
        let materials = pool_with(ResourceBlob::default());
        materials
            .put_waste(WasteBlob {
                co2: 8,
                creatinine: 0,
            })
            .await;
        materials
            .put_ligand(LigandBlob {
                growth: 1,
                ..Default::default()
            })
            .await;
        assert_eq!(materials.get_waste().await.co2, 4);
        assert_eq!(materials.check_ligand().await.growth, 1);
        assert!(materials.check_resource().await.is_empty());
    }

    #[tokio::test]
    async fn test_collect_resources_satisfies_need() {
        let materials = pool_with(ResourceBlob {
            o2: 100,
            glucose: 40,
            vitamins: 0,
        });
        let mut need = ResourceBlob {
            o2: 70,
            glucose: 10,
            vitamins: 0,
        };
        let deadline = Instant::now() + Duration::from_millis(500);
        assert!(materials.collect_resources(&mut need, deadline).await);
        assert!(need.is_empty());

        let rest = materials.check_resource().await;
        assert_eq!(rest.o2, 30);
        assert_eq!(rest.glucose, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_resources_gives_up_at_deadline() {
        let materials = pool_with(ResourceBlob {
            o2: 100,
            glucose: 0,
            vitamins: 0,
        });
        let mut need = ResourceBlob {
            o2: 10,
            glucose: 0,
            vitamins: 5,
        };
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(!materials.collect_resources(&mut need, deadline).await);
        assert_eq!(need.o2, 0);
        assert_eq!(need.vitamins, 5);
        assert!(Instant::now() >= deadline);
        assert_eq!(materials.check_resource().await.o2, 90);
    }

    #[tokio::test]
    async fn test_split_resource_returns_a_quarter() {
        let materials = pool_with(ResourceBlob {
            o2: 100,
            glucose: 0,
            vitamins: 0,
        });
        let share = materials.split_resource().await;
        assert_eq!(share.o2, 25);
        assert_eq!(materials.check_resource().await.o2, 75);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let materials = pool_with(ResourceBlob {
            o2: 1,
            glucose: 2,
            vitamins: 3,
        });
        let snapshot = materials.snapshot().await;
        assert_eq!(snapshot.resources.total(), 6);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"glucose\":2"));
    }

    #[tokio::test]
    async fn test_cancel_stops_every_pool() {
        let materials = MaterialPool::initialize(&EffluxConfig::default());
        materials.cancel();
        tokio::task::yield_now().await;
        assert!(materials.get_resource().await.is_empty());
        assert!(materials.get_ligand().await.is_empty());
        assert_eq!(materials.snapshot().await, MaterialSnapshot::default());
    }
}
