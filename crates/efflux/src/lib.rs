//! # Efflux
//!
//! A simulated organism built from organ nodes that exchange work and
//! materials over TCP edges.
//!
//! Each organ holds a pool of materials and the cells living in it. When
//! an organ needs work done it floods the request to its neighbours and to
//! its own idle cells; the first answer wins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use efflux::prelude::*;
//!
//! let heart = Organ::initialize("heart", EffluxConfig::default()).await?;
//! let lungs = Organ::initialize("lungs", EffluxConfig::default()).await?;
//! connect_nodes(&heart, &lungs, EdgeType::Cardiovascular, EdgeType::Cardiovascular).await?;
//!
//! lungs.add_worker(alveolus.clone()).await;
//! lungs.make_available(alveolus);
//!
//! let result = heart.request_work(Work::request(WorkType::EXHALE)).await;
//! assert!(result.is_success());
//! ```
//!
//! ## Materials
//!
//! Materials are split rather than counted out: every take hands over
//! half of what the pool holds.
//!
//! ```rust
//! use efflux::prelude::*;
//!
//! let mut pool = ResourceBlob { o2: 7, glucose: 1, vitamins: 0 };
//! let share = pool.split();
//! assert_eq!(share.o2, 4);
//! assert_eq!(pool.o2, 3);
//! assert_eq!(pool.glucose, 1);
//! ```
//!
//! ## Architecture
//!
//! - [`efflux_core`] - Work records, blobs, configuration
//! - [`efflux_runtime`] - Split pools and the per-organ material pool
//! - [`efflux_distributed`] - Organs, edges, managers and the dispatch protocol

pub use efflux_core as core;
pub use efflux_runtime as runtime;

#[cfg(feature = "distributed")]
pub use efflux_distributed as distributed;

/// Prelude module for convenient imports.
///
/// ```rust
/// use efflux::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use efflux_core::blob::{
        Blob, HormoneBlob, LigandBlob, ResourceBlob, WasteBlob, LIGAND_INFLAMMATION_MAX,
    };
    pub use efflux_core::types::{
        EdgeType, Work, WorkType, STATUS_OK, STATUS_PENDING, STATUS_UNAVAILABLE,
    };

    // Configuration
    pub use efflux_core::config::{DispatchConfig, EffluxConfig, PoolConfig, TimingConfig};

    // Error types
    pub use efflux_core::error::CoreError;

    // Runtime
    pub use efflux_runtime::material_pool::{MaterialPool, MaterialSnapshot};
    pub use efflux_runtime::split_pool::SplitPool;

    // Organs and dispatch (requires "distributed" feature)
    #[cfg(feature = "distributed")]
    pub use efflux_distributed::{
        connect_nodes, DistributedError, DistributedResult, Graph, NodeStatus, Organ, WorkStatus,
        Worker, WorkerRef,
    };
}
