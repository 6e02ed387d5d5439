//! # Efflux Distributed
//!
//! Organ nodes connected by edges, and the protocol that moves work and
//! materials between them.
//!
//! - [`organ`]: the node, its workers, and flooding dispatch
//! - [`manager`]: per-work-type hand-off of idle workers and result buffer
//! - [`worker`]: the contract cells implement
//! - [`wire`] / [`edge`]: bincode-framed TCP edges
//! - [`graph`]: the registry of every organ in an organism
//! - [`status`]: counters and material snapshots for observers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use efflux_distributed::prelude::*;
//!
//! let mut graph = Graph::new(EffluxConfig::default());
//! let heart = graph.initialize_new_node("heart").await?;
//! let lungs = graph.initialize_new_node("lungs").await?;
//! graph
//!     .connect_nodes(
//!         heart.address(),
//!         lungs.address(),
//!         EdgeType::Cardiovascular,
//!         EdgeType::Cardiovascular,
//!     )
//!     .await?;
//!
//! let result = heart.request_work(Work::request(WorkType::EXHALE)).await;
//! ```

pub mod edge;
pub mod error;
pub mod graph;
pub mod manager;
pub mod organ;
pub mod prelude;
pub mod status;
pub mod wire;
pub mod worker;

pub use error::{DistributedError, DistributedResult};
pub use graph::Graph;
pub use organ::{connect_nodes, Organ};
pub use status::{NodeStatus, WorkStatus};
pub use worker::{Worker, WorkerRef};
