//! Efflux Distributed Prelude: convenient imports for common usage.
//!
//! ```rust
//! use efflux_distributed::prelude::*;
//! ```

pub use crate::error::{DistributedError, DistributedResult};
pub use crate::graph::Graph;
pub use crate::organ::{connect_nodes, Organ};
pub use crate::status::{NodeStatus, WorkStatus};
pub use crate::worker::{Worker, WorkerRef};

pub use efflux_core::prelude::*;
pub use efflux_runtime::prelude::*;
