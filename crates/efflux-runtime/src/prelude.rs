//! Efflux Runtime Prelude: convenient imports for common usage.
//!
//! ```rust
//! use efflux_runtime::prelude::*;
//! ```

pub use crate::material_pool::{MaterialPool, MaterialSnapshot};
pub use crate::split_pool::SplitPool;
