//! # Efflux Runtime
//!
//! The concurrent half of an organ's material exchange.
//!
//! Every organ owns one [`MaterialPool`](material_pool::MaterialPool): four
//! single-owner split pools, one per blob kind. Callers never touch a blob
//! held by a pool; they send commands to its owner task and receive copies.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use efflux_core::prelude::*;
//! use efflux_runtime::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let materials = MaterialPool::initialize(&EffluxConfig::default());
//!
//!     let mut need = ResourceBlob { o2: 20, glucose: 5, vitamins: 0 };
//!     let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(500);
//!     if materials.collect_resources(&mut need, deadline).await {
//!         materials.put_waste(WasteBlob { co2: 20, creatinine: 0 }).await;
//!     }
//! }
//! ```

pub mod material_pool;
pub mod prelude;
pub mod split_pool;
