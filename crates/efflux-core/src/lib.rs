//! # Efflux Core
//!
//! Core value types shared by every Efflux crate. Nothing in here spawns a
//! task or touches the network; the runtime and distributed crates build
//! their concurrency on top of these plain records:
//!
//! - **Blobs**: resource, waste, ligand and hormone quantities with merge
//!   (`add`), fair halving (`split`) and clamped `consume`
//! - **Work**: the request/response envelope exchanged between organs
//! - **WorkType**: the tag a worker advertises and a request asks for
//! - **EdgeType**: the relationship an organ edge represents
//! - **Config**: timing, pool and dispatch settings, loadable from TOML
//!
//! ## Quick Start
//!
//! ```rust
//! use efflux_core::prelude::*;
//!
//! let mut pool = ResourceBlob { o2: 10, glucose: 7, vitamins: 1 };
//! let share = pool.split();
//! assert_eq!(share.o2 + pool.o2, 10);
//! assert_eq!(share.glucose, 4);
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;
