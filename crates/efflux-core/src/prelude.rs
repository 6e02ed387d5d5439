//! Convenience re-exports for the common Efflux value types.

pub use crate::blob::{
    Blob, HormoneBlob, LigandBlob, ResourceBlob, WasteBlob, LIGAND_INFLAMMATION_MAX,
};
pub use crate::config::{DispatchConfig, EffluxConfig, PoolConfig, TimingConfig};
pub use crate::error::CoreError;
pub use crate::types::{EdgeType, Work, WorkType, STATUS_OK, STATUS_PENDING, STATUS_UNAVAILABLE};
