//! Status snapshots of an organ.

use efflux_core::types::WorkType;
use efflux_runtime::material_pool::MaterialSnapshot;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Dispatch counters of one work type since the previous status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStatus {
    pub work_type: WorkType,
    /// Requests this organ issued.
    pub requests: u64,
    /// Own requests answered with status 200.
    pub successes: u64,
    /// Own requests that failed or timed out.
    pub failures: u64,
    /// Work done here for a peer.
    pub completed: u64,
    /// Work done here for a peer that did not succeed.
    pub completed_failures: u64,
}

/// What an organ looks like from the outside at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    pub address: SocketAddr,
    /// Peer address of every outgoing edge.
    pub connections: Vec<SocketAddr>,
    pub work: Vec<WorkStatus>,
    pub materials: MaterialSnapshot,
}

impl NodeStatus {
    pub fn work_status(&self, work_type: WorkType) -> Option<&WorkStatus> {
        self.work.iter().find(|status| status.work_type == work_type)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
