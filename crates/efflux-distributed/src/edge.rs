//! Outbound edges to neighbouring organs.

use crate::wire::{EdgeTransport, WorkEnvelope};
use efflux_core::types::EdgeType;
use futures::stream::SplitSink;
use futures::SinkExt;
use std::net::SocketAddr;
use tokio::sync::Mutex;

/// The sending half of a connection to one neighbour.
///
/// Responses on the same connection are read by the owning organ's
/// response listener.
pub struct Edge {
    edge_type: EdgeType,
    peer: SocketAddr,
    sink: Mutex<SplitSink<EdgeTransport, WorkEnvelope>>,
}

impl Edge {
    pub(crate) fn new(
        edge_type: EdgeType,
        peer: SocketAddr,
        sink: SplitSink<EdgeTransport, WorkEnvelope>,
    ) -> Self {
        Self {
            edge_type,
            peer,
            sink: Mutex::new(sink),
        }
    }

    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send one envelope. Concurrent senders are serialized.
    pub async fn send(&self, envelope: WorkEnvelope) -> std::io::Result<()> {
        self.sink.lock().await.send(envelope).await
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("edge_type", &self.edge_type)
            .field("peer", &self.peer)
            .finish()
    }
}
