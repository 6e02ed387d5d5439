//! Wire format and transport of organ edges.
//!
//! Each edge is one persistent TCP connection framed with
//! `tarpc::serde_transport` and bincode. The connection is used as a raw
//! stream of [`WorkEnvelope`]s in both directions: the dialing organ sends
//! requests and reads responses, the accepting organ does the opposite.
//! There is no request id; responses are matched by work type.

use efflux_core::blob::{HormoneBlob, ResourceBlob, WasteBlob};
use efflux_core::types::{Work, WorkType, STATUS_PENDING};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tarpc::serde_transport::{tcp, Transport};
use tokio::net::TcpStream;
use tokio_serde::formats::Bincode;

/// Materials carried by a diffusion envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diffusion {
    pub resources: ResourceBlob,
    pub waste: WasteBlob,
    pub hormones: HormoneBlob,
}

/// One message on an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEnvelope {
    pub work_type: u32,
    pub result: String,
    pub status: u16,
    /// Present only on envelopes of type [`WorkType::DIFFUSION`].
    pub diffusion: Option<Diffusion>,
}

impl WorkEnvelope {
    /// A pending diffusion envelope carrying `payload`.
    pub fn diffusion(payload: Diffusion) -> Self {
        Self {
            work_type: WorkType::DIFFUSION.as_u32(),
            result: String::new(),
            status: STATUS_PENDING,
            diffusion: Some(payload),
        }
    }

    pub fn work_type(&self) -> WorkType {
        WorkType(self.work_type)
    }

    pub fn is_diffusion(&self) -> bool {
        self.work_type() == WorkType::DIFFUSION
    }
}

impl From<Work> for WorkEnvelope {
    fn from(work: Work) -> Self {
        Self {
            work_type: work.work_type().as_u32(),
            status: work.status(),
            result: work.result().to_string(),
            diffusion: None,
        }
    }
}

impl From<WorkEnvelope> for Work {
    fn from(envelope: WorkEnvelope) -> Self {
        Work::from_parts(WorkType(envelope.work_type), envelope.status, envelope.result)
    }
}

pub type EnvelopeCodec = Bincode<WorkEnvelope, WorkEnvelope>;

/// A framed edge connection.
pub type EdgeTransport = Transport<TcpStream, WorkEnvelope, WorkEnvelope, EnvelopeCodec>;

/// Stream of inbound edge connections.
pub type EnvelopeListener =
    tcp::Incoming<WorkEnvelope, WorkEnvelope, EnvelopeCodec, fn() -> EnvelopeCodec>;

/// Listen for edges on `addr`. Port 0 lets the OS choose one; read it back
/// with [`tcp::Incoming::local_addr`].
pub async fn listen(addr: SocketAddr) -> std::io::Result<EnvelopeListener> {
    tcp::listen(addr, Bincode::default as fn() -> EnvelopeCodec).await
}

/// Dial the organ listening on `addr`.
pub async fn connect(addr: SocketAddr) -> std::io::Result<EdgeTransport> {
    tcp::connect(addr, Bincode::default).await
}
