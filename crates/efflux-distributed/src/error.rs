//! Errors raised by organs and their edges.
//!
//! Work that cannot be done is never an error here: it comes back as a
//! [`Work`](efflux_core::types::Work) with status 503. These variants cover
//! bootstrap failures and a broken dispatch protocol.

use efflux_core::error::CoreError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributedError {
    #[error("Failed to bind organ listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to organ at {peer}: {source}")]
    Connect {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Organ {0} not found")]
    UnknownOrgan(SocketAddr),

    #[error("Invalid configuration: {0}")]
    Config(#[from] CoreError),
}

/// Result type for distributed operations.
pub type DistributedResult<T> = Result<T, DistributedError>;
