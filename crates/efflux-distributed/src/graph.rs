//! Registry of all organs in one organism.

use crate::error::{DistributedError, DistributedResult};
use crate::organ::{connect_nodes, Organ};
use efflux_core::config::EffluxConfig;
use efflux_core::types::EdgeType;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Owns every organ of an organism, keyed by listening address.
pub struct Graph {
    config: EffluxConfig,
    nodes: HashMap<SocketAddr, Arc<Organ>>,
}

impl Graph {
    /// Create an empty graph whose organs share `config`.
    pub fn new(config: EffluxConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EffluxConfig {
        &self.config
    }

    /// Start a new organ and register it.
    pub async fn initialize_new_node(
        &mut self,
        name: impl Into<String>,
    ) -> DistributedResult<Arc<Organ>> {
        let organ = Organ::initialize(name, self.config.clone()).await?;
        self.nodes.insert(organ.address(), Arc::clone(&organ));
        Ok(organ)
    }

    /// Connect two registered organs in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`DistributedError::UnknownOrgan`] if either address is not
    /// registered, or the connection error of the failing direction.
    pub async fn connect_nodes(
        &self,
        a: SocketAddr,
        b: SocketAddr,
        a_to_b: EdgeType,
        b_to_a: EdgeType,
    ) -> DistributedResult<()> {
        let a = self.get(a).ok_or(DistributedError::UnknownOrgan(a))?;
        let b = self.get(b).ok_or(DistributedError::UnknownOrgan(b))?;
        connect_nodes(a, b, a_to_b, b_to_a).await
    }

    pub fn get(&self, address: SocketAddr) -> Option<&Arc<Organ>> {
        self.nodes.get(&address)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Organ>> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Shut down every organ.
    pub fn shutdown(&self) {
        for organ in self.nodes.values() {
            organ.shutdown();
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(EffluxConfig::default())
    }
}
