// File: testing-framework/src/environment/topology.rs
//
// Peer-list policies. A topology only decides which identities go into each
// node's `peers`; the environment itself never looks at the graph.

use super::config::{NodeConfig, NodeIdentity};
use crate::error::{Result, TestError};

/// How peer lists are built for a sequence of nodes started in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Every node peers with the node started right before it
    Chain,
    /// Every node peers with all nodes started before it
    FullMeshIncremental,
    /// No node gets any peer
    Isolated,
}

impl Topology {
    /// Peers of the node at `index` in start order
    pub fn peers_for(&self, identities: &[NodeIdentity], index: usize) -> Vec<NodeIdentity> {
        let index = index.min(identities.len());
        match self {
            Topology::Chain => index
                .checked_sub(1)
                .map(|prev| vec![identities[prev].clone()])
                .unwrap_or_default(),
            Topology::FullMeshIncremental => identities[..index].to_vec(),
            Topology::Isolated => Vec::new(),
        }
    }

    /// Build one configuration per identity, in start order
    pub fn build(&self, identities: &[NodeIdentity], template: &NodeConfig) -> Vec<NodeConfig> {
        identities
            .iter()
            .enumerate()
            .map(|(i, identity)| {
                let mut config = template.clone();
                config.identity = identity.clone();
                config.peers = self.peers_for(identities, i);
                config
            })
            .collect()
    }
}

/// Chain policy: node `i` peers with node `i - 1`
pub fn chain(identities: &[NodeIdentity], template: &NodeConfig) -> Vec<NodeConfig> {
    Topology::Chain.build(identities, template)
}

/// Full-mesh-incremental policy: node `i` peers with nodes `0..i`
pub fn full_mesh_incremental(
    identities: &[NodeIdentity],
    template: &NodeConfig,
) -> Vec<NodeConfig> {
    Topology::FullMeshIncremental.build(identities, template)
}

/// Identities on consecutive ports, each with an HTTP and a legacy RPC port
///
/// Fails with `InvalidArguments` when a port would leave the `u16` range.
pub fn sequential_identities(
    count: usize,
    first_sync_port: u16,
    first_rpc_port: u16,
    first_http_port: u16,
) -> Result<Vec<NodeIdentity>> {
    let out_of_range = || {
        TestError::InvalidArguments(format!(
            "{} nodes do not fit in the port range starting at {}/{}/{}",
            count, first_sync_port, first_rpc_port, first_http_port
        ))
    };
    let count = u16::try_from(count).map_err(|_| out_of_range())?;

    (0..count)
        .map(|i| -> Result<NodeIdentity> {
            let port = |first: u16| first.checked_add(i).ok_or_else(out_of_range);
            Ok(NodeIdentity::new(port(first_sync_port)?)
                .with_rpc_port(port(first_rpc_port)?)
                .with_http_port(port(first_http_port)?))
        })
        .collect()
}
