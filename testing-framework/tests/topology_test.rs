// Peer lists produced by the topology policies

use lk_testing_framework::{
    environment::{
        topology::{chain, full_mesh_incremental, sequential_identities},
        NodeConfig, NodeIdentity, Topology,
    },
    TestError,
};

fn nodes(count: usize) -> Vec<NodeIdentity> {
    sequential_identities(count, 20302, 50152, 50252).unwrap()
}

#[test]
fn test_chain_peers_with_previous_node_only() {
    let identities = nodes(5);
    let configs = chain(&identities, &NodeConfig::new(identities[0].clone()));

    assert_eq!(configs.len(), 5);
    assert!(configs[0].peers.is_empty());
    for i in 1..configs.len() {
        assert_eq!(configs[i].identity, identities[i]);
        assert_eq!(configs[i].peers, vec![identities[i - 1].clone()]);
    }
}

#[test]
fn test_full_mesh_incremental_peers_with_all_previous_nodes() {
    let identities = nodes(4);
    let configs = full_mesh_incremental(&identities, &NodeConfig::new(identities[0].clone()));

    for (i, config) in configs.iter().enumerate() {
        assert_eq!(config.peers, identities[..i].to_vec());
    }
}

#[test]
fn test_template_settings_are_kept() {
    let identities = nodes(3);
    let template = NodeConfig::new(identities[0].clone())
        .with_mining_threads(4)
        .with_database("db", false);

    for config in Topology::FullMeshIncremental.build(&identities, &template) {
        assert_eq!(config.mining_threads, 4);
        assert_eq!(config.database_path, "db");
        assert!(!config.clean_database);
    }
}

#[test]
fn test_isolated_and_out_of_range() {
    let identities = nodes(3);
    assert!(Topology::Isolated.peers_for(&identities, 2).is_empty());
    assert_eq!(Topology::FullMeshIncremental.peers_for(&identities, 10), identities);
    assert!(Topology::Chain.peers_for(&[], 0).is_empty());
}

#[test]
fn test_peer_addresses_in_file_config() {
    let identities = nodes(3);
    let configs = full_mesh_incremental(&identities, &NodeConfig::new(identities[0].clone()));

    let file = configs[2].to_file_config();
    assert_eq!(file.nodes, vec!["127.0.0.1:20302", "127.0.0.1:20303"]);
    assert_eq!(file.net.listen_addr, "0.0.0.0:20304");
}

#[test]
fn test_sequential_identities_ports() {
    let identities = nodes(2);
    assert_eq!(identities[1].sync_port(), 20303);
    assert_eq!(identities[1].connect_rpc_address().unwrap(), "127.0.0.1:50153");
    assert_eq!(identities[1].connect_http_address().unwrap(), "127.0.0.1:50253");
}

#[test]
fn test_sequential_identities_stay_in_port_range() {
    let identities = sequential_identities(2, 20302, 50152, u16::MAX - 1).unwrap();
    assert_eq!(identities[1].connect_http_address().unwrap(), format!("127.0.0.1:{}", u16::MAX));

    assert!(matches!(
        sequential_identities(3, 20302, 50152, u16::MAX - 1),
        Err(TestError::InvalidArguments(_))
    ));
    assert!(matches!(
        sequential_identities(usize::from(u16::MAX) + 2, 0, 0, 0),
        Err(TestError::InvalidArguments(_))
    ));
    assert!(sequential_identities(0, u16::MAX, u16::MAX, u16::MAX).unwrap().is_empty());
}
