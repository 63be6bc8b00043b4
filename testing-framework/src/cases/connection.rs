// File: testing-framework/src/cases/connection.rs

use anyhow::Context;

use crate::{
    environment::{config::NodeFileConfig, Environment, NodeConfig, NodeIdentity},
    test_check, test_check_equal,
};

/// Node B peered to node A; both answer and B's config names only A
pub(crate) async fn two_nodes(env: Environment) -> anyhow::Result<()> {
    let first = NodeIdentity::new(20101)
        .with_rpc_port(50101)
        .with_http_port(50201);
    let second = NodeIdentity::new(20102)
        .with_rpc_port(50102)
        .with_http_port(50202);

    env.start_node(NodeConfig::new(first.clone())).await?;
    let handle = env
        .start_node(NodeConfig::new(second.clone()).with_peers(vec![first.clone()]))
        .await?;

    let first_client = env.client(&first).await?;
    let second_client = env.client(&second).await?;
    test_check!(first_client.connection_test(first_client.profile().call).await?);
    test_check!(second_client.connection_test(second_client.profile().call).await?);

    let content = std::fs::read_to_string(&handle.config_file)
        .with_context(|| format!("reading {}", handle.config_file.display()))?;
    let written: NodeFileConfig = serde_json::from_str(&content)?;
    test_check_equal!(written.nodes, vec![first.connect_sync_address()]);

    Ok(())
}

/// A node listing itself as a peer still serves clients
pub(crate) async fn connect_to_myself(env: Environment) -> anyhow::Result<()> {
    let identity = NodeIdentity::new(20103)
        .with_rpc_port(50103)
        .with_http_port(50203);
    env.start_node(NodeConfig::new(identity.clone()).with_peers(vec![identity.clone()]))
        .await?;

    let client = env.client(&identity).await?;
    test_check!(client.connection_test(client.profile().call).await?);
    Ok(())
}
