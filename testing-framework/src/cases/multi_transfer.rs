// File: testing-framework/src/cases/multi_transfer.rs
//
// Transfers across larger networks. Every node started is checked from
// every client already connected, then balances are read from each node
// until the network agrees.

use std::sync::Arc;

use lk_common::{account::Keys, transaction::TransactionStatusCode};

use super::{converged_balance, generate_accounts, transfer_and_wait};
use crate::{
    client::BaseClient,
    environment::{
        topology::sequential_identities, Environment, NodeConfig, NodeIdentity, Topology,
    },
    orchestrator::run_bounded,
    test_check, test_check_equal,
};

const INIT_AMOUNT: u128 = 1000;
const RING_AMOUNT: u128 = 300;
const RING_ROUNDS: usize = 5;

/// Start `identities` one at a time with `topology`, checking every node after each start
async fn start_incrementally(
    env: &Environment,
    identities: &[NodeIdentity],
    topology: Topology,
) -> anyhow::Result<Vec<Arc<dyn BaseClient>>> {
    let template = NodeConfig::new(identities[0].clone());
    let mut clients: Vec<Arc<dyn BaseClient>> = Vec::with_capacity(identities.len());
    for config in topology.build(identities, &template) {
        let identity = config.identity.clone();
        env.start_node(config).await?;
        clients.push(env.client(&identity).await?);
        for client in &clients {
            test_check!(
                client.connection_test(client.profile().call).await?,
                "{} lost the network after {} started",
                client.name(),
                identity
            );
        }
    }
    env.logger().info("Init SUCCESS");
    Ok(clients)
}

/// Fund every account from the distributor through `client`, checking all nodes see it
async fn fund_accounts(
    env: &Environment,
    client: &dyn BaseClient,
    nodes: &[Arc<dyn BaseClient>],
    accounts: &[Keys],
) -> anyhow::Result<()> {
    let distributor = env.distributor_keys(client).await?;
    for account in accounts {
        test_check_equal!(
            client.get_balance(&account.address, client.profile().call).await?,
            0
        );
        let status =
            transfer_and_wait(env, client, &distributor, &account.address, INIT_AMOUNT, 0).await?;
        test_check_equal!(status.status_code, TransactionStatusCode::Success);
        for node in nodes {
            let balance = converged_balance(env, node.as_ref(), &account.address, INIT_AMOUNT).await?;
            test_check_equal!(balance, INIT_AMOUNT, "on {}", node.name());
        }
    }
    Ok(())
}

/// Chained transfers `accounts[i] -> accounts[i + 1]` of `i * 100`
async fn chained_transfers(
    env: &Environment,
    topology: Topology,
    first_sync_port: u16,
    first_rpc_port: u16,
) -> anyhow::Result<()> {
    let first_http_port = first_rpc_port
        .checked_add(100)
        .ok_or_else(|| anyhow::anyhow!("no HTTP port above RPC port {}", first_rpc_port))?;
    let identities = sequential_identities(10, first_sync_port, first_rpc_port, first_http_port)?;
    let nodes = start_incrementally(env, &identities, topology).await?;
    let Some(last) = nodes.last() else {
        return Ok(());
    };

    let accounts = generate_accounts(env, last.as_ref(), nodes.len() - 1).await?;
    fund_accounts(env, last.as_ref(), &nodes, &accounts).await?;

    for i in 1..accounts.len() - 1 {
        let (from, to) = (&accounts[i], &accounts[i + 1]);
        let amount = i as u128 * 100;
        let status = transfer_and_wait(env, last.as_ref(), from, &to.address, amount, 0).await?;
        test_check_equal!(status.status_code, TransactionStatusCode::Success);

        for node in &nodes {
            let balance = converged_balance(env, node.as_ref(), &to.address, INIT_AMOUNT + amount).await?;
            test_check_equal!(balance, INIT_AMOUNT + amount, "on {}", node.name());
        }
    }

    // The first account never takes part in the chain
    for node in &nodes {
        let balance = converged_balance(env, node.as_ref(), &accounts[0].address, INIT_AMOUNT).await?;
        test_check_equal!(balance, INIT_AMOUNT, "on {}", node.name());
    }
    Ok(())
}

pub(crate) async fn connected_with_everything(env: Environment) -> anyhow::Result<()> {
    chained_transfers(&env, Topology::FullMeshIncremental, 20302, 50152).await
}

pub(crate) async fn connected_one_by_one(env: Environment) -> anyhow::Result<()> {
    chained_transfers(&env, Topology::Chain, 20310, 50160).await
}

/// Pass `RING_AMOUNT` around `accounts` through `client`, last to first
async fn ring_transfers(
    env: &Environment,
    client: &dyn BaseClient,
    accounts: &[Keys],
) -> anyhow::Result<()> {
    let shift = accounts.len() - 1;
    let mut position = 0;
    for _ in 0..accounts.len() * RING_ROUNDS {
        let from = &accounts[position];
        position = (position + shift) % accounts.len();
        let to = &accounts[position];
        let status = transfer_and_wait(env, client, from, &to.address, RING_AMOUNT, 0).await?;
        test_check_equal!(
            status.status_code,
            TransactionStatusCode::Success,
            "{} -> {} through {}",
            from.address,
            to.address,
            client.name()
        );
    }
    Ok(())
}

/// Seven nodes, each driving a ring of three accounts concurrently
pub(crate) async fn parallel_connected_with_everything(env: Environment) -> anyhow::Result<()> {
    const NODES: usize = 7;
    const ACCOUNTS_PER_NODE: usize = 3;

    let identities = sequential_identities(NODES, 20330, 50180, 50280)?;
    let nodes = start_incrementally(&env, &identities, Topology::FullMeshIncremental).await?;
    let Some(last) = nodes.last() else {
        return Ok(());
    };

    let accounts = generate_accounts(&env, last.as_ref(), NODES * ACCOUNTS_PER_NODE).await?;
    fund_accounts(&env, last.as_ref(), &nodes, &accounts).await?;

    let rings: Vec<_> = nodes.iter().zip(accounts.chunks(ACCOUNTS_PER_NODE)).collect();
    let shared = &env;
    let rings = &rings;
    // Indices keep references out of the closure arguments so the case future stays `Send`
    let results = run_bounded(0..rings.len(), env.settings().pool_size, |i| async move {
        let (client, ring) = rings[i];
        ring_transfers(shared, client.as_ref(), ring).await
    })
    .await;
    for result in results {
        result?;
    }

    // A full ring returns every account to where it started
    for node in &nodes {
        for account in &accounts {
            let balance = converged_balance(&env, node.as_ref(), &account.address, INIT_AMOUNT).await?;
            test_check_equal!(balance, INIT_AMOUNT, "{} on {}", account.address, node.name());
        }
    }
    Ok(())
}
