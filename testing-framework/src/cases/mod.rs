// File: testing-framework/src/cases/mod.rs
//
// Built-in multi-node scenarios and the helpers they share.

mod connection;
mod contract;
mod multi_transfer;
mod transfer;

use std::time::Duration;

use lk_common::{account::Keys, transaction::TransactionStatus, Address};

use crate::{
    client::BaseClient,
    environment::Environment,
    error::Result,
    registry::TestRegistry,
    tracker::TransactionTracker,
};

/// Balance reads made before a converging balance is reported as is
pub const BALANCE_POLL_BUDGET: usize = 10;

/// Register every built-in scenario, enabled
pub fn register_all(registry: &mut TestRegistry) -> Result<()> {
    registry.register_enabled("two_nodes", connection::two_nodes)?;
    registry.register_enabled("connect_to_myself", connection::connect_to_myself)?;
    registry.register_enabled("transfer_333", transfer::transfer_333)?;
    registry.register_enabled(
        "multi_transfer_connected_with_everything",
        multi_transfer::connected_with_everything,
    )?;
    registry.register_enabled(
        "multi_transfer_connected_one_by_one",
        multi_transfer::connected_one_by_one,
    )?;
    registry.register_enabled(
        "parallel_transfer_connected_with_everything",
        multi_transfer::parallel_connected_with_everything,
    )?;
    registry.register_enabled("simple_storage_contract", contract::simple_storage)?;
    Ok(())
}

/// Submit a transfer and follow it until it leaves the pending state
///
/// Adapters answering with a final status right away are not polled.
pub async fn transfer_and_wait(
    env: &Environment,
    client: &dyn BaseClient,
    from: &Keys,
    to: &Address,
    amount: u128,
    fee: u128,
) -> Result<TransactionStatus> {
    let status = client
        .transfer(to, amount, from, fee, client.profile().transaction)
        .await?;
    wait_until_final(env, client, status).await
}

/// Follow a submitted transaction while it is pending
///
/// Returns the last status read; it is still pending if the poll budget ran out.
pub async fn wait_until_final(
    env: &Environment,
    client: &dyn BaseClient,
    status: TransactionStatus,
) -> Result<TransactionStatus> {
    if !status.is_pending() {
        return Ok(status);
    }

    let profile = client.profile();
    let outcome = TransactionTracker::new(env.clock())
        .wait_for_status(
            client,
            &status.tx_hash,
            profile.status_poll_interval,
            profile.status_poll_budget,
            profile.call,
        )
        .await?;
    Ok(outcome.status)
}

/// Read the balance of `address` until it equals `expected` or the budget runs out
///
/// Returns the last balance read, so the caller's check reports the value seen.
pub async fn converged_balance(
    env: &Environment,
    client: &dyn BaseClient,
    address: &Address,
    expected: u128,
) -> Result<u128> {
    let profile = client.profile();
    let interval = profile.status_poll_interval.max(Duration::from_secs(1));
    let mut balance = 0;
    for attempt in 1..=BALANCE_POLL_BUDGET {
        balance = client.get_balance(address, profile.call).await?;
        if balance == expected {
            break;
        }
        env.logger().debug(format!(
            "{} - balance of {} is {}, expecting {} (attempt {})",
            client.name(),
            address,
            balance,
            expected,
            attempt
        ));
        if attempt < BALANCE_POLL_BUDGET {
            env.clock().sleep(interval).await;
        }
    }
    Ok(balance)
}

/// Fresh key pairs stored under `<test dir>/keys<n>`
pub async fn generate_accounts(
    env: &Environment,
    client: &dyn BaseClient,
    count: usize,
) -> Result<Vec<Keys>> {
    let mut accounts = Vec::with_capacity(count);
    for i in 1..=count {
        let path = env.work_dir().join(format!("keys{}", i));
        accounts.push(client.generate_keys(&path, client.profile().standalone).await?);
    }
    Ok(accounts)
}
