// File: testing-framework/src/cases/transfer.rs

use lk_common::transaction::TransactionStatusCode;

use super::{converged_balance, generate_accounts, transfer_and_wait};
use crate::{
    environment::{Environment, NodeConfig, NodeIdentity},
    test_check, test_check_equal,
};

const AMOUNT: u128 = 333;
const FEE: u128 = 0;

/// Distributor pays 333 to a fresh address
pub(crate) async fn transfer_333(env: Environment) -> anyhow::Result<()> {
    let identity = NodeIdentity::new(20206)
        .with_rpc_port(50056)
        .with_http_port(50256);
    env.start_node(NodeConfig::new(identity.clone())).await?;

    let client = env.client(&identity).await?;
    let timing = client.profile().call;
    test_check!(client.connection_test(timing).await?);

    let distributor = env.distributor_keys(client.as_ref()).await?;
    let target = generate_accounts(&env, client.as_ref(), 1)
        .await?
        .remove(0);
    test_check_equal!(client.get_balance(&target.address, timing).await?, 0);
    let sender_before = client.get_balance(&distributor.address, timing).await?;

    let status = transfer_and_wait(
        &env,
        client.as_ref(),
        &distributor,
        &target.address,
        AMOUNT,
        FEE,
    )
    .await?;
    test_check_equal!(status.status_code, TransactionStatusCode::Success);

    let received = converged_balance(&env, client.as_ref(), &target.address, AMOUNT).await?;
    test_check_equal!(received, AMOUNT);

    let expected_sender = sender_before.saturating_sub(AMOUNT + FEE);
    let sender_after =
        converged_balance(&env, client.as_ref(), &distributor.address, expected_sender).await?;
    test_check_equal!(sender_after, expected_sender);
    Ok(())
}
