// File: testing-framework/src/cases/contract.rs
//
// Contract round trip on a single node: compile, deploy with constructor
// arguments, call, read back through a view call and decode every output.

use lk_common::{transaction::TransactionStatusCode, Address};
use serde_json::json;

use super::wait_until_final;
use crate::{
    client::ClientType,
    environment::{Environment, NodeConfig, NodeIdentity},
    test_check, test_check_equal,
};

const SIMPLE_STORAGE: &str = r#"pragma solidity >=0.4.0 <0.7.0;

contract SimpleStorage {
    uint storedData;

    constructor(uint x) public {
        storedData = x;
    }

    function set(uint x) public {
        storedData = x;
    }

    function get() public view returns (uint data) {
        return storedData;
    }
}
"#;

const INITIAL_VALUE: u64 = 8888;
const UPDATED_VALUE: u64 = 4242;
const GAS: u128 = 10_000_000;

/// Deploy `SimpleStorage`, update it and read it back by call and by view
pub(crate) async fn simple_storage(env: Environment) -> anyhow::Result<()> {
    let identity = NodeIdentity::new(20401)
        .with_rpc_port(50401)
        .with_http_port(50501);
    env.start_node(NodeConfig::new(identity.clone())).await?;

    // The CLI client cannot submit contract transactions
    let client_type = match env.client_type() {
        ClientType::Legacy | ClientType::LegacyHttp => ClientType::Http,
        other => other,
    };
    let client = env.get_client(client_type, &identity).await?;
    let profile = client.profile();
    test_check!(client.connection_test(profile.call).await?);

    let source = env.work_dir().join("contract.sol");
    std::fs::write(&source, SIMPLE_STORAGE)?;
    let contracts = client.compile_file(&source, profile.standalone).await?;
    let Some(storage) = contracts.first() else {
        anyhow::bail!("no contract compiled from {}", source.display());
    };

    let distributor = env.distributor_keys(client.as_ref()).await?;

    let init = client
        .encode_message(storage, &format!("constructor({})", INITIAL_VALUE), profile.standalone)
        .await?;
    let deployed = client
        .push_contract(&distributor, storage, GAS, 0, &init, profile.contract)
        .await?;
    let deployed = wait_until_final(&env, client.as_ref(), deployed).await?;
    test_check_equal!(deployed.status_code, TransactionStatusCode::Success);
    let contract: Address = deployed.message.trim().parse()?;
    env.logger().info(format!("SimpleStorage deployed at {}", contract));

    let get = client.encode_message(storage, "get()", profile.standalone).await?;
    let called = client
        .message_call(&distributor, &contract, GAS, 0, &get, profile.contract)
        .await?;
    let called = wait_until_final(&env, client.as_ref(), called).await?;
    test_check_equal!(called.status_code, TransactionStatusCode::Success);
    let decoded = client
        .decode_message(storage, "get", &called.message, profile.standalone)
        .await?;
    test_check_equal!(decoded["data"], json!(INITIAL_VALUE));

    let set = client
        .encode_message(storage, &format!("set({})", UPDATED_VALUE), profile.standalone)
        .await?;
    let updated = client
        .message_call(&distributor, &contract, GAS, 0, &set, profile.contract)
        .await?;
    let updated = wait_until_final(&env, client.as_ref(), updated).await?;
    test_check_equal!(updated.status_code, TransactionStatusCode::Success);

    let view = client.call_view(&distributor, &contract, &get, profile.call).await?;
    let decoded = client
        .decode_message(storage, "get", &view, profile.standalone)
        .await?;
    test_check_equal!(decoded["data"], json!(UPDATED_VALUE));
    Ok(())
}
