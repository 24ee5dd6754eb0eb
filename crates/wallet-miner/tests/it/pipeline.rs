use crate::{RecordingLedger, yoink};
use alloy_primitives::{U256, bytes};
use wallet_miner::{Pipeline, PipelineError};
use wallet_miner_common::LedgerClient;
use wallet_miner_config::{Config, DEPOSIT_ADDRESS, HijackConfig};
use wallet_miner_test_utils::{WalletMiningWorld, fixtures::DEPOSIT_TOKEN_AMOUNT};

fn config() -> Config {
    let player = WalletMiningWorld::PLAYER;
    let mut config = Config { sender: Some(player), ..Default::default() };
    config.mining.module = WalletMiningWorld::SWEEPER;
    config.mining.subcall = yoink(player);
    config.hijack = HijackConfig {
        proxy: Some(WalletMiningWorld::AUTHORIZER_PROXY),
        wards: vec![player],
        aims: vec![DEPOSIT_ADDRESS],
        new_implementation: WalletMiningWorld::DESTRUCTOR,
        upgrade_call: bytes!("9cb8a26a"),
        ..Default::default()
    };
    config
}

#[tokio::test]
async fn drains_deposit_and_claims_implementation() {
    crate::init_tracing();
    let world = WalletMiningWorld::new().await.unwrap();
    let config = config();

    let report = Pipeline::new(&world.ledger, &config).run(&world.records).await.unwrap();
    assert_eq!(report.replay.applied.len(), 3);
    assert_eq!(report.mined.address, DEPOSIT_ADDRESS);
    assert_eq!(report.mined.attempt, 42);

    let lineage = report.lineage.unwrap();
    assert_eq!(lineage.implementation, WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert_eq!(lineage.owner, Some(WalletMiningWorld::CHIEF));
    let hijack = report.hijack.unwrap();
    assert!(hijack.code_removed);

    assert_eq!(world.token_balance(DEPOSIT_ADDRESS).await.unwrap(), U256::ZERO);
    assert_eq!(
        world.token_balance(WalletMiningWorld::PLAYER).await.unwrap(),
        DEPOSIT_TOKEN_AMOUNT
    );

    // the report is what `run --json` prints
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["hijack"]["codeRemoved"], true);
}

#[tokio::test]
async fn hijack_is_skipped_without_proxy() {
    let world = WalletMiningWorld::new().await.unwrap();
    let mut config = config();
    config.hijack.proxy = None;

    let report = Pipeline::new(&world.ledger, &config).run(&world.records).await.unwrap();
    assert_eq!(report.mined.address, DEPOSIT_ADDRESS);
    assert!(report.lineage.is_none());
    assert!(report.hijack.is_none());
}

#[tokio::test]
async fn missing_sender_fails_before_touching_the_ledger() {
    let world = WalletMiningWorld::new().await.unwrap();
    let config = Config { sender: None, ..config() };

    let err = Pipeline::new(&world.ledger, &config).run(&world.records).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)), "{err:?}");
    assert!(!world.ledger.has_code(DEPOSIT_ADDRESS).await.unwrap());
}

#[tokio::test]
async fn second_run_stops_at_replay() {
    let world = WalletMiningWorld::cancun().await.unwrap();
    let config = config();
    let pipeline = Pipeline::new(&world.ledger, &config);
    pipeline.run(&world.records).await.unwrap();

    let err = pipeline.run(&world.records).await.unwrap_err();
    assert!(matches!(err, PipelineError::Replay(_)), "{err:?}");
}

#[tokio::test]
async fn configured_gas_limits_reach_every_call() {
    let world = WalletMiningWorld::new().await.unwrap();
    let ledger = RecordingLedger::new(&world.ledger);
    let mut config = config();
    config.mining.gas_limit = 8_000_000;

    Pipeline::new(&ledger, &config).run(&world.records).await.unwrap();
    let mining = ledger.calls_to(config.mining.factory);
    assert_eq!(mining.len(), 43);
    assert!(mining.iter().all(|call| call.gas_limit == Some(8_000_000)));
    // without a hijack limit the mining one applies
    let takeover = ledger.calls_to(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert_eq!(takeover.len(), 2);
    assert!(takeover.iter().all(|call| call.gas_limit == Some(8_000_000)));

    let world = WalletMiningWorld::new().await.unwrap();
    let ledger = RecordingLedger::new(&world.ledger);
    config.hijack.gas_limit = Some(300_000);
    Pipeline::new(&ledger, &config).run(&world.records).await.unwrap();
    let takeover = ledger.calls_to(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert!(takeover.iter().all(|call| call.gas_limit == Some(300_000)), "{takeover:?}");
}
