use crate::{FUNDING, init_tracing};
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use wallet_miner::{ReplayError, Replayer};
use wallet_miner_common::{CallRequest, LedgerClient, LedgerError, Receipt, Submission};
use wallet_miner_config::{DEPOSIT_ADDRESS, SAFE_DEPLOYER, SAFE_MASTER_COPY, SAFE_PROXY_FACTORY};
use wallet_miner_test_utils::{MemoryLedger, WalletMiningWorld};

#[tokio::test]
async fn replays_safe_deployments() {
    init_tracing();
    let world = WalletMiningWorld::new().await.unwrap();
    assert!(!world.ledger.has_code(SAFE_PROXY_FACTORY).await.unwrap());

    let summary = Replayer::new(&world.ledger)
        .with_targets([SAFE_MASTER_COPY, SAFE_PROXY_FACTORY])
        .with_funding(FUNDING)
        .replay(&world.records)
        .await
        .unwrap();

    assert_eq!(summary.applied.len(), 3);
    assert_eq!(summary.deployed, vec![SAFE_MASTER_COPY, SAFE_PROXY_FACTORY]);
    assert!(world.ledger.has_code(SAFE_MASTER_COPY).await.unwrap());
    assert!(world.ledger.has_code(SAFE_PROXY_FACTORY).await.unwrap());
    assert_eq!(world.ledger.nonce(SAFE_DEPLOYER).await.unwrap(), 3);
    assert_eq!(world.ledger.balance(SAFE_DEPLOYER), FUNDING);
}

#[tokio::test]
async fn replay_is_deterministic() {
    let first = crate::replayed_world().await;
    let second = crate::replayed_world().await;

    let contracts = first.ledger.contracts();
    assert_eq!(contracts, second.ledger.contracts());
    for address in contracts {
        assert_eq!(
            first.ledger.code(address).await.unwrap(),
            second.ledger.code(address).await.unwrap()
        );
    }
}

#[tokio::test]
async fn unfunded_sender_cannot_pay_for_gas() {
    let world = WalletMiningWorld::new().await.unwrap();
    let err = Replayer::new(&world.ledger).replay(&world.records).await.unwrap_err();
    assert!(matches!(err, ReplayError::Ledger(LedgerError::Rejected(_))), "{err:?}");
    assert_eq!(world.ledger.nonce(SAFE_DEPLOYER).await.unwrap(), 0);
}

#[tokio::test]
async fn out_of_order_records_are_rejected_before_submission() {
    let world = WalletMiningWorld::new().await.unwrap();
    let mut records = world.records.clone();
    records.swap(0, 1);

    let err = Replayer::new(&world.ledger).with_funding(FUNDING).replay(&records).await;
    assert!(
        matches!(err, Err(ReplayError::OutOfOrder { index: 1, nonce: 0, previous: 1, .. })),
        "{err:?}"
    );
    assert_eq!(world.ledger.nonce(SAFE_DEPLOYER).await.unwrap(), 0);
}

#[tokio::test]
async fn nonce_conflict_keeps_earlier_effects() {
    let world = WalletMiningWorld::new().await.unwrap();
    let replayer = Replayer::new(&world.ledger).with_funding(FUNDING);
    replayer.replay(&world.records[..1]).await.unwrap();

    let err = replayer.replay(&world.records).await.unwrap_err();
    assert!(
        matches!(err, ReplayError::NonceConflict { index: 0, expected: 1, got: 0, .. }),
        "{err:?}"
    );
    assert!(world.ledger.has_code(SAFE_MASTER_COPY).await.unwrap());
    assert!(!world.ledger.has_code(SAFE_PROXY_FACTORY).await.unwrap());
}

#[tokio::test]
async fn creation_without_code_aborts_the_sequence() {
    let world = WalletMiningWorld::new().await.unwrap();
    let mut records = world.records.clone();
    records[0].input = Bytes::new();

    let err = Replayer::new(&world.ledger).with_funding(FUNDING).replay(&records).await.unwrap_err();
    match err {
        ReplayError::UnexpectedDeploymentTarget { index, expected, actual } => {
            assert_eq!(index, 0);
            assert_eq!(expected, SAFE_MASTER_COPY);
            assert_eq!(actual, Some(SAFE_MASTER_COPY));
        }
        err => panic!("unexpected error: {err:?}"),
    }
    // the creation stands, the rest was never submitted
    assert_eq!(world.ledger.nonce(SAFE_DEPLOYER).await.unwrap(), 1);
}

#[tokio::test]
async fn targets_must_have_code() {
    let world = WalletMiningWorld::new().await.unwrap();
    let err = Replayer::new(&world.ledger)
        .with_targets([SAFE_PROXY_FACTORY, DEPOSIT_ADDRESS])
        .with_funding(FUNDING)
        .replay(&world.records)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplayError::MissingCode(address) if address == DEPOSIT_ADDRESS));
}

#[tokio::test]
async fn empty_sequence_only_checks_targets() {
    let world = WalletMiningWorld::new().await.unwrap();
    let summary = Replayer::new(&world.ledger)
        .with_targets([WalletMiningWorld::TOKEN])
        .replay(&[])
        .await
        .unwrap();
    assert!(summary.applied.is_empty());

    let err = Replayer::new(&world.ledger).with_targets([Address::ZERO]).replay(&[]).await;
    assert!(matches!(err, Err(ReplayError::MissingCode(address)) if address.is_zero()));
}

/// Forwards to a [`MemoryLedger`] but loses every replayed record to a transaction that took its
/// nonce after the nonce was queried.
struct RacedLedger<'a>(&'a MemoryLedger);

#[async_trait]
impl LedgerClient for RacedLedger<'_> {
    async fn submit(&self, submission: Submission) -> Result<Receipt, LedgerError> {
        match submission {
            Submission::Replay(record) => Err(LedgerError::NonceMismatch {
                sender: record.sender,
                expected: record.nonce + 1,
                got: record.nonce,
            }),
            call => self.0.submit(call).await,
        }
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, LedgerError> {
        self.0.call(request).await
    }

    async fn code(&self, address: Address) -> Result<Bytes, LedgerError> {
        self.0.code(address).await
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, LedgerError> {
        self.0.storage_at(address, slot).await
    }

    async fn nonce(&self, address: Address) -> Result<u64, LedgerError> {
        self.0.nonce(address).await
    }

    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), LedgerError> {
        self.0.set_balance(address, balance).await
    }
}

#[tokio::test]
async fn nonce_rejected_on_submission_is_a_conflict() {
    let world = WalletMiningWorld::new().await.unwrap();
    let ledger = RacedLedger(&world.ledger);

    let err = Replayer::new(&ledger).with_funding(FUNDING).replay(&world.records).await.unwrap_err();
    assert!(
        matches!(
            err,
            ReplayError::NonceConflict { index: 0, sender, expected: 1, got: 0 }
                if sender == SAFE_DEPLOYER
        ),
        "{err:?}"
    );
    // funding happened, nothing after the rejected record was attempted
    assert_eq!(world.ledger.balance(SAFE_DEPLOYER), FUNDING);
    assert_eq!(world.ledger.nonce(SAFE_DEPLOYER).await.unwrap(), 0);
}
