use crate::{RecordingLedger, replayed_world};
use alloy_primitives::{Address, B256, Bytes, bytes};
use alloy_sol_types::SolCall;
use wallet_miner::{
    HijackError, Hijacker, InitPayload, InitializerLayout, hijack::HijackStep, lineage,
    probe_implementation,
};
use wallet_miner_common::{CallRequest, LedgerClient, abi::IAuthorizer};
use wallet_miner_config::DEPOSIT_ADDRESS;
use wallet_miner_test_utils::{MemoryLedger, WalletMiningWorld, programs::Erc1967Proxy};

const PLAYER: Address = WalletMiningWorld::PLAYER;

fn takeover() -> InitPayload {
    // any non-empty call makes `upgradeToAndCall` delegate into the destructor
    InitPayload::authorizer(
        vec![PLAYER],
        vec![DEPOSIT_ADDRESS],
        WalletMiningWorld::DESTRUCTOR,
        bytes!("9cb8a26a"),
    )
}

async fn owner(ledger: &MemoryLedger, account: Address) -> Address {
    let input = IAuthorizer::ownerCall {}.abi_encode();
    let output = ledger.call(CallRequest::new(PLAYER, account, input)).await.unwrap();
    Address::from_word(B256::from_slice(&output[..32]))
}

#[tokio::test]
async fn proxy_without_implementation_reports_zero() {
    let ledger = MemoryLedger::new();
    let proxy = Address::with_last_byte(0x42);
    ledger.install(proxy, bytes!("01"), Erc1967Proxy, []);

    let implementation = probe_implementation(&ledger, proxy).await.unwrap();
    assert_eq!(implementation, Address::ZERO);

    let err = Hijacker::new(&ledger, PLAYER).hijack(implementation, &takeover()).await.unwrap_err();
    assert!(matches!(err, HijackError::ImplementationNotFound { .. }), "{err:?}");
    let err = Hijacker::new(&ledger, PLAYER).hijack_proxy(proxy, &takeover()).await.unwrap_err();
    assert!(matches!(err, HijackError::ImplementationNotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn probing_is_idempotent() {
    let world = WalletMiningWorld::new().await.unwrap();
    let first = probe_implementation(&world.ledger, WalletMiningWorld::AUTHORIZER_PROXY).await;
    let second = probe_implementation(&world.ledger, WalletMiningWorld::AUTHORIZER_PROXY).await;
    assert_eq!(first.unwrap(), WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert_eq!(second.unwrap(), WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);

    let lineage = lineage(&world.ledger, WalletMiningWorld::AUTHORIZER_PROXY).await.unwrap();
    assert_eq!(lineage.implementation, WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert_eq!(lineage.owner, Some(WalletMiningWorld::CHIEF));
}

#[tokio::test]
async fn hijack_succeeds_exactly_once() {
    let world = WalletMiningWorld::cancun().await.unwrap();
    let ledger = &world.ledger;

    let hijacker = Hijacker::new(ledger, PLAYER);
    let outcome =
        hijacker.hijack_proxy(WalletMiningWorld::AUTHORIZER_PROXY, &takeover()).await.unwrap();
    assert_eq!(outcome.implementation, WalletMiningWorld::AUTHORIZER_IMPLEMENTATION);
    assert_ne!(outcome.initialize_tx, outcome.redirect_tx);
    assert_eq!(owner(ledger, WalletMiningWorld::AUTHORIZER_IMPLEMENTATION).await, PLAYER);
    // the proxy keeps its own owner
    assert_eq!(owner(ledger, WalletMiningWorld::AUTHORIZER_PROXY).await, WalletMiningWorld::CHIEF);

    let err = hijacker
        .hijack_proxy(WalletMiningWorld::AUTHORIZER_PROXY, &takeover())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            HijackError::AlreadyInitialized { implementation }
                if implementation == WalletMiningWorld::AUTHORIZER_IMPLEMENTATION
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn redirect_removes_code_before_cancun() {
    let world = replayed_world().await;
    let outcome = Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &takeover())
        .await
        .unwrap();
    assert!(outcome.code_removed);
    assert!(!world.ledger.has_code(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION).await.unwrap());

    // what is left cannot be claimed again either
    let err = Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &takeover())
        .await
        .unwrap_err();
    assert!(matches!(err, HijackError::ImplementationNotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn redirect_keeps_code_after_cancun() {
    crate::init_tracing();
    let world = WalletMiningWorld::cancun().await.unwrap();
    let outcome = Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &takeover())
        .await
        .unwrap();
    assert!(!outcome.code_removed);
    assert!(world.ledger.has_code(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION).await.unwrap());
}

#[tokio::test]
async fn reverted_initialize_is_reported() {
    let world = WalletMiningWorld::new().await.unwrap();
    let mismatched = InitPayload::authorizer(vec![PLAYER], vec![], Address::ZERO, Bytes::new());

    let err = Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &mismatched)
        .await
        .unwrap_err();
    assert!(
        matches!(err, HijackError::Reverted { step: HijackStep::Initialize, .. }),
        "{err:?}"
    );
    // nothing was claimed, a corrected payload still goes through
    Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &takeover())
        .await
        .unwrap();
}

#[tokio::test]
async fn redirect_by_non_owner_is_reported() {
    let world = WalletMiningWorld::new().await.unwrap();
    // `owner()` succeeds without claiming anything, so the upgrade comes from a stranger
    let payload = InitPayload::new(
        IAuthorizer::ownerCall {}.abi_encode(),
        IAuthorizer::upgradeToAndCallCall {
            newImplementation: WalletMiningWorld::DESTRUCTOR,
            data: Bytes::new(),
        }
        .abi_encode(),
    );

    let err = Hijacker::new(&world.ledger, PLAYER)
        .hijack(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION, &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, HijackError::Reverted { step: HijackStep::Redirect, .. }), "{err:?}");
    assert!(world.ledger.has_code(WalletMiningWorld::AUTHORIZER_IMPLEMENTATION).await.unwrap());
}

#[tokio::test]
async fn misplaced_marker_lets_the_ledger_reject_the_claim() {
    let world = WalletMiningWorld::new().await.unwrap();
    let default = Hijacker::new(&world.ledger, PLAYER);
    assert!(default.is_initialized(WalletMiningWorld::AUTHORIZER_PROXY).await.unwrap());

    // looking at the wrong byte lets the attempt through, and the ledger rejects the claim
    let misplaced = Hijacker::new(&world.ledger, PLAYER)
        .with_layout(InitializerLayout { slot: B256::ZERO, offset: 1 });
    assert!(!misplaced.is_initialized(WalletMiningWorld::AUTHORIZER_PROXY).await.unwrap());
    let err = misplaced.hijack(WalletMiningWorld::AUTHORIZER_PROXY, &takeover()).await.unwrap_err();
    assert!(matches!(err, HijackError::Reverted { step: HijackStep::Initialize, .. }), "{err:?}");
}

#[tokio::test]
async fn takeover_calls_carry_the_gas_limit() {
    let world = WalletMiningWorld::new().await.unwrap();
    let ledger = RecordingLedger::new(&world.ledger);
    let implementation = WalletMiningWorld::AUTHORIZER_IMPLEMENTATION;

    Hijacker::new(&ledger, PLAYER)
        .with_gas_limit(750_000)
        .hijack(implementation, &takeover())
        .await
        .unwrap();

    let calls = ledger.calls_to(implementation);
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.gas_limit == Some(750_000)), "{calls:?}");
    assert_eq!(calls[0].input, takeover().initialize);
    assert_eq!(calls[1].input, takeover().redirect);
}
