use crate::{replayed_world, sweeping_template};
use alloy_primitives::{Address, Bytes, U256};
use proptest::prelude::*;
use wallet_miner::{
    AddressMiner, MiningError,
    mine::{CreationScheme, distance, predict, sequential_salts},
};
use wallet_miner_common::{LedgerClient, LedgerError};
use wallet_miner_config::{DEPOSIT_ADDRESS, SAFE_PROXY_FACTORY};
use wallet_miner_test_utils::{
    WalletMiningWorld,
    fixtures::{DEPOSIT_TOKEN_AMOUNT, deposit_nonce},
    programs::PROXY_CREATION_CODE,
};

/// Attempts needed to reach the deposit address from a freshly replayed factory at nonce 1.
fn required_attempts() -> u64 {
    deposit_nonce().unwrap()
}

#[tokio::test]
async fn mines_deposit_address_and_sweeps_it() {
    crate::init_tracing();
    let world = replayed_world().await;
    let miner = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER);

    let mined =
        miner.mine(&sweeping_template(), sequential_salts(0), DEPOSIT_ADDRESS, 100).await.unwrap();

    assert!(mined.success);
    assert_eq!(mined.address, DEPOSIT_ADDRESS);
    assert_eq!(mined.attempt, required_attempts() - 1);
    assert!(world.ledger.has_code(DEPOSIT_ADDRESS).await.unwrap());
    // no attempt after the match was made
    assert_eq!(world.ledger.nonce(SAFE_PROXY_FACTORY).await.unwrap(), required_attempts() + 1);

    assert_eq!(world.token_balance(DEPOSIT_ADDRESS).await.unwrap(), U256::ZERO);
    assert_eq!(
        world.token_balance(WalletMiningWorld::PLAYER).await.unwrap(),
        DEPOSIT_TOKEN_AMOUNT
    );
}

#[tokio::test]
async fn exhausted_budget_leaves_throwaway_wallets() {
    let world = replayed_world().await;
    let miner = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER);
    let budget = required_attempts() - 1;

    let err = miner
        .mine(&sweeping_template(), sequential_salts(0), DEPOSIT_ADDRESS, budget)
        .await
        .unwrap_err();

    assert!(matches!(err, MiningError::ExhaustedBudget { attempts } if attempts == budget));
    assert!(err.to_string().contains(&budget.to_string()));
    assert!(!world.ledger.has_code(DEPOSIT_ADDRESS).await.unwrap());
    for nonce in 1..=budget {
        assert!(world.ledger.has_code(SAFE_PROXY_FACTORY.create(nonce)).await.unwrap());
    }
}

#[tokio::test]
async fn mining_is_deterministic_across_replays() {
    let mut results = Vec::new();
    for _ in 0..2 {
        let world = replayed_world().await;
        let mined = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
            .mine(&sweeping_template(), sequential_salts(0), DEPOSIT_ADDRESS, 100)
            .await
            .unwrap();
        results.push(mined);
    }
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn prediction_matches_mined_deployment() {
    let world = replayed_world().await;
    let template = sweeping_template();

    let next = predict(&world.ledger, &template, None).await.unwrap();
    assert_eq!(next, SAFE_PROXY_FACTORY.create(1));
    let attempts =
        distance(&world.ledger, &template, sequential_salts(0), DEPOSIT_ADDRESS, 100, None).await;
    assert_eq!(attempts.unwrap(), Some(required_attempts() - 1));

    let too_short =
        distance(&world.ledger, &template, sequential_salts(0), DEPOSIT_ADDRESS, 10, None).await;
    assert_eq!(too_short.unwrap(), None);
}

#[tokio::test]
async fn salted_scheme_lands_on_predicted_address() {
    let world = replayed_world().await;
    let template = sweeping_template().with_scheme(CreationScheme::Salted);
    let perturb = sequential_salts(1_000);
    let target = template.with_salt(perturb(5)).predict_at(0, Some(PROXY_CREATION_CODE)).unwrap();

    let ahead = distance(&world.ledger, &template, &perturb, target, 10, Some(PROXY_CREATION_CODE));
    assert_eq!(ahead.await.unwrap(), Some(5));

    let mined = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
        .mine(&template, &perturb, target, 10)
        .await
        .unwrap();
    assert_eq!(mined.attempt, 5);
    assert_eq!(mined.address, target);
}

#[tokio::test]
async fn salted_scheme_accepts_salts_longer_than_a_word() {
    let world = replayed_world().await;
    let template = sweeping_template().with_scheme(CreationScheme::Salted);
    let perturb = |attempt: u64| Bytes::from(vec![attempt as u8; 64]);
    let target = template.with_salt(perturb(3)).predict_at(0, Some(PROXY_CREATION_CODE)).unwrap();

    let mined = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
        .mine(&template, perturb, target, 5)
        .await
        .unwrap();
    assert_eq!(mined.attempt, 3);
    assert_eq!(mined.address, target);
}

#[tokio::test]
async fn nonce_scheme_mines_the_same_with_any_perturbation() {
    let empty = replayed_world().await;
    let perturbed = replayed_world().await;
    let plain = AddressMiner::new(&empty.ledger, WalletMiningWorld::PLAYER)
        .mine(&sweeping_template(), |_: u64| Bytes::new(), DEPOSIT_ADDRESS, 100)
        .await
        .unwrap();
    let noisy = AddressMiner::new(&perturbed.ledger, WalletMiningWorld::PLAYER)
        .mine(
            &sweeping_template(),
            |attempt: u64| Bytes::from(vec![attempt as u8; 7]),
            DEPOSIT_ADDRESS,
            100,
        )
        .await
        .unwrap();
    assert_eq!(plain, noisy);
    assert_eq!(noisy.attempt, 42);
}

#[tokio::test]
async fn salted_scheme_collision_is_a_ledger_rejection() {
    let world = replayed_world().await;
    let template = sweeping_template().with_scheme(CreationScheme::Salted);
    let same_salt = |_: u64| sequential_salts(7)(0);

    let err = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
        .mine(&template, same_salt, Address::ZERO, 3)
        .await
        .unwrap_err();
    assert!(
        matches!(err, MiningError::LedgerRejected { attempt: 1, source: LedgerError::Rejected(_) }),
        "{err:?}"
    );
}

#[tokio::test]
async fn factory_without_code_emits_no_creation_event() {
    let world = WalletMiningWorld::new().await.unwrap();
    let err = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
        .mine(&sweeping_template(), sequential_salts(0), DEPOSIT_ADDRESS, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, MiningError::MissingCreationEvent { attempt: 0 }), "{err:?}");
}

#[tokio::test]
async fn reverted_setup_is_a_ledger_rejection() {
    let world = replayed_world().await;
    let mut template = sweeping_template();
    template.threshold = U256::from(2);

    let err = AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
        .mine(&template, sequential_salts(0), DEPOSIT_ADDRESS, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, MiningError::LedgerRejected { attempt: 0, .. }), "{err:?}");
    // the reverted creation left nothing behind
    assert!(!world.ledger.has_code(SAFE_PROXY_FACTORY.create(1)).await.unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn budget_boundary(max_attempts in 0u64..=100) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(async {
            let world = replayed_world().await;
            AddressMiner::new(&world.ledger, WalletMiningWorld::PLAYER)
                .mine(&sweeping_template(), sequential_salts(0), DEPOSIT_ADDRESS, max_attempts)
                .await
        });

        if max_attempts >= required_attempts() {
            let mined = result.unwrap();
            prop_assert_eq!(mined.address, DEPOSIT_ADDRESS);
            prop_assert_eq!(mined.attempt, required_attempts() - 1);
        } else {
            let exhausted = matches!(
                result,
                Err(MiningError::ExhaustedBudget { attempts }) if attempts == max_attempts
            );
            prop_assert!(exhausted);
        }
    }
}
