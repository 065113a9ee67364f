mod common;

use common::*;
use inheritance_console::{
    backend::{preflight::PreflightError, wallet::ChainId, Error, Task},
    config::SEPOLIA_CONTRACT_ADDRESS,
};

fn preflight_error(result: Result<impl std::fmt::Debug, Error>) -> PreflightError {
    match result {
        Err(Error::Preflight(error)) => error,
        other => panic!("expected a preflight error, got {other:?}"),
    }
}

#[tokio::test]
async fn nothing_passes_before_initialization() {
    let wallet = FakeWallet::new();
    let backend = backend(&wallet);

    let error = preflight_error(backend.preflight(false).await);
    assert_eq!(error, PreflightError::NotReady);
    assert_eq!(error.to_string(), "UI not ready yet");
}

#[tokio::test]
async fn owner_matches_regardless_of_case() {
    let wallet = FakeWallet::new();
    let lower = address("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");
    let upper = address("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD");
    wallet.script(|script| {
        script.accounts = vec![lower];
        script.contract.owner = upper;
    });
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(backend.preflight(true).await.unwrap(), lower);
}

#[tokio::test]
async fn non_owner_passes_only_the_generic_checks() {
    let wallet = FakeWallet::new();
    wallet.script(|script| script.accounts = vec![stranger()]);
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(backend.preflight(false).await.unwrap(), stranger());
    assert_eq!(
        preflight_error(backend.preflight(true).await),
        PreflightError::NotOwner
    );
}

#[tokio::test]
async fn checks_stop_at_the_first_failure() {
    let wallet = FakeWallet::new();
    wallet.script(|script| {
        script.chain_id = ChainId::new("0x1");
        script.has_code = false;
    });
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    let error = preflight_error(backend.preflight(false).await);
    assert_eq!(error.to_string(), "Switch to Sepolia to transact");
}

#[tokio::test]
async fn missing_code_is_detected() {
    let wallet = FakeWallet::new();
    wallet.script(|script| script.has_code = false);
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(
        preflight_error(backend.preflight(false).await),
        PreflightError::NoContractCode
    );
}

#[tokio::test]
async fn contract_cannot_sign_for_itself() {
    let wallet = FakeWallet::new();
    wallet.script(|script| script.accounts = vec![SEPOLIA_CONTRACT_ADDRESS]);
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(
        preflight_error(backend.preflight(false).await),
        PreflightError::SignerIsContract
    );
}

#[tokio::test]
async fn signer_is_requested_when_not_connected() {
    let wallet = FakeWallet::new();
    wallet.script(|script| script.connected = false);
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(backend.preflight(true).await.unwrap(), owner());
    assert!(wallet.requests().contains(&"eth_requestAccounts"));
}

#[tokio::test]
async fn no_account_at_all() {
    let wallet = FakeWallet::new();
    wallet.script(|script| {
        script.connected = false;
        script.accounts = vec![];
    });
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    assert_eq!(
        preflight_error(backend.preflight(false).await),
        PreflightError::NoAccount
    );
}

#[tokio::test]
async fn owner_check_needs_a_loaded_snapshot() {
    let wallet = FakeWallet::new();
    wallet.script(|script| script.has_code = false);
    let backend = backend(&wallet);
    backend.run_task(Task::Initialize).await;

    // Code deployed after the last load
    wallet.script(|script| script.has_code = true);
    assert_eq!(backend.preflight(false).await.unwrap(), owner());
    assert_eq!(
        preflight_error(backend.preflight(true).await),
        PreflightError::NotOwner
    );
}
