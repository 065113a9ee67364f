use super::{
    abi::AbiError,
    actions::{ActionKind, InputError},
    preflight::PreflightError,
    wallet::{ProviderError, TxHash},
};

/// Backend error. The [Display] output is what the user sees as status.
///
/// [Display]: std::fmt::Display
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Install MetaMask to continue.")]
    NoWallet,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("transaction {0} was not confirmed in time")]
    ConfirmationTimeout(TxHash),
    #[error("{0} already in progress")]
    InFlight(ActionKind),
}
