//! Checks run before any state-mutating transaction.

use super::{
    abi::Address,
    contract::InheritanceContract,
    error::Error,
    wallet::WalletProviderExt,
    Backend,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreflightError {
    #[error("UI not ready yet")]
    NotReady,
    #[error("Switch to {0} to transact")]
    WrongNetwork(&'static str),
    #[error("No provider")]
    NoProvider,
    #[error("No contract code at this address on current network")]
    NoContractCode,
    #[error("No account available")]
    NoAccount,
    #[error("Selected account equals contract address; select your EOA account")]
    SignerIsContract,
    #[error("Connect as the contract owner to perform this action")]
    NotOwner,
}

impl Backend {
    /// Validates that a transaction can be sent, returning the signer.
    ///
    /// Checks run in a fixed order and stop at the first failure. With
    /// `require_owner` the signer must be the owner of the last loaded
    /// snapshot; without any snapshot the check fails.
    pub async fn preflight(&self, require_owner: bool) -> Result<Address, Error> {
        let chain = self.app_state.chain.lock().await.clone();
        if !chain.initialized {
            return Err(PreflightError::NotReady.into());
        }
        if !chain.on_expected_network(&self.network.chain_id) {
            return Err(PreflightError::WrongNetwork(self.network.name).into());
        }
        let Some(wallet) = &self.wallet else {
            return Err(PreflightError::NoProvider.into());
        };

        let contract = InheritanceContract::new(wallet.as_ref(), self.network.contract_address);
        if !contract.has_code().await? {
            return Err(PreflightError::NoContractCode.into());
        }

        let signer = match wallet.accounts().await?.first() {
            Some(account) => *account,
            None => wallet
                .request_accounts()
                .await?
                .first()
                .copied()
                .ok_or(PreflightError::NoAccount)?,
        };
        if signer == contract.address() {
            return Err(PreflightError::SignerIsContract.into());
        }

        if require_owner {
            let owner = self
                .app_state
                .snapshot
                .lock()
                .await
                .snapshot
                .as_ref()
                .map(|snapshot| snapshot.owner);
            if owner != Some(signer) {
                return Err(PreflightError::NotOwner.into());
            }
        }

        Ok(signer)
    }
}
